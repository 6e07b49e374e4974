use std::time::Duration;

pub const BACKEND_HOST_ENV: &str = "BACKEND_HOST";
pub const BACKEND_PORT_ENV: &str = "BACKEND_PORT";
pub const BACKEND_PYTHON_ENV: &str = "BACKEND_PYTHON";
pub const BACKEND_ENV_FILE_ENV: &str = "BACKEND_ENV_FILE";
pub const ENABLE_DEVTOOLS_ENV: &str = "ENABLE_DEVTOOLS";
pub const BACKEND_READY_TIMEOUT_ENV: &str = "BACKEND_READY_TIMEOUT_MS";
pub const BACKEND_READY_INTERVAL_ENV: &str = "BACKEND_READY_INTERVAL_MS";

pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";
pub const DEFAULT_BACKEND_PORT: &str = "8000";
pub const HEALTH_PATH: &str = "/api/v1/health";

pub const DEFAULT_READY_TIMEOUT_MS: u64 = 20_000;
pub const DEFAULT_READY_INTERVAL_MS: u64 = 500;
pub const READY_INTERVAL_MIN_MS: u64 = 50;
pub const READY_INTERVAL_MAX_MS: u64 = 10_000;
pub const HEALTH_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

pub const BACKEND_DIR_NAME: &str = "backend";
pub const BACKEND_DIST_DIR_NAME: &str = "dist";
pub const BACKEND_BINARY_STEM: &str = "backend";
pub const BACKEND_ENV_FILE_NAME: &str = ".env";
pub const BACKEND_MODULE_ARGS: [&str; 2] = ["-m", "app.entrypoint"];
pub const BACKEND_LOG_PREFIX: &str = "[backend]";

pub const APP_CONFIG_FILE: &str = "app.config.json";
pub const LOADING_VIEW: &str = "loading.html";
pub const APPLICATION_VIEW: &str = "index.html";
pub const MAIN_WINDOW_LABEL: &str = "main";
pub const WINDOW_WIDTH: f64 = 1280.0;
pub const WINDOW_HEIGHT: f64 = 800.0;
