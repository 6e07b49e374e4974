use std::path::{Path, PathBuf};

use crate::{
    app_constants::{
        BACKEND_ENV_FILE_ENV, BACKEND_HOST_ENV, BACKEND_MODULE_ARGS, BACKEND_PORT_ENV,
        BACKEND_PYTHON_ENV,
    },
    backend_config::BackendEndpoint,
    backend_path::{
        is_windows_platform, resolve_backend_location, BackendLocation, LauncherPaths, RuntimeMode,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchStrategy {
    /// Run the pre-built backend binary with no arguments.
    Executable,
    /// Run the backend module through a Python interpreter.
    Interpreter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Applied on top of the inherited launcher environment.
    pub env: Vec<(String, String)>,
    pub strategy: LaunchStrategy,
}

impl LaunchPlan {
    pub fn debug_command(&self) -> Vec<String> {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.args.clone());
        parts
    }
}

/// Inputs that stay fixed for the lifetime of the launcher.
#[derive(Debug, Clone)]
pub struct LaunchSettings {
    pub mode: RuntimeMode,
    pub platform: String,
    pub paths: LauncherPaths,
}

impl LaunchSettings {
    pub fn new(mode: RuntimeMode, paths: LauncherPaths) -> Self {
        Self {
            mode,
            platform: std::env::consts::OS.to_string(),
            paths,
        }
    }
}

pub fn default_interpreter(platform: &str) -> &'static str {
    if is_windows_platform(platform) {
        "python"
    } else {
        "python3"
    }
}

/// Turns `BACKEND_PYTHON` into program + leading args. On Windows, or when
/// the value names an existing file, the whole value is the program, so
/// paths with backslashes or spaces survive. Elsewhere it is split with
/// shell-word rules so `uv run python` works.
pub fn resolve_interpreter<F, E>(platform: &str, lookup: &F, exists: E) -> (String, Vec<String>)
where
    F: Fn(&str) -> Option<String>,
    E: Fn(&Path) -> bool,
{
    let fallback = || (default_interpreter(platform).to_string(), Vec::new());
    let Some(raw) = lookup(BACKEND_PYTHON_ENV) else {
        return fallback();
    };
    let value = raw.trim();
    if value.is_empty() {
        return fallback();
    }

    if is_windows_platform(platform) || exists(Path::new(value)) {
        let program = strip_wrapping_quotes(value);
        if program.is_empty() {
            return fallback();
        }
        return (program.to_string(), Vec::new());
    }

    match shlex::split(value) {
        Some(mut pieces) if !pieces.is_empty() => {
            let program = pieces.remove(0);
            (program, pieces)
        }
        _ => {
            log::warn!("ignoring unparsable {BACKEND_PYTHON_ENV}={raw}");
            fallback()
        }
    }
}

fn strip_wrapping_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
        .trim()
}

/// Environment overrides for the child. Values already set externally win
/// over built-in defaults; the env file is only pointed at when it exists.
pub fn build_backend_env<F>(
    location: &BackendLocation,
    env_file_exists: bool,
    lookup: &F,
) -> Vec<(String, String)>
where
    F: Fn(&str) -> Option<String>,
{
    let endpoint = BackendEndpoint::from_lookup(lookup);
    let mut env = Vec::new();

    if env_file_exists {
        env.push((
            BACKEND_ENV_FILE_ENV.to_string(),
            location.env_file.to_string_lossy().to_string(),
        ));
    }
    env.push((BACKEND_HOST_ENV.to_string(), endpoint.host));
    env.push((BACKEND_PORT_ENV.to_string(), endpoint.port));
    env.push(("PYTHONUNBUFFERED".to_string(), "1".to_string()));
    env.push((
        "PYTHONIOENCODING".to_string(),
        lookup("PYTHONIOENCODING").unwrap_or_else(|| "utf-8".to_string()),
    ));
    env
}

pub fn plan_backend_launch<F, E>(settings: &LaunchSettings, lookup: &F, exists: E) -> LaunchPlan
where
    F: Fn(&str) -> Option<String>,
    E: Fn(&Path) -> bool,
{
    let location = resolve_backend_location(settings.mode, &settings.platform, &settings.paths, &exists);
    let env = build_backend_env(&location, exists(&location.env_file), lookup);

    let (program, args, strategy) = if exists(&location.executable) {
        (
            location.executable.to_string_lossy().to_string(),
            Vec::new(),
            LaunchStrategy::Executable,
        )
    } else {
        let (program, mut args) = resolve_interpreter(&settings.platform, lookup, &exists);
        args.extend(BACKEND_MODULE_ARGS.iter().map(|arg| arg.to_string()));
        (program, args, LaunchStrategy::Interpreter)
    };

    LaunchPlan {
        program,
        args,
        cwd: location.root_dir,
        env,
        strategy,
    }
}
