use std::path::{Path, PathBuf};

use crate::app_constants::{
    BACKEND_BINARY_STEM, BACKEND_DIR_NAME, BACKEND_DIST_DIR_NAME, BACKEND_ENV_FILE_NAME,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    Packaged,
    Development,
}

impl RuntimeMode {
    /// Release builds run from the bundle, debug builds from the source tree.
    pub fn current() -> Self {
        if cfg!(debug_assertions) {
            Self::Development
        } else {
            Self::Packaged
        }
    }
}

/// Directories the launcher resolves everything else from.
#[derive(Debug, Clone)]
pub struct LauncherPaths {
    /// Directory holding bundled resources (packaged mode).
    pub resource_dir: PathBuf,
    /// Directory the launcher itself lives in. `app.config.json` sits here.
    pub launcher_dir: PathBuf,
}

impl LauncherPaths {
    pub fn config_file(&self) -> PathBuf {
        self.launcher_dir.join(crate::app_constants::APP_CONFIG_FILE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendLocation {
    pub root_dir: PathBuf,
    pub env_file: PathBuf,
    pub executable: PathBuf,
}

pub fn backend_root_dir(mode: RuntimeMode, paths: &LauncherPaths) -> PathBuf {
    match mode {
        RuntimeMode::Packaged => paths.resource_dir.join(BACKEND_DIR_NAME),
        RuntimeMode::Development => paths.launcher_dir.join("..").join(BACKEND_DIR_NAME),
    }
}

pub fn is_windows_platform(platform: &str) -> bool {
    matches!(platform, "windows" | "win32")
}

pub fn backend_executable_name(platform: &str) -> String {
    if is_windows_platform(platform) {
        format!("{BACKEND_BINARY_STEM}.exe")
    } else {
        BACKEND_BINARY_STEM.to_string()
    }
}

/// Picks the first candidate that exists. When none does, the last candidate
/// is returned as-is and the caller finds out at spawn time.
pub fn select_executable<F>(candidates: &[PathBuf], exists: F) -> Option<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    candidates
        .iter()
        .find(|candidate| exists(candidate))
        .or_else(|| candidates.last())
        .cloned()
}

pub fn resolve_backend_location<F>(
    mode: RuntimeMode,
    platform: &str,
    paths: &LauncherPaths,
    exists: F,
) -> BackendLocation
where
    F: Fn(&Path) -> bool,
{
    let root_dir = backend_root_dir(mode, paths);
    let executable_name = backend_executable_name(platform);
    let root_binary = root_dir.join(&executable_name);
    let candidates = [
        root_dir.join(BACKEND_DIST_DIR_NAME).join(&executable_name),
        root_binary.clone(),
    ];
    let executable = select_executable(&candidates, exists).unwrap_or(root_binary);

    BackendLocation {
        env_file: root_dir.join(BACKEND_ENV_FILE_NAME),
        executable,
        root_dir,
    }
}
