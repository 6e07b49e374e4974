use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use tauri::{AppHandle, Manager};

use crate::{
    app_constants::MAIN_WINDOW_LABEL, backend_path::LauncherPaths,
    launcher_runtime::LauncherRuntime,
};

/// Tauri-managed state shared by the setup hook and the event handlers.
pub(crate) struct LauncherState {
    pub(crate) runtime: Arc<LauncherRuntime>,
    pub(crate) paths: LauncherPaths,
    window_counter: AtomicU32,
}

impl LauncherState {
    pub(crate) fn new(runtime: Arc<LauncherRuntime>, paths: LauncherPaths) -> Self {
        Self {
            runtime,
            paths,
            window_counter: AtomicU32::new(1),
        }
    }

    /// `main` while it is free, otherwise `main-2`, `main-3`, ...
    pub(crate) fn next_window_label(&self, app_handle: &AppHandle) -> String {
        if app_handle.get_webview_window(MAIN_WINDOW_LABEL).is_none() {
            return MAIN_WINDOW_LABEL.to_string();
        }
        let index = self.window_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{MAIN_WINDOW_LABEL}-{index}")
    }
}
