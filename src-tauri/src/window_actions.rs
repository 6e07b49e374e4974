use tauri::{AppHandle, WebviewUrl, WebviewWindow, WebviewWindowBuilder};

use crate::{
    app_constants::{APPLICATION_VIEW, LOADING_VIEW, WINDOW_HEIGHT, WINDOW_WIDTH},
    error::WindowError,
    window_lifecycle::WindowSurface,
};

/// Builds a hidden window on the loading view; it is shown once the
/// coordinator asks for the loading view.
pub fn create_launcher_window(
    app_handle: &AppHandle,
    label: &str,
    devtools_enabled: bool,
) -> Result<WebviewWindow, String> {
    let window = WebviewWindowBuilder::new(app_handle, label, WebviewUrl::App(LOADING_VIEW.into()))
        .title(app_handle.package_info().name.clone())
        .inner_size(WINDOW_WIDTH, WINDOW_HEIGHT)
        .visible(false)
        .devtools(devtools_enabled)
        .build()
        .map_err(|error| format!("Failed to create window {label}: {error}"))?;

    if devtools_enabled {
        open_devtools(&window);
    }
    Ok(window)
}

#[cfg(any(debug_assertions, feature = "devtools"))]
fn open_devtools(window: &WebviewWindow) {
    window.open_devtools();
}

#[cfg(not(any(debug_assertions, feature = "devtools")))]
fn open_devtools(window: &WebviewWindow) {
    log::warn!(
        "devtools requested for window {} but this build does not include them",
        window.label()
    );
}

pub fn show_window(window: &WebviewWindow) -> Result<(), String> {
    window
        .show()
        .map_err(|error| format!("Failed to show window {}: {}", window.label(), error))?;
    if let Err(error) = window.unminimize() {
        log::debug!("failed to unminimize window {}: {error}", window.label());
    }
    if let Err(error) = window.set_focus() {
        log::debug!("failed to focus window {}: {error}", window.label());
    }
    Ok(())
}

pub fn navigate_window(window: &WebviewWindow, view: &str) -> Result<(), String> {
    let target = serde_json::to_string(view)
        .map_err(|error| format!("Failed to encode view path {view}: {error}"))?;
    window
        .eval(&format!("window.location.replace({target});"))
        .map_err(|error| format!("Failed to load {view} in window {}: {error}", window.label()))
}

pub struct TauriWindowSurface {
    window: WebviewWindow,
}

impl TauriWindowSurface {
    pub fn new(window: WebviewWindow) -> Self {
        Self { window }
    }
}

impl WindowSurface for TauriWindowSurface {
    fn label(&self) -> String {
        self.window.label().to_string()
    }

    fn show_loading_view(&self) -> Result<(), WindowError> {
        show_window(&self.window).map_err(WindowError)
    }

    fn show_application_view(&self) -> Result<(), WindowError> {
        navigate_window(&self.window, APPLICATION_VIEW).map_err(WindowError)
    }
}
