use std::{path::PathBuf, sync::Arc};

use tauri::{AppHandle, Manager, RunEvent, WindowEvent};
use tauri_plugin_log::{RotationStrategy, Target, TargetKind};

use crate::{
    app_config::{load_app_config, resolve_devtools_enabled},
    app_constants::MAIN_WINDOW_LABEL,
    app_types::LauncherState,
    backend_config::{process_env_lookup, HealthCheckConfig},
    backend_path::{LauncherPaths, RuntimeMode},
    launch_plan::LaunchSettings,
    launcher_runtime::LauncherRuntime,
    window_actions::{self, TauriWindowSurface},
};

const LOG_FILE_NAME: &str = "desktop";
const LOG_MAX_FILE_SIZE: u128 = 5 * 1024 * 1024;

fn log_level() -> log::LevelFilter {
    if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

fn launcher_paths(app_handle: &AppHandle, mode: RuntimeMode) -> Result<LauncherPaths, String> {
    let resource_dir = app_handle
        .path()
        .resource_dir()
        .map_err(|error| format!("Failed to resolve resource dir: {error}"))?;
    let launcher_dir = match mode {
        RuntimeMode::Packaged => resource_dir.clone(),
        RuntimeMode::Development => PathBuf::from(env!("CARGO_MANIFEST_DIR")),
    };
    Ok(LauncherPaths {
        resource_dir,
        launcher_dir,
    })
}

/// Creates a window and hands it to the coordinator. The config file is read
/// again for every window so edits apply without a restart.
fn open_launcher_window(app_handle: &AppHandle) {
    let Some(state) = app_handle.try_state::<LauncherState>() else {
        log::error!("launcher state is not initialized; cannot open window");
        return;
    };

    let config = load_app_config(&state.paths.config_file());
    let devtools_enabled = resolve_devtools_enabled(&config, process_env_lookup);
    let label = state.next_window_label(app_handle);
    let window = match window_actions::create_launcher_window(app_handle, &label, devtools_enabled)
    {
        Ok(window) => window,
        Err(error) => {
            log::error!("{error}");
            return;
        }
    };

    let runtime = Arc::clone(&state.runtime);
    let surface = TauriWindowSurface::new(window);
    tauri::async_runtime::spawn(async move {
        runtime.present_window(&surface).await;
    });
}

fn focus_existing_window(app_handle: &AppHandle) {
    let window = app_handle
        .get_webview_window(MAIN_WINDOW_LABEL)
        .or_else(|| app_handle.webview_windows().into_values().next());
    match window {
        Some(window) => {
            if let Err(error) = window_actions::show_window(&window) {
                log::warn!("{error}");
            }
        }
        None => open_launcher_window(app_handle),
    }
}

pub fn run() {
    let built = tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app_handle, _args, _cwd| {
            log::info!("second launch detected, focusing existing window");
            focus_existing_window(app_handle);
        }))
        .plugin(
            tauri_plugin_log::Builder::new()
                .targets([
                    Target::new(TargetKind::Stdout),
                    Target::new(TargetKind::LogDir {
                        file_name: Some(LOG_FILE_NAME.to_string()),
                    }),
                ])
                .max_file_size(LOG_MAX_FILE_SIZE)
                .rotation_strategy(RotationStrategy::KeepOne)
                .level(log_level())
                .build(),
        )
        .enable_macos_default_menu(false)
        .on_window_event(|window, event| {
            if let WindowEvent::Destroyed = event {
                if let Some(state) = window.app_handle().try_state::<LauncherState>() {
                    state.runtime.window_closed(window.label());
                }
            }
        })
        .setup(|app| {
            let app_handle = app.handle().clone();
            let mode = RuntimeMode::current();
            let paths = launcher_paths(&app_handle, mode)?;
            log::info!(
                "launcher starting: mode={mode:?} resources={}",
                paths.resource_dir.display()
            );

            let health = HealthCheckConfig::from_env();
            let settings = LaunchSettings::new(mode, paths.clone());
            let runtime = tauri::async_runtime::block_on(async {
                LauncherRuntime::spawn_default(settings, &health)
            });
            app.manage(LauncherState::new(Arc::clone(&runtime), paths));

            tauri::async_runtime::spawn(async move {
                runtime.start_backend_once();
            });
            open_launcher_window(&app_handle);
            Ok(())
        })
        .build(tauri::generate_context!());

    let app = match built {
        Ok(app) => app,
        Err(error) => {
            eprintln!("error while building tauri application: {error}");
            std::process::exit(1);
        }
    };

    app.run(|app_handle, event| match event {
        #[cfg(target_os = "macos")]
        RunEvent::Reopen {
            has_visible_windows: false,
            ..
        } => {
            open_launcher_window(app_handle);
        }
        RunEvent::ExitRequested { code: None, api, .. } if cfg!(target_os = "macos") => {
            // Closing the last window keeps the app alive in the dock.
            api.prevent_exit();
        }
        RunEvent::Exit => {
            if let Some(state) = app_handle.try_state::<LauncherState>() {
                state.runtime.teardown();
            }
        }
        _ => {}
    });
}
