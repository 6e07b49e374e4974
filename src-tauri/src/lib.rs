pub mod app_config;
pub mod app_constants;
pub mod backend_config;
pub mod backend_path;
pub mod backend_process;
pub mod backend_readiness;
pub mod backend_supervisor;
pub mod error;
pub mod exit_cleanup;
pub mod launch_plan;
pub mod launcher_runtime;
pub mod process_control;
pub mod window_lifecycle;

#[cfg(feature = "desktop")]
mod app_runtime;
#[cfg(feature = "desktop")]
mod app_types;
#[cfg(feature = "desktop")]
mod window_actions;

#[cfg(test)]
mod test_support;

#[cfg(feature = "desktop")]
pub use app_runtime::run;
