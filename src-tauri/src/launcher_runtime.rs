use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::{
    backend_config::HealthCheckConfig,
    backend_process::{ProcessSource, TokioProcessSource},
    backend_readiness::{HealthProbe, HttpHealthProbe, ReadinessGate, ReadinessOutcome},
    backend_supervisor::{log_supervisor_events, BackendSupervisor, SupervisorStatus},
    error::SupervisorError,
    exit_cleanup::ShutdownCoordinator,
    launch_plan::LaunchSettings,
    window_lifecycle::{WindowCoordinator, WindowState, WindowSurface},
};

/// Everything the host shell talks to: one backend supervisor, the window
/// coordinator and the shutdown path, wired together.
pub struct LauncherRuntime {
    supervisor: Arc<BackendSupervisor>,
    windows: Arc<WindowCoordinator>,
    shutdown: ShutdownCoordinator,
    backend_started: AtomicBool,
}

impl LauncherRuntime {
    pub fn new(supervisor: Arc<BackendSupervisor>, windows: Arc<WindowCoordinator>) -> Self {
        Self {
            shutdown: ShutdownCoordinator::new(Arc::clone(&supervisor), Arc::clone(&windows)),
            supervisor,
            windows,
            backend_started: AtomicBool::new(false),
        }
    }

    /// Production wiring: real processes, HTTP health checks, and a task that
    /// logs supervisor events. Must be called from inside a Tokio runtime.
    pub fn spawn_default(settings: LaunchSettings, health: &HealthCheckConfig) -> Arc<Self> {
        let probe: Arc<dyn HealthProbe> = match http_probe(health) {
            Some(probe) => {
                log::info!("backend health endpoint: {}", probe.url());
                Arc::new(probe)
            }
            None => Arc::new(UnreachableProbe),
        };
        let source: Arc<dyn ProcessSource> = Arc::new(TokioProcessSource);
        Self::spawn_with(settings, source, probe, health)
    }

    pub fn spawn_with(
        settings: LaunchSettings,
        source: Arc<dyn ProcessSource>,
        probe: Arc<dyn HealthProbe>,
        health: &HealthCheckConfig,
    ) -> Arc<Self> {
        let (supervisor, events) = BackendSupervisor::new(settings, source);
        tokio::spawn(log_supervisor_events(events));
        let windows = WindowCoordinator::new(ReadinessGate::new(probe), health.options);
        Arc::new(Self::new(Arc::new(supervisor), Arc::new(windows)))
    }

    pub fn backend_status(&self) -> SupervisorStatus {
        self.supervisor.status()
    }

    pub fn window_state(&self, label: &str) -> Option<WindowState> {
        self.windows.window_state(label)
    }

    /// Starts the backend on the host's first ready signal. Later calls are
    /// ignored so one launcher run never spawns two backends.
    pub fn start_backend_once(&self) -> bool {
        if self.backend_started.swap(true, Ordering::SeqCst) {
            log::debug!("backend start already requested for this run");
            return false;
        }

        match self.supervisor.start() {
            Ok(()) => {}
            // The spawn error itself is reported through the event log.
            Err(SupervisorError::Spawn { .. }) => {}
            Err(error @ SupervisorError::AlreadyRunning { .. }) => {
                log::warn!("backend start skipped: {error}");
            }
        }
        true
    }

    pub async fn present_window<S>(&self, surface: &S) -> ReadinessOutcome
    where
        S: WindowSurface + ?Sized,
    {
        self.windows.run_window(surface).await
    }

    pub fn window_closed(&self, label: &str) {
        self.windows.window_closed(label);
    }

    pub fn teardown(&self) {
        self.shutdown.on_teardown();
    }
}

fn http_probe(health: &HealthCheckConfig) -> Option<HttpHealthProbe> {
    match health.endpoint.health_url() {
        Ok(url) => Some(HttpHealthProbe::new(url)),
        Err(error) => {
            log::error!(
                "invalid backend endpoint {}: {error}",
                health.endpoint.base_url()
            );
            None
        }
    }
}

struct UnreachableProbe;

#[async_trait::async_trait]
impl HealthProbe for UnreachableProbe {
    async fn is_healthy(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::atomic::Ordering, time::Duration};

    use tokio::time::sleep;

    use super::*;
    use crate::{
        backend_config::ReadinessOptions,
        backend_path::{LauncherPaths, RuntimeMode},
        launch_plan::LaunchStrategy,
        test_support::{IdleProcessSource, RecordingSurface, ScriptedProbe, View},
    };

    fn settings() -> LaunchSettings {
        LaunchSettings {
            mode: RuntimeMode::Packaged,
            platform: "linux".to_string(),
            paths: LauncherPaths {
                resource_dir: PathBuf::from("/nonexistent/resources"),
                launcher_dir: PathBuf::from("/nonexistent/launcher"),
            },
        }
    }

    fn health(timeout_ms: u64, interval_ms: u64) -> HealthCheckConfig {
        let mut health = HealthCheckConfig::from_lookup(|_| None);
        health.options = ReadinessOptions {
            timeout: Duration::from_millis(timeout_ms),
            interval: Duration::from_millis(interval_ms),
        };
        health
    }

    fn runtime(
        probe: Arc<ScriptedProbe>,
        timeout_ms: u64,
        interval_ms: u64,
    ) -> (Arc<IdleProcessSource>, Arc<LauncherRuntime>) {
        let source = Arc::new(IdleProcessSource::default());
        let runtime = LauncherRuntime::spawn_with(
            settings(),
            source.clone(),
            probe,
            &health(timeout_ms, interval_ms),
        );
        (source, runtime)
    }

    #[tokio::test(start_paused = true)]
    async fn backend_is_started_once_per_run() {
        let (source, runtime) = runtime(ScriptedProbe::new(Some(1)), 20_000, 500);

        assert!(runtime.start_backend_once());
        assert!(!runtime.start_backend_once());

        assert_eq!(source.spawns.load(Ordering::SeqCst), 1);
        assert_eq!(
            runtime.backend_status(),
            SupervisorStatus::Running { pid: Some(4242) }
        );
        let plan = source
            .last_plan
            .lock()
            .expect("plan lock")
            .clone()
            .expect("plan recorded");
        assert_eq!(plan.strategy, LaunchStrategy::Interpreter);
        assert_eq!(plan.cwd, PathBuf::from("/nonexistent/resources/backend"));
    }

    #[tokio::test(start_paused = true)]
    async fn reactivated_window_reuses_running_backend() {
        let probe = ScriptedProbe::new(Some(1));
        let (source, runtime) = runtime(probe, 20_000, 500);
        runtime.start_backend_once();

        let first = RecordingSurface::new("main", None);
        assert_eq!(runtime.present_window(&*first).await, ReadinessOutcome::Ready);
        runtime.window_closed("main");

        let reopened = RecordingSurface::new("main", None);
        assert_eq!(runtime.present_window(&*reopened).await, ReadinessOutcome::Ready);

        assert_eq!(reopened.views(), vec![View::Loading, View::Application]);
        assert_eq!(runtime.window_state("main"), Some(WindowState::Ready));
        assert_eq!(source.spawns.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_stops_backend_and_pending_windows() {
        let probe = ScriptedProbe::new(None);
        let (source, runtime) = runtime(probe, 20_000, 500);
        runtime.start_backend_once();

        let surface = RecordingSurface::new("main", None);
        let window = {
            let runtime = Arc::clone(&runtime);
            let surface = Arc::clone(&surface);
            tokio::spawn(async move { runtime.present_window(&*surface).await })
        };
        sleep(Duration::from_millis(300)).await;

        runtime.teardown();
        runtime.teardown();

        assert_eq!(window.await.expect("window task"), ReadinessOutcome::Cancelled);
        assert_eq!(surface.views(), vec![View::Loading]);
        assert_eq!(source.terminations.load(Ordering::SeqCst), 1);
        assert_eq!(runtime.backend_status(), SupervisorStatus::Stopped);
    }

    #[tokio::test]
    async fn default_wiring_targets_configured_endpoint() {
        let health = HealthCheckConfig::from_lookup(|key| match key {
            "BACKEND_HOST" => Some("10.0.0.5".to_string()),
            _ => None,
        });
        let probe = http_probe(&health).expect("valid endpoint");
        assert_eq!(probe.url().as_str(), "http://10.0.0.5:8000/api/v1/health");

        let runtime = LauncherRuntime::spawn_default(settings(), &health);
        assert_eq!(runtime.backend_status(), SupervisorStatus::Idle);
        assert_eq!(runtime.window_state("main"), None);
    }

    #[test]
    fn unparsable_endpoint_has_no_http_probe() {
        let health = HealthCheckConfig::from_lookup(|key| match key {
            "BACKEND_PORT" => Some("not-a-port".to_string()),
            _ => None,
        });
        assert!(http_probe(&health).is_none());
    }
}
