//! Fakes shared by the unit tests.

use std::{
    io,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::{sync::oneshot, time::sleep};

use crate::{
    backend_process::{ProcessSource, SpawnedProcess, Terminate},
    backend_readiness::HealthProbe,
    error::WindowError,
    launch_plan::LaunchPlan,
    window_lifecycle::WindowSurface,
};

/// Fails until the `succeed_on`-th attempt (1-based), or forever.
pub(crate) struct ScriptedProbe {
    attempts: AtomicU32,
    succeed_on: Option<u32>,
    latency: Duration,
}

impl ScriptedProbe {
    pub(crate) fn new(succeed_on: Option<u32>) -> Arc<Self> {
        Self::with_latency(succeed_on, Duration::ZERO)
    }

    pub(crate) fn with_latency(succeed_on: Option<u32>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicU32::new(0),
            succeed_on,
            latency,
        })
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn is_healthy(&self) -> bool {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        self.succeed_on.is_some_and(|target| attempt >= target)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum View {
    Loading,
    Application,
}

/// Records every view it is asked to show, with the probe attempt count at
/// that moment.
pub(crate) struct RecordingSurface {
    label: String,
    probe: Option<Arc<ScriptedProbe>>,
    views: Mutex<Vec<(View, u32)>>,
}

impl RecordingSurface {
    pub(crate) fn new(label: &str, probe: Option<Arc<ScriptedProbe>>) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            probe,
            views: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn views(&self) -> Vec<View> {
        self.views
            .lock()
            .expect("views lock")
            .iter()
            .map(|(view, _)| *view)
            .collect()
    }

    pub(crate) fn attempts_when_shown(&self, wanted: View) -> Vec<u32> {
        self.views
            .lock()
            .expect("views lock")
            .iter()
            .filter(|(view, _)| *view == wanted)
            .map(|(_, attempts)| *attempts)
            .collect()
    }

    fn record(&self, view: View) {
        let attempts = self.probe.as_ref().map_or(0, |probe| probe.attempts());
        self.views.lock().expect("views lock").push((view, attempts));
    }
}

impl WindowSurface for RecordingSurface {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn show_loading_view(&self) -> Result<(), WindowError> {
        self.record(View::Loading);
        Ok(())
    }

    fn show_application_view(&self) -> Result<(), WindowError> {
        self.record(View::Application);
        Ok(())
    }
}

struct CountingTerminator {
    terminations: Arc<AtomicU32>,
    exit: Mutex<Option<oneshot::Sender<Option<i32>>>>,
}

impl Terminate for CountingTerminator {
    fn terminate(&self) -> io::Result<()> {
        self.terminations.fetch_add(1, Ordering::SeqCst);
        if let Some(sender) = self.exit.lock().expect("exit lock").take() {
            let _ = sender.send(None);
        }
        Ok(())
    }
}

/// Spawns silent processes that run until terminated.
#[derive(Default)]
pub(crate) struct IdleProcessSource {
    pub(crate) spawns: AtomicU32,
    pub(crate) terminations: Arc<AtomicU32>,
    pub(crate) last_plan: Mutex<Option<LaunchPlan>>,
}

impl ProcessSource for IdleProcessSource {
    fn spawn(&self, plan: &LaunchPlan) -> io::Result<SpawnedProcess> {
        self.spawns.fetch_add(1, Ordering::SeqCst);
        *self.last_plan.lock().expect("plan lock") = Some(plan.clone());

        let (exit_tx, exit_rx) = oneshot::channel();
        Ok(SpawnedProcess {
            pid: Some(4242),
            stdout: None,
            stderr: None,
            exit: Box::pin(async move { Ok(exit_rx.await.unwrap_or(None)) }),
            terminator: Box::new(CountingTerminator {
                terminations: Arc::clone(&self.terminations),
                exit: Mutex::new(Some(exit_tx)),
            }),
        })
    }
}
