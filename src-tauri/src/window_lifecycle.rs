use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard,
    },
};

use tokio_util::sync::CancellationToken;

use crate::{
    backend_config::ReadinessOptions,
    backend_readiness::{ReadinessGate, ReadinessOutcome},
    error::WindowError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Loading,
    AwaitingBackend,
    Ready,
}

/// The UI side of a window: it can show the loading view or the app.
pub trait WindowSurface: Send + Sync {
    fn label(&self) -> String;
    fn show_loading_view(&self) -> Result<(), WindowError>;
    fn show_application_view(&self) -> Result<(), WindowError>;
}

struct TrackedWindow {
    generation: u64,
    state: WindowState,
    cancel: CancellationToken,
}

/// Drives every window through loading -> awaiting backend -> ready.
pub struct WindowCoordinator {
    gate: ReadinessGate,
    options: ReadinessOptions,
    windows: Mutex<HashMap<String, TrackedWindow>>,
    next_generation: AtomicU64,
}

impl WindowCoordinator {
    pub fn new(gate: ReadinessGate, options: ReadinessOptions) -> Self {
        Self {
            gate,
            options,
            windows: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    fn lock_windows(&self) -> MutexGuard<'_, HashMap<String, TrackedWindow>> {
        self.windows.lock().unwrap_or_else(|error| {
            log::warn!("window registry lock poisoned: {error}");
            error.into_inner()
        })
    }

    pub fn window_state(&self, label: &str) -> Option<WindowState> {
        self.lock_windows().get(label).map(|window| window.state)
    }

    pub fn tracked_windows(&self) -> usize {
        self.lock_windows().len()
    }

    fn set_state(&self, label: &str, generation: u64, state: WindowState) {
        if let Some(window) = self
            .lock_windows()
            .get_mut(label)
            .filter(|window| window.generation == generation)
        {
            window.state = state;
        }
    }

    fn forget(&self, label: &str, generation: u64) {
        let mut windows = self.lock_windows();
        if windows
            .get(label)
            .is_some_and(|window| window.generation == generation)
        {
            windows.remove(label);
        }
    }

    /// Runs the full sequence for one newly created window. The application
    /// view is shown only after the readiness wait has resolved, whatever
    /// its outcome, unless the window was closed first.
    pub async fn run_window<S>(&self, surface: &S) -> ReadinessOutcome
    where
        S: WindowSurface + ?Sized,
    {
        let label = surface.label();
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let cancel = CancellationToken::new();
        let previous = self.lock_windows().insert(
            label.clone(),
            TrackedWindow {
                generation,
                state: WindowState::Loading,
                cancel: cancel.clone(),
            },
        );
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        if let Err(error) = surface.show_loading_view() {
            log::warn!("failed to show loading view in window {label}: {error}");
        }
        self.set_state(&label, generation, WindowState::AwaitingBackend);

        let outcome = self
            .gate
            .await_ready_cancellable(self.options, &cancel)
            .await;
        match outcome {
            ReadinessOutcome::Cancelled => {
                log::debug!("readiness wait for window {label} cancelled");
                self.forget(&label, generation);
                return outcome;
            }
            ReadinessOutcome::TimedOut => {
                log::warn!("Backend did not become ready before timeout.");
            }
            ReadinessOutcome::Ready => {
                log::info!("backend is ready, showing application in window {label}");
            }
        }

        self.set_state(&label, generation, WindowState::Ready);
        if let Err(error) = surface.show_application_view() {
            log::error!("failed to show application view in window {label}: {error}");
        }
        outcome
    }

    /// Drops the window and cancels its readiness wait if one is pending.
    pub fn window_closed(&self, label: &str) {
        if let Some(window) = self.lock_windows().remove(label) {
            window.cancel.cancel();
        }
    }

    pub fn cancel_all(&self) {
        for (_, window) in self.lock_windows().drain() {
            window.cancel.cancel();
        }
    }
}
