use std::sync::Arc;

use crate::{backend_supervisor::BackendSupervisor, window_lifecycle::WindowCoordinator};

/// Runs on application teardown. Fire-and-forget: nothing here waits for
/// the backend to confirm that it exited.
pub struct ShutdownCoordinator {
    supervisor: Arc<BackendSupervisor>,
    windows: Arc<WindowCoordinator>,
}

impl ShutdownCoordinator {
    pub fn new(supervisor: Arc<BackendSupervisor>, windows: Arc<WindowCoordinator>) -> Self {
        Self {
            supervisor,
            windows,
        }
    }

    pub fn on_teardown(&self) {
        log::info!("application teardown: releasing windows and stopping backend");
        self.windows.cancel_all();
        self.supervisor.stop();
    }
}
