use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("backend is already running (pid {pid:?})")]
    AlreadyRunning { pid: Option<u32> },
    #[error("failed to spawn backend with command {command:?}: {source}")]
    Spawn {
        command: Vec<String>,
        #[source]
        source: std::io::Error,
    },
}

/// Failure reported by the window shell while switching views.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct WindowError(pub String);
