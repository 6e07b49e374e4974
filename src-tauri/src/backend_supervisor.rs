use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex, MutexGuard,
};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc::{self, UnboundedReceiver, UnboundedSender},
};
use tokio_util::sync::CancellationToken;

use crate::{
    app_constants::BACKEND_LOG_PREFIX,
    backend_config::process_env_lookup,
    backend_process::{ExitFuture, OutputReader, ProcessSource, SpawnedProcess, Terminate},
    error::SupervisorError,
    launch_plan::{plan_backend_launch, LaunchPlan, LaunchSettings},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Lifecycle of one supervised backend instance, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Started {
        instance: u64,
        pid: Option<u32>,
        command: Vec<String>,
    },
    Output {
        instance: u64,
        stream: OutputStream,
        line: String,
    },
    Exited {
        instance: u64,
        code: Option<i32>,
    },
    SpawnFailed {
        instance: u64,
        message: String,
    },
}

impl SupervisorEvent {
    pub fn instance(&self) -> u64 {
        match self {
            Self::Started { instance, .. }
            | Self::Output { instance, .. }
            | Self::Exited { instance, .. }
            | Self::SpawnFailed { instance, .. } => *instance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorStatus {
    Idle,
    Running { pid: Option<u32> },
    Exited { code: Option<i32> },
    SpawnFailed,
    Stopped,
}

struct LiveBackend {
    instance: u64,
    pid: Option<u32>,
    cancel: CancellationToken,
    terminator: Box<dyn Terminate>,
}

struct SupervisorState {
    live: Option<LiveBackend>,
    status: SupervisorStatus,
    /// Most recent instance id handed out by `launch`.
    latest_instance: u64,
}

fn lock_state(state: &Mutex<SupervisorState>) -> MutexGuard<'_, SupervisorState> {
    state.lock().unwrap_or_else(|error| {
        log::warn!("backend supervisor lock poisoned: {error}");
        error.into_inner()
    })
}

/// Sends events for one instance until that instance is stopped.
#[derive(Clone)]
struct InstanceSink {
    instance: u64,
    cancel: CancellationToken,
    state: Arc<Mutex<SupervisorState>>,
    events: UnboundedSender<SupervisorEvent>,
}

impl InstanceSink {
    fn emit(&self, event: SupervisorEvent) {
        // Checked under the state lock so nothing slips out after `stop()`.
        let _state = lock_state(&self.state);
        if !self.cancel.is_cancelled() {
            let _ = self.events.send(event);
        }
    }
}

/// Owns the backend child process. At most one instance is live at a time.
pub struct BackendSupervisor {
    settings: LaunchSettings,
    source: Arc<dyn ProcessSource>,
    state: Arc<Mutex<SupervisorState>>,
    events: UnboundedSender<SupervisorEvent>,
    next_instance: AtomicU64,
}

impl BackendSupervisor {
    pub fn new(
        settings: LaunchSettings,
        source: Arc<dyn ProcessSource>,
    ) -> (Self, UnboundedReceiver<SupervisorEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let supervisor = Self {
            settings,
            source,
            state: Arc::new(Mutex::new(SupervisorState {
                live: None,
                status: SupervisorStatus::Idle,
                latest_instance: 0,
            })),
            events,
            next_instance: AtomicU64::new(0),
        };
        (supervisor, receiver)
    }

    pub fn status(&self) -> SupervisorStatus {
        lock_state(&self.state).status
    }

    /// Resolves the launch plan from disk and the process environment, then
    /// spawns it. Must be called from inside a Tokio runtime.
    pub fn start(&self) -> Result<(), SupervisorError> {
        let plan = plan_backend_launch(&self.settings, &process_env_lookup, |path| path.exists());
        log::info!(
            "starting backend ({:?}) in {}: {:?}",
            plan.strategy,
            plan.cwd.display(),
            plan.debug_command()
        );
        self.launch(plan)
    }

    pub fn launch(&self, plan: LaunchPlan) -> Result<(), SupervisorError> {
        let mut state = lock_state(&self.state);
        if let Some(live) = &state.live {
            return Err(SupervisorError::AlreadyRunning { pid: live.pid });
        }

        let instance = self.next_instance.fetch_add(1, Ordering::SeqCst) + 1;
        state.latest_instance = instance;
        let command = plan.debug_command();
        let spawned = match self.source.spawn(&plan) {
            Ok(spawned) => spawned,
            Err(source) => {
                state.status = SupervisorStatus::SpawnFailed;
                let _ = self.events.send(SupervisorEvent::SpawnFailed {
                    instance,
                    message: source.to_string(),
                });
                return Err(SupervisorError::Spawn { command, source });
            }
        };

        let SpawnedProcess {
            pid,
            stdout,
            stderr,
            exit,
            terminator,
        } = spawned;
        let cancel = CancellationToken::new();
        state.live = Some(LiveBackend {
            instance,
            pid,
            cancel: cancel.clone(),
            terminator,
        });
        state.status = SupervisorStatus::Running { pid };
        let _ = self.events.send(SupervisorEvent::Started {
            instance,
            pid,
            command,
        });
        drop(state);

        let sink = InstanceSink {
            instance,
            cancel,
            state: Arc::clone(&self.state),
            events: self.events.clone(),
        };
        if let Some(stdout) = stdout {
            tokio::spawn(forward_output(stdout, OutputStream::Stdout, sink.clone()));
        }
        if let Some(stderr) = stderr {
            tokio::spawn(forward_output(stderr, OutputStream::Stderr, sink.clone()));
        }
        tokio::spawn(watch_exit(exit, sink));
        Ok(())
    }

    /// Sends a termination request to the live backend, if any, and returns
    /// without waiting for it to exit.
    pub fn stop(&self) {
        let live = {
            let mut state = lock_state(&self.state);
            let Some(live) = state.live.take() else {
                return;
            };
            live.cancel.cancel();
            state.status = SupervisorStatus::Stopped;
            live
        };

        log::info!("stopping backend (pid {:?})", live.pid);
        if let Err(error) = live.terminator.terminate() {
            log::warn!("failed to terminate backend (pid {:?}): {error}", live.pid);
        }
    }
}

async fn forward_output(reader: OutputReader, stream: OutputStream, sink: InstanceSink) {
    let mut reader = BufReader::new(reader);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        let read = tokio::select! {
            _ = sink.cancel.cancelled() => break,
            read = reader.read_until(b'\n', &mut buffer) => read,
        };
        match read {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer)
                    .trim_end_matches(&['\r', '\n'][..])
                    .to_string();
                sink.emit(SupervisorEvent::Output {
                    instance: sink.instance,
                    stream,
                    line,
                });
            }
            Err(error) => {
                log::debug!("backend {stream:?} closed: {error}");
                break;
            }
        }
    }
}

async fn watch_exit(exit: ExitFuture, sink: InstanceSink) {
    let result = exit.await;

    let code = match result {
        Ok(code) => code,
        Err(error) => {
            log::warn!("failed to wait for backend process: {error}");
            None
        }
    };

    let mut state = lock_state(&sink.state);
    let is_current = state
        .live
        .as_ref()
        .is_some_and(|live| live.instance == sink.instance);
    if is_current {
        state.live = None;
        state.status = SupervisorStatus::Exited { code };
    } else if state.live.is_some() || state.latest_instance != sink.instance {
        // A newer instance owns the event stream now.
        return;
    }

    let _ = sink.events.send(SupervisorEvent::Exited {
        instance: sink.instance,
        code,
    });
}

pub fn log_supervisor_event(event: &SupervisorEvent) {
    match event {
        SupervisorEvent::Started { pid, command, .. } => {
            log::info!("Backend started (pid {pid:?}): {command:?}");
        }
        SupervisorEvent::Output {
            stream: OutputStream::Stdout,
            line,
            ..
        } => log::info!("{BACKEND_LOG_PREFIX} {line}"),
        SupervisorEvent::Output {
            stream: OutputStream::Stderr,
            line,
            ..
        } => log::warn!("{BACKEND_LOG_PREFIX} {line}"),
        SupervisorEvent::Exited { code: Some(code), .. } => {
            log::info!("Backend exited with code {code}");
        }
        SupervisorEvent::Exited { code: None, .. } => {
            log::info!("Backend exited with code unknown");
        }
        SupervisorEvent::SpawnFailed { message, .. } => {
            log::error!("Backend spawn error: {message}");
        }
    }
}

/// Drains supervisor events into the log until the supervisor is dropped.
pub async fn log_supervisor_events(mut events: UnboundedReceiver<SupervisorEvent>) {
    while let Some(event) = events.recv().await {
        log_supervisor_event(&event);
    }
}
