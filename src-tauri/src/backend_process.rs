use std::{future::Future, io, pin::Pin, process::Stdio};

use tokio::{io::AsyncRead, process::Command};

use crate::{launch_plan::LaunchPlan, process_control};

pub type OutputReader = Pin<Box<dyn AsyncRead + Send>>;
/// Resolves with the exit code once the process is gone. `None` means the
/// process was ended by a signal.
pub type ExitFuture = Pin<Box<dyn Future<Output = io::Result<Option<i32>>> + Send>>;

pub trait Terminate: Send + Sync {
    fn terminate(&self) -> io::Result<()>;
}

/// A freshly spawned backend, split into the parts the supervisor drives
/// independently.
pub struct SpawnedProcess {
    pub pid: Option<u32>,
    pub stdout: Option<OutputReader>,
    pub stderr: Option<OutputReader>,
    pub exit: ExitFuture,
    pub terminator: Box<dyn Terminate>,
}

pub trait ProcessSource: Send + Sync {
    fn spawn(&self, plan: &LaunchPlan) -> io::Result<SpawnedProcess>;
}

struct PidTerminator {
    pid: u32,
}

impl Terminate for PidTerminator {
    fn terminate(&self) -> io::Result<()> {
        process_control::request_termination(self.pid)
    }
}

struct AlreadyGone;

impl Terminate for AlreadyGone {
    fn terminate(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Spawns real OS processes. Must be used from inside a Tokio runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioProcessSource;

impl ProcessSource for TokioProcessSource {
    fn spawn(&self, plan: &LaunchPlan) -> io::Result<SpawnedProcess> {
        let mut command = Command::new(&plan.program);
        command
            .args(&plan.args)
            .current_dir(&plan.cwd)
            .envs(plan.env.iter().map(|(key, value)| (key, value)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(target_os = "windows")]
        command.creation_flags(process_control::CREATE_NO_WINDOW);

        let mut child = command.spawn()?;
        let pid = child.id();
        let stdout = child
            .stdout
            .take()
            .map(|stream| Box::pin(stream) as OutputReader);
        let stderr = child
            .stderr
            .take()
            .map(|stream| Box::pin(stream) as OutputReader);
        let terminator: Box<dyn Terminate> = match pid {
            Some(pid) => Box::new(PidTerminator { pid }),
            None => Box::new(AlreadyGone),
        };
        let exit = Box::pin(async move { child.wait().await.map(|status| status.code()) });

        Ok(SpawnedProcess {
            pid,
            stdout,
            stderr,
            exit,
            terminator,
        })
    }
}
