// src/exec/supervisor.rs

//! Lifecycle of one externally owned child process.
//!
//! A [`SupervisedTask`] is either stopped (no child attached) or running
//! (exactly one child attached). All transitions go through a per-task
//! async mutex, so a `restart` can never race a `stop` and the old process
//! is always gone before the new one is spawned.

use std::time::Duration;

use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::{DevloopError, Result};
use crate::exec::command::CommandSpec;

#[derive(Debug)]
pub struct SupervisedTask {
    name: String,
    spec: CommandSpec,
    stop_timeout: Duration,
    child: Mutex<Option<Child>>,
}

impl SupervisedTask {
    /// Create a task in the stopped state.
    pub fn new(name: impl Into<String>, spec: CommandSpec, stop_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            spec,
            stop_timeout,
            child: Mutex::new(None),
        }
    }

    /// Create a task and start it immediately.
    pub async fn spawn(
        name: impl Into<String>,
        spec: CommandSpec,
        stop_timeout: Duration,
    ) -> Result<Self> {
        let task = Self::new(name, spec, stop_timeout);
        task.start().await?;
        Ok(task)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &CommandSpec {
        &self.spec
    }

    /// PID of the attached child, if any.
    pub async fn pid(&self) -> Option<u32> {
        self.child.lock().await.as_ref().and_then(|c| c.id())
    }

    /// Whether a child is attached and has not exited yet.
    pub async fn is_running(&self) -> bool {
        let mut slot = self.child.lock().await;
        match slot.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Spawn the configured command. Returns the new PID.
    ///
    /// If a previous child is still alive it is stopped first.
    pub async fn start(&self) -> Result<u32> {
        let mut slot = self.child.lock().await;
        if let Some(child) = slot.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                warn!(task = %self.name, "start requested while running; stopping old process");
                self.stop_locked(&mut slot).await?;
            }
        }
        self.start_locked(&mut slot)
    }

    /// Send SIGTERM to the task's process group and wait for the leader to
    /// exit, escalating to SIGKILL after the stop timeout.
    pub async fn stop(&self) -> Result<()> {
        let mut slot = self.child.lock().await;
        self.stop_locked(&mut slot).await
    }

    /// Stop, then start with the same command line.
    ///
    /// A child that already exited (or was never started) leaves nothing to
    /// stop, so the new process is started anyway; a server that crashed on
    /// a bad build comes back on the next trigger. Any other stop failure
    /// means the old process may still be alive, and the new one is not
    /// started.
    pub async fn restart(&self) -> Result<u32> {
        let mut slot = self.child.lock().await;
        match self.stop_locked(&mut slot).await {
            Ok(()) => {}
            Err(DevloopError::AlreadyExited { status, .. }) => {
                info!(task = %self.name, %status, "process had already exited; starting a new one");
            }
            Err(DevloopError::NotRunning(_)) => {
                debug!(task = %self.name, "no process attached; starting a new one");
            }
            Err(err) => return Err(err),
        }
        self.start_locked(&mut slot)
    }

    fn start_locked(&self, slot: &mut Option<Child>) -> Result<u32> {
        let child = self
            .spec
            .supervised_command()
            .spawn()
            .map_err(|source| DevloopError::Spawn {
                task: self.name.clone(),
                source,
            })?;

        // `id()` only returns None after the child was reaped, which cannot
        // have happened yet.
        let pid = child.id().unwrap_or_default();
        info!(task = %self.name, pid, cmd = %self.spec, "started process");
        *slot = Some(child);
        Ok(pid)
    }

    async fn stop_locked(&self, slot: &mut Option<Child>) -> Result<()> {
        let Some(child) = slot.as_mut() else {
            return Err(DevloopError::NotRunning(self.name.clone()));
        };

        if let Some(status) = child.try_wait()? {
            *slot = None;
            return Err(DevloopError::AlreadyExited {
                task: self.name.clone(),
                status,
            });
        }

        let Some(pid) = child.id() else {
            *slot = None;
            return Err(DevloopError::NotRunning(self.name.clone()));
        };

        terminate_group(&self.name, pid, child)?;

        match tokio::time::timeout(self.stop_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                info!(task = %self.name, pid, %status, "process stopped");
            }
            Ok(Err(err)) => {
                warn!(task = %self.name, pid, error = %err, "failed to wait for stopped process");
            }
            Err(_) => {
                warn!(
                    task = %self.name,
                    pid,
                    timeout_ms = self.stop_timeout.as_millis() as u64,
                    "process did not exit after SIGTERM; killing"
                );
                kill_group(&self.name, pid, child);
                if let Err(err) = child.wait().await {
                    debug!(task = %self.name, pid, error = %err, "wait after kill failed");
                }
            }
        }

        *slot = None;
        Ok(())
    }
}

#[cfg(unix)]
fn terminate_group(task: &str, pid: u32, _child: &mut Child) -> Result<()> {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::{getpgid, Pid};

    let signal_err = |errno: nix::errno::Errno| DevloopError::Signal {
        task: task.to_string(),
        source: std::io::Error::from(errno),
    };

    let pgid = getpgid(Some(Pid::from_raw(pid as i32))).map_err(signal_err)?;
    debug!(task, pid, pgid = pgid.as_raw(), "sending SIGTERM to process group");
    killpg(pgid, Signal::SIGTERM).map_err(signal_err)
}

#[cfg(unix)]
fn kill_group(task: &str, pid: u32, _child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    // The child was spawned with process_group(0), so its pgid is its pid.
    if let Err(err) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        debug!(task, pid, error = %err, "SIGKILL to process group failed");
    }
}

// Without process groups we can only reach the direct child.
#[cfg(not(unix))]
fn terminate_group(task: &str, _pid: u32, child: &mut Child) -> Result<()> {
    child.start_kill().map_err(|source| DevloopError::Signal {
        task: task.to_string(),
        source,
    })
}

#[cfg(not(unix))]
fn kill_group(task: &str, pid: u32, child: &mut Child) {
    if let Err(err) = child.start_kill() {
        debug!(task, pid, error = %err, "kill failed");
    }
}
