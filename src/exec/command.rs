// src/exec/command.rs

//! Command-line values and process spawning helpers.

use std::fmt;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// A program plus its argument list, as configured for a supervised task or
/// a one-shot notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, args: &[String]) -> Self {
        Self {
            program: program.into(),
            args: args.to_vec(),
        }
    }

    /// Build a command for a long-lived child.
    ///
    /// On Unix the child becomes the leader of a fresh process group so the
    /// whole tree it spawns (e.g. `go run` and the binary it builds) can be
    /// signalled as a unit. Stdout/stderr are inherited for passthrough.
    pub fn supervised_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Run `spec` once in the background and forget about it.
///
/// Output is discarded; failures are only visible at debug level.
pub fn spawn_detached(spec: CommandSpec) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let result = Command::new(&spec.program)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match result {
            Ok(status) if status.success() => {
                debug!(cmd = %spec, "one-shot command finished");
            }
            Ok(status) => {
                debug!(cmd = %spec, %status, "one-shot command exited unsuccessfully");
            }
            Err(err) => {
                debug!(cmd = %spec, error = %err, "failed to run one-shot command");
            }
        }
    })
}
