// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`command`] holds the `CommandSpec` value type, builds process-group
//!   commands for long-lived children and runs fire-and-forget one-shots.
//! - [`supervisor`] owns the start / stop / restart lifecycle of a single
//!   long-lived child (the app server, the template generator).

pub mod command;
pub mod supervisor;

pub use command::{spawn_detached, CommandSpec};
pub use supervisor::SupervisedTask;
