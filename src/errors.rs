// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DevloopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("File watch error: {0}")]
    NotifyError(#[from] notify::Error),

    #[error("failed to spawn task '{task}': {source}")]
    Spawn {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error("task '{0}' has no running process")]
    NotRunning(String),

    #[error("task '{task}' already exited ({status})")]
    AlreadyExited { task: String, status: ExitStatus },

    #[error("failed to signal process group of task '{task}': {source}")]
    Signal {
        task: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DevloopError>;
