// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{DevloopError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = DevloopError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_watch(cfg)?;
    validate_bundler(cfg)?;
    validate_processes(cfg)?;
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.quiet_period_ms == 0 {
        return Err(DevloopError::ConfigError(
            "[watch].quiet_period_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    validate_extensions("asset_extensions", &cfg.watch.asset_extensions)?;
    validate_extensions("server_extensions", &cfg.watch.server_extensions)?;

    for dir in cfg.watch.exclude.iter() {
        if dir.trim().is_empty() {
            return Err(DevloopError::ConfigError(
                "[watch].exclude must not contain empty paths".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_extensions(key: &str, exts: &[String]) -> Result<()> {
    for ext in exts {
        if ext.is_empty() {
            return Err(DevloopError::ConfigError(format!(
                "[watch].{key} must not contain empty extensions"
            )));
        }
        if ext.starts_with('.') {
            return Err(DevloopError::ConfigError(format!(
                "[watch].{key}: extension '{ext}' must not start with '.'"
            )));
        }
    }
    Ok(())
}

fn validate_bundler(cfg: &RawConfigFile) -> Result<()> {
    if cfg.bundler.program.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[bundler].program must not be empty".to_string(),
        ));
    }
    if cfg.bundler.entry_points.is_empty() {
        return Err(DevloopError::ConfigError(
            "[bundler].entry_points must list at least one entry point".to_string(),
        ));
    }
    if cfg.bundler.output_dir.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[bundler].output_dir must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_processes(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.cmd.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[server].cmd must not be empty".to_string(),
        ));
    }
    if cfg.generator.cmd.trim().is_empty() {
        return Err(DevloopError::ConfigError(
            "[generator].cmd must not be empty".to_string(),
        ));
    }
    Ok(())
}
