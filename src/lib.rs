// src/lib.rs

pub mod bundle;
pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::bundle::EsbuildOptions;
use crate::cli::CliArgs;
use crate::config::{load_or_default, resolve_config_path, ConfigFile};
use crate::engine::{Orchestrator, ShutdownSignal};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - project root + config loading
/// - signal handling (SIGINT / SIGTERM)
/// - the orchestrator (bundler, supervised processes, watcher)
pub async fn run(args: CliArgs) -> Result<()> {
    let root = project_root(args.root.as_deref())?;
    let config_path = resolve_config_path(&root, &args.config);
    let cfg = load_or_default(&config_path)
        .with_context(|| format!("loading config from {:?}", config_path))?;

    if args.dry_run {
        print_dry_run(&cfg, &root);
        return Ok(());
    }

    let shutdown = ShutdownSignal::install().context("installing signal handlers")?;
    let orchestrator = Orchestrator::new(cfg, root);
    orchestrator.run(shutdown.recv()).await?;
    Ok(())
}

/// Absolute project root: `--root` if given, else the working directory.
fn project_root(arg: Option<&str>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("determining working directory")?;
    Ok(match arg {
        Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
        Some(dir) => cwd.join(dir),
        None => cwd,
    })
}

/// Simple dry-run output: print what would be watched and run.
fn print_dry_run(cfg: &ConfigFile, root: &Path) {
    println!("devloop dry-run");
    println!("  root = {}", root.display());
    println!("  watch.quiet_period_ms = {}", cfg.watch.quiet_period_ms);
    println!("  watch.exclude:");
    for dir in cfg.excluded_dirs_in(root) {
        println!("    - {}", dir.display());
    }
    println!("  watch.asset_extensions = {:?}", cfg.watch.asset_extensions);
    println!("  watch.server_extensions = {:?}", cfg.watch.server_extensions);
    println!();

    let options = EsbuildOptions::from_config(cfg, root);
    println!("bundler:");
    println!("  {} {}", options.program, options.args(None).join(" "));
    println!("  manifest: {}", cfg.bundler.manifest);
    println!();

    println!("processes:");
    println!("  server: {}", cfg.server_command());
    println!("  generator: {}", cfg.generator_command());
    println!("  generator notify: {}", cfg.generator_notify_command());

    debug!("dry-run complete (no execution)");
}
