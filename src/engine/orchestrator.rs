// src/engine/orchestrator.rs

//! Startup and shutdown sequencing.
//!
//! Startup:
//! 1. ensure the asset output directory exists
//! 2. set up the bundler
//! 3. create the filesystem watcher
//! 4. build the assets once
//! 5. start the server and the template generator
//! 6. start the debounce loop, then watch the project tree
//!
//! Shutdown (on the given future, normally SIGINT/SIGTERM): stop the
//! generator, then the server, then close the watcher.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::bundle::{run_bundler, Bundler, EsbuildBundler, EsbuildOptions};
use crate::config::ConfigFile;
use crate::errors::{DevloopError, Result};
use crate::exec::SupervisedTask;
use crate::fs::{FileSystem, RealFileSystem};
use crate::watch::{create_source, Debouncer, ExtensionRules, Router, WatchSet};

/// How long shutdown waits for the debounce loop to notice the closed watcher.
const LOOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Orchestrator {
    config: ConfigFile,
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    /// Set by [`Orchestrator::with_bundler`]; otherwise esbuild is set up in
    /// [`Orchestrator::run`].
    bundler: Option<Arc<dyn Bundler>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("root", &self.root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Build an orchestrator for the project at `root` using the esbuild CLI.
    ///
    /// Nothing touches the filesystem until [`Orchestrator::run`].
    pub fn new(config: ConfigFile, root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            root: root.into(),
            fs: Arc::new(RealFileSystem),
            bundler: None,
        }
    }

    /// Replace the bundler (tests use a fake).
    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = Some(bundler);
        self
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Run until `shutdown` resolves, then stop the supervised processes.
    ///
    /// Setup failures (bundler setup, watcher creation, spawning the server
    /// or generator) are returned; everything after startup is only logged.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let cfg = &self.config;

        let output_dir = cfg.output_dir_in(&self.root);
        if let Err(err) = self.fs.create_dir_all(&output_dir) {
            error!(path = ?output_dir, error = %format!("{err:#}"), "failed to create asset output directory");
        }

        let bundler: Arc<dyn Bundler> = match &self.bundler {
            Some(bundler) => Arc::clone(bundler),
            None => {
                let options = EsbuildOptions::from_config(cfg, &self.root);
                let esbuild = EsbuildBundler::new(options, Arc::clone(&self.fs))
                    .map_err(|e| DevloopError::Other(e.context("setting up esbuild")))?;
                Arc::new(esbuild)
            }
        };

        let (watcher, channels) = create_source()?;

        run_bundler(bundler.as_ref()).await;

        let server = Arc::new(
            SupervisedTask::spawn("server", cfg.server_command(), cfg.server.stop_timeout())
                .await?,
        );

        let generator = match SupervisedTask::spawn(
            "generator",
            cfg.generator_command(),
            cfg.generator.stop_timeout(),
        )
        .await
        {
            Ok(task) => task,
            Err(err) => {
                stop_logged(&server).await;
                return Err(err);
            }
        };

        let watch_set = Arc::new(WatchSet::new(
            Box::new(watcher),
            Arc::clone(&self.fs),
            cfg.excluded_dirs_in(&self.root),
        ));

        let router = Arc::new(Router::new(
            Arc::clone(&watch_set),
            Arc::clone(&self.fs),
            bundler,
            Arc::clone(&server),
            cfg.generator_notify_command(),
            ExtensionRules {
                asset: cfg.watch.asset_extensions.clone(),
                server: cfg.watch.server_extensions.clone(),
                manifest: cfg.bundler.manifest,
            },
        ));

        let debouncer = Debouncer::new(router, cfg.quiet_period());
        let loop_handle = tokio::spawn(debouncer.run(channels.events, channels.errors));

        {
            let watch_set = Arc::clone(&watch_set);
            let root = self.root.clone();
            match tokio::task::spawn_blocking(move || watch_set.watch(&root)).await {
                Ok(Ok(count)) => info!(root = ?self.root, dirs = count, "watching project tree"),
                Ok(Err(err)) => {
                    error!(root = ?self.root, error = %format!("{err:#}"), "failed to watch project root")
                }
                Err(err) => warn!(error = %err, "initial directory scan task failed"),
            }
        }

        shutdown.await;

        info!("stopping template generator");
        stop_logged(&generator).await;
        info!("stopping server");
        stop_logged(&server).await;

        watch_set.close();
        if tokio::time::timeout(LOOP_DRAIN_TIMEOUT, loop_handle).await.is_err() {
            warn!("debounce loop did not finish in time");
        }

        info!("shutdown complete");
        Ok(())
    }
}

async fn stop_logged(task: &SupervisedTask) {
    if let Err(err) = task.stop().await {
        warn!(task = %task.name(), error = %err, "failed to stop task");
    }
}
