// src/watch/router.rs

//! Turns debounced events into reactions.
//!
//! - create: if the path is a directory, watch it (recursively).
//! - remove: unwatch the path; if a directory of the same name already
//!   exists again, watch that instead.
//! - write: classify by extension into rebuild / restart reactions.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::bundle::{run_bundler, Bundler};
use crate::exec::{spawn_detached, CommandSpec, SupervisedTask};
use crate::fs::FileSystem;
use crate::watch::debounce::{Action, ActionHandler};
use crate::watch::event::FsEvent;
use crate::watch::watch_set::WatchSet;

/// Extension routing rules for write events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRules {
    /// Extensions (without the dot) that trigger an asset rebuild.
    pub asset: Vec<String>,
    /// Extensions that trigger a server restart.
    pub server: Vec<String>,
    /// The server reads the manifest at startup, so rebuilt assets are
    /// only picked up after a restart.
    pub manifest: bool,
}

/// What a write event should cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    Rebuild,
    RestartServer,
}

/// Pure classification of a written file.
pub fn reactions_for_write(path: &Path, rules: &ExtensionRules) -> Vec<Reaction> {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return Vec::new();
    };

    if rules.asset.iter().any(|a| a == ext) {
        if rules.manifest {
            vec![Reaction::Rebuild, Reaction::RestartServer]
        } else {
            vec![Reaction::Rebuild]
        }
    } else if rules.server.iter().any(|s| s == ext) {
        vec![Reaction::RestartServer]
    } else {
        Vec::new()
    }
}

pub struct Router {
    watch_set: Arc<WatchSet>,
    fs: Arc<dyn FileSystem>,
    bundler: Arc<dyn Bundler>,
    server: Arc<SupervisedTask>,
    generator_notify: CommandSpec,
    rules: ExtensionRules,
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("server", &self.server.name())
            .field("generator_notify", &self.generator_notify)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl Router {
    pub fn new(
        watch_set: Arc<WatchSet>,
        fs: Arc<dyn FileSystem>,
        bundler: Arc<dyn Bundler>,
        server: Arc<SupervisedTask>,
        generator_notify: CommandSpec,
        rules: ExtensionRules,
    ) -> Self {
        Self {
            watch_set,
            fs,
            bundler,
            server,
            generator_notify,
            rules,
        }
    }

    async fn on_create(&self, path: PathBuf) {
        // Already gone again: nothing to do.
        let Ok(is_dir) = self.fs.lstat_is_dir(&path) else {
            return;
        };
        if is_dir {
            self.watch_dir(path).await;
        }
    }

    async fn on_remove(&self, path: PathBuf) {
        let removed = self.watch_set.unwatch(&path);
        if removed > 0 {
            debug!(path = ?path, removed, "dropped removed directory from watch set");
        }

        // A remove immediately followed by a re-create lands here only once.
        if let Ok(true) = self.fs.lstat_is_dir(&path) {
            debug!(path = ?path, "directory re-created; watching again");
            self.watch_dir(path).await;
        }
    }

    async fn on_write(&self, path: PathBuf) {
        for reaction in reactions_for_write(&path, &self.rules) {
            match reaction {
                Reaction::Rebuild => {
                    run_bundler(self.bundler.as_ref()).await;
                }
                Reaction::RestartServer => self.restart_server(&path).await,
            }
        }
    }

    async fn watch_dir(&self, path: PathBuf) {
        let watch_set = Arc::clone(&self.watch_set);
        let result = tokio::task::spawn_blocking(move || {
            let res = watch_set.watch(&path);
            (path, res)
        })
        .await;

        match result {
            Ok((_, Ok(_added))) => {}
            Ok((path, Err(err))) => {
                error!(path = ?path, error = %format!("{err:#}"), "failed to watch new directory");
            }
            Err(err) => warn!(error = %err, "directory scan task failed"),
        }
    }

    async fn restart_server(&self, trigger: &Path) {
        info!(file = ?trigger, task = %self.server.name(), "restarting server");
        if let Err(err) = self.server.restart().await {
            error!(task = %self.server.name(), error = %err, "failed to restart server");
        }
        spawn_detached(self.generator_notify.clone());
    }
}

impl ActionHandler for Router {
    fn handle(
        &self,
        action: Action,
        event: FsEvent,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            match action {
                Action::Rescan => self.on_create(event.path).await,
                Action::Unwatch => self.on_remove(event.path).await,
                Action::Dispatch => self.on_write(event.path).await,
            }
        })
    }
}
