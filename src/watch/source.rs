// src/watch/source.rs

//! OS notification source built on `notify`.
//!
//! `notify` invokes its handler synchronously on its own thread. The handler
//! here only splits events per path and forwards them (and errors) into two
//! unbounded Tokio channels, which the debounce loop consumes. Both channels
//! close when the watcher is dropped.

use std::path::Path;

use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::errors::Result;
use crate::watch::event::{from_notify, FsEvent};
use crate::watch::watch_set::WatchRegistry;

/// Receiving ends of a notification source.
#[derive(Debug)]
pub struct SourceChannels {
    pub events: UnboundedReceiver<FsEvent>,
    pub errors: UnboundedReceiver<notify::Error>,
}

/// Create the platform watcher and its channels. Nothing is watched yet;
/// directories are added through [`WatchRegistry::register`].
///
/// Fails with [`DevloopError::NotifyError`](crate::errors::DevloopError::NotifyError)
/// when the platform backend cannot be initialised (e.g. inotify instance
/// limit reached).
pub fn create_source() -> Result<(RecommendedWatcher, SourceChannels)> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<FsEvent>();
    let (error_tx, error_rx) = mpsc::unbounded_channel::<notify::Error>();

    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| match res {
            Ok(event) => {
                for fs_event in from_notify(event) {
                    // Receiver gone means we're shutting down.
                    if event_tx.send(fs_event).is_err() {
                        return;
                    }
                }
            }
            Err(err) => {
                let _ = error_tx.send(err);
            }
        },
        Config::default(),
    )?;

    Ok((
        watcher,
        SourceChannels {
            events: event_rx,
            errors: error_rx,
        },
    ))
}

impl WatchRegistry for RecommendedWatcher {
    fn register(&mut self, path: &Path) -> anyhow::Result<()> {
        self.watch(path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn deregister(&mut self, path: &Path) -> anyhow::Result<()> {
        self.unwatch(path)?;
        Ok(())
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::errors::DevloopError;
    use crate::watch::event::FsEventKind;
    use std::time::Duration;

    #[tokio::test]
    async fn registered_directory_delivers_events() {
        let dir = tempfile::Builder::new().prefix("devloop").tempdir().unwrap();
        let (mut watcher, mut channels) = create_source().unwrap();
        watcher.register(dir.path()).unwrap();

        let file = dir.path().join("main.go");
        std::fs::write(&file, "package main\n").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = channels.events.recv().await.expect("watcher alive");
                if event.path == file {
                    break event;
                }
            }
        })
        .await
        .expect("no event for the new file");
        assert!(matches!(event.kind, FsEventKind::Create | FsEventKind::Write));
    }

    #[test]
    fn registering_a_missing_directory_fails() {
        let dir = tempfile::Builder::new().prefix("devloop").tempdir().unwrap();
        let (mut watcher, _channels) = create_source().unwrap();
        assert!(watcher.register(&dir.path().join("gone")).is_err());
    }

    #[test]
    fn backend_errors_convert_to_notify_error() {
        let err: DevloopError = notify::Error::generic("inotify limit").into();
        assert!(matches!(err, DevloopError::NotifyError(_)));
    }
}
