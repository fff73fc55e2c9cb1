use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::time::Instant;

use devloop::bundle::{BuildReport, Bundler};
use devloop::watch::{Action, ActionHandler, FsEvent, WatchRegistry};

/// A bundler that:
/// - counts how often it was asked to rebuild
/// - returns a fixed report without touching the filesystem.
#[derive(Debug, Default)]
pub struct FakeBundler {
    rebuilds: AtomicUsize,
    report: BuildReport,
}

impl FakeBundler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            rebuilds: AtomicUsize::new(0),
            report: BuildReport::failed(message),
        }
    }

    pub fn rebuilds(&self) -> usize {
        self.rebuilds.load(Ordering::SeqCst)
    }
}

impl Bundler for FakeBundler {
    fn rebuild(&self) -> Pin<Box<dyn Future<Output = BuildReport> + Send + '_>> {
        Box::pin(async move {
            self.rebuilds.fetch_add(1, Ordering::SeqCst);
            self.report.clone()
        })
    }
}

/// Registry that records registrations instead of talking to the OS.
///
/// Clones share the same log, so keep one clone for assertions and hand the
/// other to the `WatchSet`.
#[derive(Debug, Clone, Default)]
pub struct RecordingRegistry {
    registered: Arc<Mutex<Vec<PathBuf>>>,
    deregistered: Arc<Mutex<Vec<PathBuf>>>,
    fail_on: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `register` fail for `path`.
    pub fn fail_on(&self, path: impl AsRef<Path>) {
        self.fail_on.lock().unwrap().push(path.as_ref().to_path_buf());
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        self.registered.lock().unwrap().clone()
    }

    pub fn deregistered(&self) -> Vec<PathBuf> {
        self.deregistered.lock().unwrap().clone()
    }
}

impl WatchRegistry for RecordingRegistry {
    fn register(&mut self, path: &Path) -> anyhow::Result<()> {
        if self.fail_on.lock().unwrap().iter().any(|p| p == path) {
            anyhow::bail!("refusing to watch {:?}", path);
        }
        self.registered.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn deregister(&mut self, path: &Path) -> anyhow::Result<()> {
        self.deregistered.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

/// One handler invocation seen by [`RecordingHandler`].
#[derive(Debug, Clone)]
pub struct Invocation {
    pub action: Action,
    pub event: FsEvent,
    pub at: Instant,
    pub finished: Instant,
}

/// Debounce handler that records every invocation with its (Tokio) time.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<Invocation>>,
    /// Simulated handler duration.
    delay: Option<std::time::Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: std::time::Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of handler invocations that were running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, path: impl AsRef<Path>) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.event.path == path.as_ref())
            .collect()
    }
}

impl ActionHandler for RecordingHandler {
    fn handle(
        &self,
        action: Action,
        event: FsEvent,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        Box::pin(async move {
            let at = Instant::now();
            let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(running, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push(Invocation {
                action,
                event,
                at,
                finished: Instant::now(),
            });
        })
    }
}
