// src/watch/debounce.rs

//! Per-path debouncing of filesystem events.
//!
//! Editors frequently touch a file several times per save. For every path we
//! keep at most one table entry; each new event for that path pushes the
//! entry's deadline out by the quiet period. When the deadline finally
//! passes the handler runs on the entry's own Tokio task, so slow handlers
//! for one path never delay another path.
//!
//! The entry stays in the table while its handler runs and is removed only
//! once the handler has returned. Handlers for one path therefore never
//! overlap: an event arriving mid-handler is queued on the entry and fires
//! after the running handler completes, once its quiet period has passed.
//!
//! The handler and the event it receives are fixed by the first event of a
//! burst. Later events in the same burst only move the deadline.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use crate::watch::event::{FsEvent, FsEventKind};

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(100);

/// Which reaction a debounced event gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// A path appeared: watch it if it is a directory.
    Rescan,
    /// A path disappeared: drop it from the watch set.
    Unwatch,
    /// A file was written: dispatch on its extension.
    Dispatch,
}

impl Action {
    /// `None` for event kinds that are tolerated but not acted upon.
    pub fn for_kind(kind: FsEventKind) -> Option<Self> {
        match kind {
            FsEventKind::Create => Some(Action::Rescan),
            FsEventKind::Remove => Some(Action::Unwatch),
            FsEventKind::Write => Some(Action::Dispatch),
            FsEventKind::Rename | FsEventKind::Chmod | FsEventKind::Other => None,
        }
    }
}

/// Receives debounced events.
pub trait ActionHandler: Send + Sync + 'static {
    fn handle(
        &self,
        action: Action,
        event: FsEvent,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

#[derive(Debug)]
struct PendingTimer {
    deadline: Instant,
    /// The handler for this path is running.
    firing: bool,
    /// First event seen while `firing`; starts the next burst.
    queued: Option<(Action, FsEvent)>,
}

impl PendingTimer {
    fn armed(deadline: Instant) -> Self {
        Self {
            deadline,
            firing: false,
            queued: None,
        }
    }
}

pub struct Debouncer<H: ActionHandler> {
    quiet: Duration,
    handler: Arc<H>,
    pending: Arc<Mutex<HashMap<PathBuf, PendingTimer>>>,
}

impl<H: ActionHandler> Clone for Debouncer<H> {
    fn clone(&self) -> Self {
        Self {
            quiet: self.quiet,
            handler: Arc::clone(&self.handler),
            pending: Arc::clone(&self.pending),
        }
    }
}

impl<H: ActionHandler> std::fmt::Debug for Debouncer<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("quiet", &self.quiet)
            .field("pending", &self.pending_len())
            .finish_non_exhaustive()
    }
}

impl<H: ActionHandler> Debouncer<H> {
    pub fn new(handler: Arc<H>, quiet: Duration) -> Self {
        Self {
            quiet,
            handler,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Number of paths with an armed timer or a running handler.
    pub fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    /// Feed one event. Returns false if its kind is ignored.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn push(&self, event: FsEvent) -> bool {
        let Some(action) = Action::for_kind(event.kind) else {
            trace!(path = ?event.path, kind = ?event.kind, "ignoring event kind");
            return false;
        };

        let deadline = Instant::now() + self.quiet;
        let mut pending = self.lock_pending();

        if let Some(timer) = pending.get_mut(&event.path) {
            timer.deadline = deadline;
            if timer.firing && timer.queued.is_none() {
                trace!(path = ?event.path, ?action, "handler running; queued follow-up");
                timer.queued = Some((action, event));
            } else {
                trace!(path = ?event.path, "re-armed debounce timer");
            }
            return true;
        }

        pending.insert(event.path.clone(), PendingTimer::armed(deadline));
        drop(pending);

        trace!(path = ?event.path, ?action, "armed debounce timer");
        self.spawn_timer(action, event, deadline);
        true
    }

    fn spawn_timer(&self, mut action: Action, mut event: FsEvent, first_deadline: Instant) {
        let pending = Arc::clone(&self.pending);
        let handler = Arc::clone(&self.handler);

        tokio::spawn(async move {
            let mut deadline = first_deadline;

            loop {
                tokio::time::sleep_until(deadline).await;

                // Either pick up a pushed-out deadline or claim the firing.
                {
                    let mut table = pending.lock().unwrap_or_else(PoisonError::into_inner);
                    match table.get_mut(&event.path) {
                        Some(timer) if timer.deadline > deadline => {
                            deadline = timer.deadline;
                            continue;
                        }
                        Some(timer) => timer.firing = true,
                        None => return,
                    }
                }

                debug!(path = ?event.path, ?action, "debounce timer fired");
                let path = event.path.clone();
                handler.handle(action, event).await;

                // Remove the entry unless events arrived while the handler ran.
                let mut table = pending.lock().unwrap_or_else(PoisonError::into_inner);
                let Some(timer) = table.get_mut(&path) else {
                    return;
                };
                match timer.queued.take() {
                    Some((next_action, next_event)) => {
                        timer.firing = false;
                        deadline = timer.deadline;
                        action = next_action;
                        event = next_event;
                        trace!(path = ?path, ?action, "re-armed after handler");
                    }
                    None => {
                        table.remove(&path);
                        return;
                    }
                }
            }
        });
    }

    /// Event pump: runs until either notification channel is closed.
    pub async fn run(
        self,
        mut events: UnboundedReceiver<FsEvent>,
        mut errors: UnboundedReceiver<notify::Error>,
    ) {
        info!(quiet_ms = self.quiet.as_millis() as u64, "debounce loop started");

        loop {
            tokio::select! {
                err = errors.recv() => match err {
                    Some(err) => error!(error = %err, "file watch error"),
                    None => break,
                },
                event = events.recv() => match event {
                    Some(event) => {
                        self.push(event);
                    }
                    None => break,
                },
            }
        }

        info!("debounce loop finished (watcher closed)");
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, PendingTimer>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
