// src/watch/watch_set.rs

//! The dynamic set of directories under observation.
//!
//! Directories are registered one by one (non-recursively) with the OS
//! notification mechanism, so new subdirectories must be added as they
//! appear and removed ones dropped. The set itself is a sorted `Vec` behind
//! a mutex; the OS registry sits behind its own mutex so registration calls
//! never hold up set lookups.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::fs::FileSystem;

/// OS-level registration of a single directory.
pub trait WatchRegistry: Send {
    fn register(&mut self, path: &Path) -> Result<()>;
    fn deregister(&mut self, path: &Path) -> Result<()>;
}

pub struct WatchSet {
    dirs: Mutex<Vec<PathBuf>>,
    registry: Mutex<Option<Box<dyn WatchRegistry>>>,
    fs: Arc<dyn FileSystem>,
    excluded: Vec<PathBuf>,
}

impl std::fmt::Debug for WatchSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSet")
            .field("dirs", &self.len())
            .field("excluded", &self.excluded)
            .finish_non_exhaustive()
    }
}

/// Directories whose name starts with `.` (e.g. `.git`) are never watched.
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

impl WatchSet {
    pub fn new(
        registry: Box<dyn WatchRegistry>,
        fs: Arc<dyn FileSystem>,
        excluded: Vec<PathBuf>,
    ) -> Self {
        Self {
            dirs: Mutex::new(Vec::new()),
            registry: Mutex::new(Some(registry)),
            fs,
            excluded,
        }
    }

    /// Recursively register `root` and every directory below it, skipping
    /// hidden and excluded subtrees.
    ///
    /// Fails only when `root` itself cannot be inspected. Problems further
    /// down skip the affected subtree and the walk carries on with its
    /// siblings. Returns the number of newly watched directories.
    pub fn watch(&self, root: &Path) -> Result<usize> {
        if !self.fs.lstat_is_dir(root)? {
            return Ok(0);
        }
        let mut added = 0;
        self.visit(root, &mut added);
        Ok(added)
    }

    fn visit(&self, dir: &Path, added: &mut usize) {
        if is_hidden(dir) {
            debug!(path = ?dir, "skipping hidden directory");
            return;
        }
        if self.excluded.iter().any(|e| e == dir) {
            warn!(path = ?dir, "skipping directory");
            return;
        }

        if self.contains(dir) {
            debug!(path = ?dir, "directory already watched");
        } else {
            if let Err(err) = self.register(dir) {
                warn!(path = ?dir, error = %err, "failed to watch directory; skipping subtree");
                return;
            }
            if self.insert(dir) {
                info!(path = ?dir, "watching directory");
                *added += 1;
            }
        }

        let mut entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = ?dir, error = %format!("{err:#}"), "cannot read directory; skipping subtree");
                return;
            }
        };
        entries.sort();

        for entry in entries {
            // Entries that vanished mid-walk are simply not directories anymore.
            if let Ok(true) = self.fs.lstat_is_dir(&entry) {
                self.visit(&entry, added);
            }
        }
    }

    /// Stop watching `path` and every watched directory below it.
    ///
    /// Paths that are not in the set (including plain files) are ignored.
    /// Returns the number of directories removed.
    pub fn unwatch(&self, path: &Path) -> usize {
        let removed: Vec<PathBuf> = {
            let mut dirs = self.lock_dirs();
            let Ok(start) = dirs.binary_search_by(|p| p.as_path().cmp(path)) else {
                return 0;
            };
            // Descendants sort directly after their ancestor.
            let end = dirs[start..]
                .iter()
                .position(|p| !p.starts_with(path))
                .map(|offset| start + offset)
                .unwrap_or(dirs.len());
            dirs.drain(start..end).collect()
        };

        let mut registry = self.lock_registry();
        for dir in &removed {
            info!(path = ?dir, "no longer watching directory");
            if let Some(registry) = registry.as_mut() {
                // The OS usually drops the watch itself when the directory goes away.
                if let Err(err) = registry.deregister(dir) {
                    debug!(path = ?dir, error = %err, "deregister failed");
                }
            }
        }
        removed.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock_dirs()
            .binary_search_by(|p| p.as_path().cmp(path))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.lock_dirs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of the watched directories.
    pub fn snapshot(&self) -> Vec<PathBuf> {
        self.lock_dirs().clone()
    }

    /// Drop the OS registry. This closes the notification channels, which in
    /// turn ends the debounce loop. Later `watch` calls only update the set.
    pub fn close(&self) {
        if self.lock_registry().take().is_some() {
            debug!("watch registry closed");
        }
    }

    fn register(&self, dir: &Path) -> Result<()> {
        match self.lock_registry().as_mut() {
            Some(registry) => registry.register(dir),
            None => Ok(()),
        }
    }

    /// Insert keeping the set sorted; false if another walker got there first.
    fn insert(&self, dir: &Path) -> bool {
        let mut dirs = self.lock_dirs();
        match dirs.binary_search_by(|p| p.as_path().cmp(dir)) {
            Ok(_) => false,
            Err(idx) => {
                dirs.insert(idx, dir.to_path_buf());
                true
            }
        }
    }

    fn lock_dirs(&self) -> std::sync::MutexGuard<'_, Vec<PathBuf>> {
        self.dirs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_registry(&self) -> std::sync::MutexGuard<'_, Option<Box<dyn WatchRegistry>>> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
