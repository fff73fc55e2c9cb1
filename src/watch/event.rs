// src/watch/event.rs

//! Filesystem event model.

use std::path::PathBuf;

use notify::event::{EventKind, ModifyKind, RenameMode};

/// What happened to a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsEventKind {
    Create,
    Remove,
    Write,
    Rename,
    Chmod,
    Other,
}

/// A single-path filesystem notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

impl FsEvent {
    pub fn new(path: impl Into<PathBuf>, kind: FsEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl From<&EventKind> for FsEventKind {
    fn from(kind: &EventKind) -> Self {
        match kind {
            EventKind::Create(_) => FsEventKind::Create,
            EventKind::Remove(_) => FsEventKind::Remove,
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                FsEventKind::Write
            }
            // Something moved in under this name: same as a fresh create.
            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => FsEventKind::Create,
            EventKind::Modify(ModifyKind::Name(_)) => FsEventKind::Rename,
            EventKind::Modify(ModifyKind::Metadata(_)) => FsEventKind::Chmod,
            _ => FsEventKind::Other,
        }
    }
}

/// Split a `notify` event into one [`FsEvent`] per affected path.
///
/// A rename reported with both ends (`[from, to]`) yields a rename for the
/// old path and a create for the new one.
pub fn from_notify(event: notify::Event) -> Vec<FsEvent> {
    if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
        let mut paths = event.paths.into_iter();
        return paths
            .next()
            .map(|from| FsEvent::new(from, FsEventKind::Rename))
            .into_iter()
            .chain(paths.map(|to| FsEvent::new(to, FsEventKind::Create)))
            .collect();
    }

    let kind = FsEventKind::from(&event.kind);
    event
        .paths
        .into_iter()
        .map(|path| FsEvent { path, kind })
        .collect()
}
