// tests/router_dispatch.rs

#![cfg(unix)]

mod common;
use crate::common::{init_tracing, FakeBundler, RecordingRegistry};

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use devloop::exec::{CommandSpec, SupervisedTask};
use devloop::fs::mock::MockFileSystem;
use devloop::watch::event::from_notify;
use devloop::watch::{Action, ActionHandler, ExtensionRules, FsEvent, FsEventKind, Router, WatchSet};
use notify::event::{EventKind, ModifyKind, RenameMode};

struct Harness {
    fs: MockFileSystem,
    watch_set: Arc<WatchSet>,
    bundler: Arc<FakeBundler>,
    server: Arc<SupervisedTask>,
    router: Router,
}

async fn harness(manifest: bool) -> Harness {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_file("/proj/assets/main.js", "console.log(1)");
    fs.add_file("/proj/cmd/server/main.go", "package main");

    let watch_set = Arc::new(WatchSet::new(
        Box::new(RecordingRegistry::new()),
        Arc::new(fs.clone()),
        Vec::new(),
    ));
    watch_set.watch(Path::new("/proj")).unwrap();

    let bundler = Arc::new(FakeBundler::new());
    let server = Arc::new(
        SupervisedTask::spawn(
            "server",
            CommandSpec::new("sleep", &["30".to_string()]),
            Duration::from_secs(2),
        )
        .await
        .unwrap(),
    );

    let router = Router::new(
        Arc::clone(&watch_set),
        Arc::new(fs.clone()),
        bundler.clone(),
        Arc::clone(&server),
        CommandSpec::new("true", &[]),
        ExtensionRules {
            asset: vec!["js".to_string(), "css".to_string()],
            server: vec!["go".to_string()],
            manifest,
        },
    );

    Harness {
        fs,
        watch_set,
        bundler,
        server,
        router,
    }
}

impl Harness {
    async fn fire(&self, action: Action, path: &str, kind: FsEventKind) {
        self.router.handle(action, FsEvent::new(path, kind)).await;
    }

    async fn write(&self, path: &str) {
        self.fire(Action::Dispatch, path, FsEventKind::Write).await;
    }

    async fn shutdown(self) {
        let _ = self.server.stop().await;
    }
}

#[tokio::test]
async fn script_write_rebuilds_then_restarts_with_manifest() {
    let h = harness(true).await;
    let before = h.server.pid().await.unwrap();

    h.write("/proj/assets/main.js").await;

    assert_eq!(h.bundler.rebuilds(), 1);
    let after = h.server.pid().await.unwrap();
    assert_ne!(before, after);
    assert!(h.server.is_running().await);
    h.shutdown().await;
}

#[tokio::test]
async fn stylesheet_write_only_rebuilds_without_manifest() {
    let h = harness(false).await;
    let before = h.server.pid().await;

    h.write("/proj/assets/main.css").await;

    assert_eq!(h.bundler.rebuilds(), 1);
    assert_eq!(h.server.pid().await, before);
    h.shutdown().await;
}

#[tokio::test]
async fn server_source_write_restarts_without_rebuild() {
    let h = harness(true).await;
    let before = h.server.pid().await;

    h.write("/proj/cmd/server/main.go").await;

    assert_eq!(h.bundler.rebuilds(), 0);
    assert_ne!(h.server.pid().await, before);
    h.shutdown().await;
}

#[tokio::test]
async fn unrelated_write_is_ignored() {
    let h = harness(true).await;
    let before = h.server.pid().await;

    h.write("/proj/README.md").await;
    h.write("/proj/Makefile").await;

    assert_eq!(h.bundler.rebuilds(), 0);
    assert_eq!(h.server.pid().await, before);
    h.shutdown().await;
}

#[tokio::test]
async fn created_directory_is_watched_recursively() {
    let h = harness(true).await;
    h.fs.add_dir("/proj/views/partials");

    h.fire(Action::Rescan, "/proj/views", FsEventKind::Create).await;

    assert!(h.watch_set.contains(Path::new("/proj/views")));
    assert!(h.watch_set.contains(Path::new("/proj/views/partials")));
    h.shutdown().await;
}

#[tokio::test]
async fn created_file_or_vanished_path_is_ignored() {
    let h = harness(true).await;
    let before = h.watch_set.snapshot();

    h.fs.add_file("/proj/assets/extra.js", "");
    h.fire(Action::Rescan, "/proj/assets/extra.js", FsEventKind::Create)
        .await;
    h.fire(Action::Rescan, "/proj/gone", FsEventKind::Create).await;

    assert_eq!(h.watch_set.snapshot(), before);
    assert_eq!(h.bundler.rebuilds(), 0);
    h.shutdown().await;
}

#[tokio::test]
async fn removed_directory_is_unwatched() {
    let h = harness(true).await;
    h.fs.remove("/proj/cmd");

    h.fire(Action::Unwatch, "/proj/cmd", FsEventKind::Remove).await;

    assert!(!h.watch_set.contains(Path::new("/proj/cmd")));
    assert!(!h.watch_set.contains(Path::new("/proj/cmd/server")));
    assert!(h.watch_set.contains(Path::new("/proj/assets")));
    h.shutdown().await;
}

#[tokio::test]
async fn directory_recreated_before_remove_fires_is_watched_again() {
    let h = harness(true).await;
    h.fs.remove("/proj/cmd");
    h.fs.add_dir("/proj/cmd/worker");

    h.fire(Action::Unwatch, "/proj/cmd", FsEventKind::Remove).await;

    assert!(h.watch_set.contains(Path::new("/proj/cmd")));
    assert!(h.watch_set.contains(Path::new("/proj/cmd/worker")));
    assert!(!h.watch_set.contains(Path::new("/proj/cmd/server")));
    h.shutdown().await;
}

#[tokio::test]
async fn directory_moved_into_the_tree_is_watched() {
    let h = harness(true).await;
    // `mv ../lib ./lib`: the tree appears under its new name in one go.
    h.fs.add_dir("/proj/lib/util");

    let moved = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::To)))
        .add_path("/proj/lib".into());
    for event in from_notify(moved) {
        let action = Action::for_kind(event.kind).expect("moved-in path is acted upon");
        h.router.handle(action, event).await;
    }

    assert!(h.watch_set.contains(Path::new("/proj/lib")));
    assert!(h.watch_set.contains(Path::new("/proj/lib/util")));
    h.shutdown().await;
}

#[tokio::test]
async fn directory_moved_out_of_the_tree_is_not_rescanned() {
    let h = harness(true).await;
    let before = h.watch_set.snapshot();

    let moved = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::From)))
        .add_path("/proj/cmd".into());
    for event in from_notify(moved) {
        assert_eq!(Action::for_kind(event.kind), None);
    }

    assert_eq!(h.watch_set.snapshot(), before);
    h.shutdown().await;
}
