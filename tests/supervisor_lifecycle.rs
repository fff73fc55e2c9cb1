// tests/supervisor_lifecycle.rs

#![cfg(target_os = "linux")]

mod common;
use crate::common::{eventually, init_tracing, is_alive, project_dir, read_pid, with_timeout};

use std::time::Duration;

use tokio::time::Instant;

use devloop::errors::DevloopError;
use devloop::exec::{CommandSpec, SupervisedTask};

fn sh(script: &str) -> CommandSpec {
    CommandSpec::new("sh", &["-c".to_string(), script.to_string()])
}

fn sleeper() -> CommandSpec {
    CommandSpec::new("sleep", &["30".to_string()])
}

#[tokio::test]
async fn restart_never_overlaps_old_and_new_process() {
    init_tracing();

    let task = SupervisedTask::spawn("server", sleeper(), Duration::from_secs(2))
        .await
        .unwrap();

    for _ in 0..3 {
        let old = task.pid().await.unwrap();
        let new = with_timeout(task.restart()).await.unwrap();
        assert_ne!(old, new);
        assert!(!is_alive(old), "old process {old} still alive after restart");
        assert!(is_alive(new));
    }

    task.stop().await.unwrap();
    assert!(!task.is_running().await);
}

#[tokio::test]
async fn stop_terminates_the_whole_process_group() {
    init_tracing();

    let dir = project_dir();
    let pid_file = dir.path().join("grandchild.pid");
    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());

    let task = SupervisedTask::spawn("server", sh(&script), Duration::from_secs(2))
        .await
        .unwrap();

    assert!(eventually(|| read_pid(&pid_file).is_some()).await);
    let grandchild = read_pid(&pid_file).unwrap();
    assert!(is_alive(grandchild));

    with_timeout(task.stop()).await.unwrap();

    // The grandchild is reparented and reaped by someone else, so allow a moment.
    assert!(eventually(|| !is_alive(grandchild)).await);
}

#[tokio::test]
async fn stop_escalates_to_sigkill_after_timeout() {
    init_tracing();

    let task = SupervisedTask::spawn(
        "stubborn",
        sh("trap '' TERM; while :; do sleep 1; done"),
        Duration::from_millis(300),
    )
    .await
    .unwrap();
    // Give the shell time to install its trap.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let pid = task.pid().await.unwrap();

    let started = Instant::now();
    with_timeout(task.stop()).await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(!is_alive(pid));
    assert!(!task.is_running().await);
}

#[tokio::test]
async fn stopping_an_exited_process_reports_already_exited() {
    let task = SupervisedTask::spawn("short", CommandSpec::new("true", &[]), Duration::from_secs(1))
        .await
        .unwrap();

    // Poll through is_running until the child has been reaped.
    let mut exited = false;
    for _ in 0..250 {
        if !task.is_running().await {
            exited = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(exited);

    match task.stop().await {
        Err(DevloopError::AlreadyExited { task, status }) => {
            assert_eq!(task, "short");
            assert!(status.success());
        }
        other => panic!("expected AlreadyExited, got {other:?}"),
    }

    // The exited child has been detached.
    assert!(matches!(task.stop().await, Err(DevloopError::NotRunning(_))));
}

#[tokio::test]
async fn restart_after_crash_starts_a_fresh_process() {
    init_tracing();

    let dir = project_dir();
    let marker = dir.path().join("runs");
    // First run crashes right away; later runs stay up.
    let script = format!(
        "if [ -e {m} ]; then exec sleep 30; else touch {m}; exit 3; fi",
        m = marker.display()
    );
    let task = SupervisedTask::spawn("server", sh(&script), Duration::from_secs(2))
        .await
        .unwrap();
    assert!(eventually(|| marker.exists()).await);
    tokio::time::sleep(Duration::from_millis(300)).await;

    // A plain stop still reports the crash.
    assert!(matches!(
        task.stop().await,
        Err(DevloopError::AlreadyExited { status, .. }) if status.code() == Some(3)
    ));

    // Repeated restarts each bring up a live process.
    for _ in 0..3 {
        let pid = with_timeout(task.restart()).await.unwrap();
        assert!(is_alive(pid));
        assert!(task.is_running().await);
    }
    task.stop().await.unwrap();
}

#[tokio::test]
async fn restart_right_after_a_crash_does_not_need_a_stop() {
    let task = SupervisedTask::spawn("crashy", sh("exit 3"), Duration::from_secs(1))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The exited child is replaced; the new one crashes again on its own.
    let first = task.restart().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    let second = task.restart().await.unwrap();

    assert_ne!(first, second);
    assert_eq!(task.pid().await, Some(second));
}

#[tokio::test]
async fn restart_of_a_never_started_task_starts_it() {
    let task = SupervisedTask::new("idle", sleeper(), Duration::from_secs(1));

    let pid = task.restart().await.unwrap();

    assert!(is_alive(pid));
    task.stop().await.unwrap();
}

#[tokio::test]
async fn restart_with_missing_binary_leaves_task_stopped() {
    let task = SupervisedTask::new(
        "ghost",
        CommandSpec::new("devloop-definitely-missing", &[]),
        Duration::from_secs(1),
    );

    assert!(matches!(task.restart().await, Err(DevloopError::Spawn { .. })));
    assert_eq!(task.pid().await, None);
    assert!(!task.is_running().await);
}

#[tokio::test]
async fn start_while_running_replaces_the_process() {
    let task = SupervisedTask::spawn("server", sleeper(), Duration::from_secs(2))
        .await
        .unwrap();
    let old = task.pid().await.unwrap();

    let new = task.start().await.unwrap();

    assert_ne!(old, new);
    assert!(!is_alive(old));
    task.stop().await.unwrap();
}

#[tokio::test]
async fn concurrent_restarts_are_serialized() {
    let task = std::sync::Arc::new(
        SupervisedTask::spawn("server", sleeper(), Duration::from_secs(2))
            .await
            .unwrap(),
    );

    let a = tokio::spawn({
        let task = task.clone();
        async move { task.restart().await }
    });
    let b = tokio::spawn({
        let task = task.clone();
        async move { task.restart().await }
    });

    let pid_a = with_timeout(a).await.unwrap().unwrap();
    let pid_b = with_timeout(b).await.unwrap().unwrap();
    assert_ne!(pid_a, pid_b);

    let current = task.pid().await.unwrap();
    let (older, newer) = if current == pid_a { (pid_b, pid_a) } else { (pid_a, pid_b) };
    assert_eq!(current, newer);
    assert!(!is_alive(older));
    task.stop().await.unwrap();
}
