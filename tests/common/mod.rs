// tests/common/mod.rs

#![allow(dead_code, unused_imports)]

pub use devloop_test_utils::{
    eventually, init_tracing, with_timeout, ConfigFileBuilder, FakeBundler, RecordingHandler,
    RecordingRegistry,
};

/// Temporary project directory.
///
/// The default `tempfile` names start with `.tmp`, which the watcher treats
/// as hidden, so every test tree gets a visible prefix.
pub fn project_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("devloop")
        .tempdir()
        .expect("create temp project dir")
}

/// Alive means present in /proc and not a zombie.
#[cfg(target_os = "linux")]
pub fn is_alive(pid: u32) -> bool {
    match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
        Ok(stat) => {
            // Format: pid (comm) state ...
            let state = stat.rsplit(')').next().and_then(|rest| rest.trim().chars().next());
            state != Some('Z')
        }
        Err(_) => false,
    }
}

/// PID written by a child script, once the write is complete.
pub fn read_pid(path: &std::path::Path) -> Option<u32> {
    let contents = std::fs::read_to_string(path).ok()?;
    if !contents.ends_with('\n') {
        return None;
    }
    contents.trim().parse().ok()
}
