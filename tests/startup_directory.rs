//! Startup directory handling.
//!
//! Changing directory affects the whole test process, so these checks live in
//! their own test binary and run as one sequential test.

mod common;

use std::sync::Arc;

use common::read;
use xtru_mpx::{MemoryStatusSink, MpxConfig, MpxError, Orchestrator, RunState, ScriptInvocation};

#[tokio::test]
async fn test_startup_directory_scopes_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("no-such-dir");

    let config = MpxConfig {
        startup: Some(missing.clone()),
        ..MpxConfig::default()
    };
    let result = Orchestrator::new(
        config,
        ScriptInvocation::new("run.mpx", Vec::new()),
        Arc::new(RunState::new()),
        Arc::new(MemoryStatusSink::new()),
    )
    .run()
    .await;
    match result {
        Err(MpxError::StartupDirectory { path, .. }) => assert_eq!(path, missing),
        other => panic!("unexpected result: {other:?}"),
    }

    std::fs::write(dir.path().join("run.mpx"), "sh -c 'echo hello > made.txt'\npwd\n").unwrap();
    let config = MpxConfig {
        startup: Some(dir.path().to_path_buf()),
        mpxlist: Vec::new(),
        ..MpxConfig::default()
    };
    let summary = Orchestrator::new(
        config,
        ScriptInvocation::new("run.mpx", Vec::new()),
        Arc::new(RunState::new()),
        Arc::new(MemoryStatusSink::new()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(read(&dir.path().join("made.txt")), "hello\n");

    // default capture files are relative to the startup directory
    let stdout = read(&dir.path().join("_stdout.log"));
    let canonical = dir.path().canonicalize().unwrap();
    assert!(stdout.contains(&canonical.to_string_lossy().to_string()));
}
