//! Shared fixtures for orchestrator integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use xtru_mpx::{MemoryStatusSink, MpxConfig, Orchestrator, RunState, ScriptInvocation};

pub struct ScriptFixture {
    pub dir: TempDir,
    pub script: PathBuf,
    pub console: Arc<MemoryStatusSink>,
}

impl ScriptFixture {
    pub fn new(body: &str) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let script = dir.path().join("run.mpx");
        std::fs::write(&script, body).expect("write script");
        Self {
            dir,
            script,
            console: Arc::new(MemoryStatusSink::new()),
        }
    }

    pub fn stdout_path(&self) -> PathBuf {
        self.dir.path().join("_stdout.log")
    }

    pub fn stderr_path(&self) -> PathBuf {
        self.dir.path().join("_stderr.log")
    }

    /// Config writing capture files into the fixture directory
    pub fn config(&self, multiplex: &[&str], ignore: &[&str]) -> MpxConfig {
        MpxConfig {
            mpxlist: multiplex.iter().map(|s| s.to_string()).collect(),
            ignlist: ignore.iter().map(|s| s.to_string()).collect(),
            cso: self.stdout_path(),
            cse: self.stderr_path(),
            ..MpxConfig::default()
        }
    }

    pub fn orchestrator(&self, config: MpxConfig, args: &[&str]) -> Orchestrator {
        Orchestrator::new(
            config,
            ScriptInvocation::new(&self.script, args.iter().map(|s| s.to_string()).collect()),
            Arc::new(RunState::new()),
            self.console.clone(),
        )
    }
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}
