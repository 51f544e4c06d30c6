use std::ffi::OsString;
use std::sync::Arc;
use std::time::Duration;

use super::sinks::{OutputSinks, StatusSink};
use crate::run_state::RunState;

/// Shared collaborators of every task in one run
#[derive(Clone)]
pub struct RunContext {
    pub run_state: Arc<RunState>,
    pub console: Arc<dyn StatusSink>,
    pub sinks: Arc<OutputSinks>,
    /// Period of the "still running" status line
    pub heartbeat_interval: Duration,
    /// Directory list searched for executables after the working directory
    pub search_path: Option<OsString>,
}

impl RunContext {
    pub fn new(
        run_state: Arc<RunState>,
        console: Arc<dyn StatusSink>,
        sinks: Arc<OutputSinks>,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            run_state,
            console,
            sinks,
            heartbeat_interval,
            search_path: std::env::var_os("PATH"),
        }
    }

    pub fn with_search_path(mut self, search_path: Option<OsString>) -> Self {
        self.search_path = search_path;
        self
    }
}
