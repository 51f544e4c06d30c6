//! # Run State
//!
//! Process-wide cooperative cancellation and the registry of live children.
//!
//! One [`RunState`] is created per process and shared by reference between
//! the orchestrator, the synchronizer and every task. The continue flag is
//! monotonic: once a stop has been requested it never goes back to `true`.
//!
//! The launch lock serialises the short critical sections that must not
//! interleave across tasks: changing the working directory, spawning a child
//! together with registering its PID and feeding its stdin, and the exit
//! handling that writes a task's record to the shared capture files.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard};
use tracing::{debug, warn};

use crate::constants::events::STOP_REQUESTED;
use crate::logging::log_run_event;

/// Why the run stopped accepting new work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StopReason {
    /// A task that is not on the ignore list exited non-zero
    TaskFailed {
        label: String,
        program: String,
        exit_code: i32,
    },
    /// An external signal asked the run to stop
    Signal { name: String },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskFailed {
                label,
                program,
                exit_code,
            } => write!(f, "task {} ({program}) failed with rc={exit_code}", label.trim()),
            Self::Signal { name } => write!(f, "received {name}"),
        }
    }
}

#[derive(Debug, Default)]
struct LiveChildren {
    pids: HashSet<u32>,
    peak: usize,
}

#[derive(Debug)]
pub struct RunState {
    keep_going: AtomicBool,
    stop_reason: Mutex<Option<StopReason>>,
    children: Mutex<LiveChildren>,
    launch_lock: AsyncMutex<()>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            keep_going: AtomicBool::new(true),
            stop_reason: Mutex::new(None),
            children: Mutex::new(LiveChildren::default()),
            launch_lock: AsyncMutex::new(()),
        }
    }

    /// Should new work still be started?
    pub fn should_continue(&self) -> bool {
        self.keep_going.load(Ordering::SeqCst)
    }

    /// Request a global stop. Returns `true` if this call stopped the run;
    /// later requests keep the first reason.
    pub fn request_stop(&self, reason: StopReason) -> bool {
        let mut stop_reason = self.stop_reason.lock();
        if stop_reason.is_some() {
            debug!(%reason, "Stop already requested, keeping first reason");
            return false;
        }

        log_run_event(STOP_REQUESTED, "stopping", Some(&reason.to_string()));
        *stop_reason = Some(reason);
        self.keep_going.store(false, Ordering::SeqCst);
        true
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason.lock().clone()
    }

    pub fn register_child(&self, pid: u32) {
        let mut children = self.children.lock();
        children.pids.insert(pid);
        children.peak = children.peak.max(children.pids.len());
    }

    pub fn deregister_child(&self, pid: u32) {
        self.children.lock().pids.remove(&pid);
    }

    /// Snapshot of the PIDs of children that have been spawned and not yet reaped
    pub fn live_children(&self) -> Vec<u32> {
        let mut pids: Vec<u32> = self.children.lock().pids.iter().copied().collect();
        pids.sort_unstable();
        pids
    }

    /// Highest number of simultaneously live children seen so far
    pub fn peak_live_children(&self) -> usize {
        self.children.lock().peak
    }

    /// Acquire the process-wide launch lock
    pub async fn launch_lock(&self) -> MutexGuard<'_, ()> {
        self.launch_lock.lock().await
    }

    /// Change the process working directory without racing a spawn
    pub async fn change_directory(&self, path: &Path) -> std::io::Result<()> {
        let _guard = self.launch_lock().await;
        std::env::set_current_dir(path)
    }

    /// Best-effort delivery of `signal` to every live child; returns how many
    /// children were signalled
    #[cfg(unix)]
    pub fn signal_live_children(&self, signal: nix::sys::signal::Signal) -> usize {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let mut delivered = 0;
        for pid in self.live_children() {
            let Ok(raw) = i32::try_from(pid) else {
                continue;
            };
            match kill(Pid::from_raw(raw), signal) {
                Ok(()) => delivered += 1,
                Err(e) => warn!(pid, %signal, error = %e, "Could not signal child"),
            }
        }
        delivered
    }
}
