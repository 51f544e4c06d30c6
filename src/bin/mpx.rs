//! # MPX
//!
//! Runs an Extreme Unloader command script with bounded parallelism.
//!
//! ```text
//! mpx -p 8 --mpxlist sqlplus,sqlldr --ignlist grep unload.mpx SCOTT HR
//! ```

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, warn};

use xtru_mpx::logging::{init_structured_logging, LoggingOptions};
use xtru_mpx::{
    ConfigManager, ConfigOverrides, MpxConfig, Orchestrator, RunState, RunStatus,
    ScriptInvocation, StopReason, TracingStatusSink,
};

#[derive(Parser, Debug)]
#[command(name = "mpx")]
#[command(about = "Parallel command runner for Extreme Unloader scripts")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Maximum number of concurrently running tasks per batch (1-64)
    #[arg(short, long)]
    parallelism: Option<usize>,

    /// Niceness applied to every child (-20..19)
    #[arg(short, long, allow_hyphen_values = true)]
    nice: Option<i32>,

    /// Comma separated program names that run in parallel batches
    #[arg(long)]
    mpxlist: Option<String>,

    /// Comma separated program names whose failures do not stop the run
    #[arg(long)]
    ignlist: Option<String>,

    /// Directory to change into before reading the script
    #[arg(short, long)]
    startup: Option<PathBuf>,

    /// Text fed to every child's stdin, or @file to decrypt a credential file
    #[arg(long)]
    csi: Option<String>,

    /// Capture file for child stdout
    #[arg(long)]
    cso: Option<PathBuf>,

    /// Capture file for child stderr
    #[arg(long)]
    cse: Option<PathBuf>,

    /// Interval between "still running" status lines
    #[arg(long = "heartbeat-ms")]
    heartbeat_ms: Option<u64>,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write JSON logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Pass SIGINT/SIGTERM on to running children
    #[arg(long)]
    forward_signals: bool,

    /// Script file followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    cmd: Vec<String>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            parallelism: self.parallelism,
            nice: self.nice,
            mpxlist: self.mpxlist.clone(),
            ignlist: self.ignlist.clone(),
            startup: self.startup.clone(),
            csi: self.csi.clone(),
            cso: self.cso.clone(),
            cse: self.cse.clone(),
            heartbeat_interval_ms: self.heartbeat_ms,
            forward_signals: self.forward_signals.then_some(true),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_structured_logging(&LoggingOptions {
        verbosity: cli.verbose,
        log_file: cli.log_file.clone(),
    });

    let code = match run(cli).await {
        Ok(status) => status.exit_code(),
        Err(e) => {
            error!(error = %format!("{e:#}"), "MPX run aborted");
            eprintln!("{}: {e:#}", RunStatus::Failed.message());
            RunStatus::Failed.exit_code()
        }
    };

    process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<RunStatus> {
    let invocation = ScriptInvocation::parse(&cli.cmd)?;
    let config: MpxConfig = ConfigManager::load(cli.config.as_deref(), &cli.overrides())?;

    info!(
        parallelism = config.parallelism,
        script = %invocation.file.display(),
        "Starting MPX"
    );

    let run_state = Arc::new(RunState::new());
    watch_signals(run_state.clone(), config.forward_signals);

    let orchestrator = Orchestrator::new(
        config,
        invocation,
        run_state,
        Arc::new(TracingStatusSink),
    );
    let summary = orchestrator.run().await?;

    println!("{}", summary.report());
    Ok(summary.status())
}

/// Turn Ctrl-C and SIGTERM into a stop request for the run
fn watch_signals(run_state: Arc<RunState>, forward: bool) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use nix::sys::signal::Signal;
            use tokio::signal::unix::{signal, SignalKind};

            let mut terminate = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(error = %e, "Could not install SIGTERM handler");
                    return;
                }
            };

            loop {
                let received = tokio::select! {
                    result = tokio::signal::ctrl_c() => match result {
                        Ok(()) => Signal::SIGINT,
                        Err(_) => return,
                    },
                    _ = terminate.recv() => Signal::SIGTERM,
                };

                warn!(signal = %received, "Stop requested, waiting for running tasks");
                run_state.request_stop(StopReason::Signal {
                    name: received.as_str().to_string(),
                });

                if forward {
                    let delivered = run_state.signal_live_children(received);
                    info!(signal = %received, delivered, "Forwarded signal to children");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = forward;
            if tokio::signal::ctrl_c().await.is_ok() {
                run_state.request_stop(StopReason::Signal {
                    name: "SIGINT".to_string(),
                });
            }
        }
    });
}
