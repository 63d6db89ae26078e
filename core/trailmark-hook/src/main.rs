//! Trailmark hook binary.
//!
//! Replays newline-delimited activity events through the Trailmark sink and
//! prints the resulting analytics records to stdout.

use std::path::PathBuf;

use clap::Parser;

mod handle;
mod logging;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "trailmark-hook")]
#[command(about = "Replay activity events through the Trailmark sink")]
struct Args {
    /// Application host name used for app://{host}/ URLs (overrides the config file)
    #[arg(long, value_name = "HOST")]
    app_host: Option<String>,

    /// Read events from a file instead of stdin
    #[arg(short, long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Config file (defaults to ~/.trailmark/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory for log files (defaults to ~/.trailmark)
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Treat every report as rejected by the backend
    #[arg(long)]
    reject_all: bool,

    /// Trace-level logging for both crates
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_guard = logging::init(args.log_dir, args.verbose);

    let options = handle::RunOptions {
        app_host: args.app_host,
        input: args.input,
        config: args.config,
        reject_all: args.reject_all,
    };

    if let Err(e) = handle::run(options).await {
        tracing::error!(error = %e, "Replay failed");
        eprintln!("trailmark-hook: {}", e);
        drop(log_guard);
        std::process::exit(1);
    }
}
