// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cosa daemon (cosad)
//!
//! Background process that owns the job-execution fabric and serves the
//! control socket. Typically started by a client; it listens on a Unix
//! socket under the data dir and runs until a shutdown request or
//! signal.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use cosa_daemon::lifecycle::{self, LifecycleError};
use cosa_daemon::listener::Listener;
use std::path::Path;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

/// Rotate the log file at startup once it exceeds this size.
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("cosad {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("cosad {}", env!("CARGO_PKG_VERSION"));
                println!("cosa daemon - supervises agent workers and the job queue");
                println!();
                println!("USAGE:");
                println!("    cosad");
                println!();
                println!("The daemon is normally started by a cosa client and should not");
                println!("be invoked directly. It listens on a Unix socket for requests.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: cosad [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = lifecycle::load_config()?;
    let data_dir = lifecycle::resolve_data_dir(&config);
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("cosad.log");
    rotate_log_if_needed(&log_path);
    let _log_guard = setup_logging(&log_path)?;

    info!("starting cosad");

    let (daemon, socket) = match lifecycle::startup(config).await {
        Ok(started) => started,
        Err(LifecycleError::LockFailed(path)) => {
            let pid = std::fs::read_to_string(&path).unwrap_or_default();
            eprintln!("cosad is already running");
            if !pid.trim().is_empty() {
                eprintln!("  pid: {}", pid.trim());
            }
            std::process::exit(1);
        }
        Err(e) => {
            error!("failed to start daemon: {e}");
            return Err(e.into());
        }
    };

    // Socket I/O runs in its own task; this task waits for a stop signal.
    let listener = Listener::new(socket, Arc::clone(&daemon.deps));
    daemon.ctx.tracker.spawn(listener.run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %daemon.data.socket_path().display(), "daemon ready");
    println!("READY");

    let shutdown = Arc::clone(&daemon.deps.shutdown);
    tokio::select! {
        _ = shutdown.notified() => info!("shutdown requested"),
        _ = sigterm.recv() => info!("SIGTERM received"),
        _ = sigint.recv() => info!("SIGINT received"),
    }

    lifecycle::shutdown(daemon).await;
    Ok(())
}

/// Rename an oversized log aside so the fresh file stays tailable.
fn rotate_log_if_needed(log_path: &Path) {
    let Ok(metadata) = std::fs::metadata(log_path) else {
        return;
    };
    if metadata.len() > MAX_LOG_SIZE {
        let rotated = log_path.with_extension("log.1");
        let _ = std::fs::rename(log_path, rotated);
    }
}

fn setup_logging(
    log_path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error>> {
    use tracing_subscriber::EnvFilter;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
