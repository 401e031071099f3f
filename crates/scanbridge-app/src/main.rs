// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanbridge: Scan-button bridge for Brother network scanners
//
// Entry point. Initialises logging, builds the configuration, starts the
// bridge and runs it until interrupted.

mod cli;
mod runtime;

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use cli::Cli;
use runtime::Bridge;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    info!(version = env!("CARGO_PKG_VERSION"), "scanbridge starting");

    let config = match cli.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let bridge = match Bridge::start(config).await {
        Ok(bridge) => bridge,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, shutting down");
                trigger.cancel();
            }
            Err(e) => error!(error = %e, "cannot listen for interrupt signal"),
        }
    });

    bridge.run(shutdown).await;
    info!("scanbridge stopped");
    ExitCode::SUCCESS
}

/// `RUST_LOG` wins; otherwise use the level picked on the command line.
fn init_logging(default_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();
}
