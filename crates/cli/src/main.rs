// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::{error, info};

use ttyshim::config::Config;
use ttyshim::run::{init_tracing, run};

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    // Exit without waiting on the blocking stdin read that may still be parked.
    match run(config).await {
        Ok(summary) => {
            info!(reason = ?summary.reason, window = %summary.window, "exiting");
            std::process::exit(0);
        }
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}
