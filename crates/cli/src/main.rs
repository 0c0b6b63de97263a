// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![deny(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

use clap::Parser;
use tether_cli::Cli;
use tether_sync::{resolve_data_dir, Paths};

fn main() {
    let cli = Cli::parse();
    let paths = Paths::new(resolve_data_dir(cli.data_dir.as_deref()));

    let log_file = cli.log_file.then(|| paths.log_file());
    tether_cli::logging::setup_logging(log_file.as_deref());

    if let Err(e) = tether_cli::run(cli.command, &paths) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
