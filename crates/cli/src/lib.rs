// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tether-cli: operator tooling for offline sync state
//!
//! Every command opens the same stores the runtime uses and goes through
//! the `tether-core` / `tether-sync` operations, so what the CLI shows and
//! changes is exactly what the client will see on its next start.

pub mod cli;
pub mod commands;
pub mod context;
pub mod display;
pub mod error;
pub mod logging;

pub use cli::{CacheCommand, Cli, Command, OutputFormat, QueueCommand, SocketCommand};
pub use error::{Error, Result};

use tether_sync::Paths;

/// Dispatches a parsed command against the data directory in `paths`.
pub fn run(command: Command, paths: &Paths) -> Result<()> {
    match command {
        Command::Status { output } => commands::status::run(paths, output),
        Command::Queue(cmd) => match cmd {
            QueueCommand::List { status, output } => {
                commands::queue::list(paths, status.as_deref(), output)
            }
            QueueCommand::Show { id, output } => commands::queue::show(paths, &id, output),
            QueueCommand::Dismiss { id } => commands::queue::dismiss(paths, &id),
            QueueCommand::Reclaim { older_than_secs } => {
                commands::queue::reclaim(paths, older_than_secs)
            }
        },
        Command::Socket(SocketCommand::List {
            feature,
            session,
            output,
        }) => commands::socket::list(paths, &feature, &session, output),
        Command::Cache(cmd) => match cmd {
            CacheCommand::Stats { output } => commands::cache::stats(paths, output),
            CacheCommand::Clear => commands::cache::clear(paths),
        },
        Command::Logout { output } => commands::logout::run(paths, output),
    }
}
