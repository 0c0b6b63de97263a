// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Output format for commands that support structured output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "tether")]
#[command(version)]
#[command(about = "Inspect and maintain offline sync state")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to $TETHER_DATA_DIR or the platform data dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,

    /// Write logs to tether.log in the data directory instead of stderr
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Summarize queue, storage and cache state
    Status {
        #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Inspect and repair the mutation queue
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Inspect queued realtime sends
    #[command(subcommand)]
    Socket(SocketCommand),

    /// Inspect or drop the persisted cache snapshot
    #[command(subcommand)]
    Cache(CacheCommand),

    /// Remove all per-user offline state
    Logout {
        #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
}

#[derive(Subcommand)]
pub enum QueueCommand {
    /// List queued mutations in replay order
    List {
        /// Only show mutations with this status
        #[arg(long, short)]
        status: Option<String>,

        #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Show one queued mutation
    Show {
        id: String,

        #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Drop a failed mutation
    Dismiss { id: String },

    /// Return abandoned in-flight claims to pending
    Reclaim {
        /// Claim age in seconds (defaults to sync.stale_claim_after_secs)
        #[arg(long, value_name = "SECS")]
        older_than_secs: Option<u64>,
    },
}

#[derive(Subcommand)]
pub enum SocketCommand {
    /// List queued sends for one feature and session
    List {
        feature: String,
        session: String,

        #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },
}

#[derive(Subcommand)]
pub enum CacheCommand {
    /// Show snapshot size, age and storage mode
    Stats {
        #[arg(long = "output", short = 'o', value_enum, default_value_t = OutputFormat::Text)]
        output: OutputFormat,
    },

    /// Delete the snapshot and its backup
    Clear,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
