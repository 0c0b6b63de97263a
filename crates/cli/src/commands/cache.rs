// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tether_sync::Paths;

use super::print_json;
use crate::cli::OutputFormat;
use crate::context::Context;
use crate::display::{format_bytes, format_ms};
use crate::error::Result;

pub fn stats(paths: &Paths, output: OutputFormat) -> Result<()> {
    let ctx = Context::open(paths)?;
    let stats = ctx.cache(paths).stats();
    match output {
        OutputFormat::Json => print_json(&stats),
        OutputFormat::Text => {
            let mode = if stats.degraded { "fallback" } else { "sqlite" };
            println!("Storage: {mode}");
            match (stats.saved_at, stats.bytes) {
                (Some(saved_at), Some(bytes)) => {
                    println!("Snapshot: {} saved {}", format_bytes(bytes), format_ms(saved_at));
                    if let Some(entries) = stats.entries {
                        println!("Entries: {entries}");
                    }
                }
                _ => println!("Snapshot: none"),
            }
            println!("Budget: {}", format_bytes(ctx.config.cache.max_bytes));
            if let Some(backup_saved_at) = stats.backup_saved_at {
                println!("Backup: saved {}", format_ms(backup_saved_at));
            }
            Ok(())
        }
    }
}

pub fn clear(paths: &Paths) -> Result<()> {
    let ctx = Context::open(paths)?;
    ctx.cache(paths).clear_persisted_cache();
    println!("Cleared cache snapshot");
    Ok(())
}
