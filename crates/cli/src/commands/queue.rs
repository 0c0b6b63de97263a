// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use tether_core::{MutationStatus, QueuedMutation};
use tether_sync::Paths;

use super::print_json;
use crate::cli::OutputFormat;
use crate::context::Context;
use crate::display::{mutation_detail, mutation_line};
use crate::error::{Error, Result};

pub fn list(paths: &Paths, status: Option<&str>, output: OutputFormat) -> Result<()> {
    let ctx = Context::open(paths)?;
    let mutations = list_impl(&ctx, status)?;
    match output {
        OutputFormat::Json => print_json(&mutations),
        OutputFormat::Text => {
            if mutations.is_empty() {
                println!("No queued mutations");
            }
            for m in &mutations {
                println!("{}", mutation_line(m));
            }
            Ok(())
        }
    }
}

pub(crate) fn list_impl(ctx: &Context, status: Option<&str>) -> Result<Vec<QueuedMutation>> {
    let queue = ctx.mutations();
    match status {
        Some(s) => {
            let status: MutationStatus = s.parse()?;
            Ok(queue.by_status(status))
        }
        None => Ok(queue.all()),
    }
}

pub fn show(paths: &Paths, id: &str, output: OutputFormat) -> Result<()> {
    let ctx = Context::open(paths)?;
    let mutation = ctx
        .mutations()
        .get(id)
        .ok_or_else(|| Error::MutationNotFound(id.to_string()))?;
    match output {
        OutputFormat::Json => print_json(&mutation),
        OutputFormat::Text => {
            print!("{}", mutation_detail(&mutation));
            Ok(())
        }
    }
}

pub fn dismiss(paths: &Paths, id: &str) -> Result<()> {
    let ctx = Context::open(paths)?;
    let dismissed = dismiss_impl(&ctx, id)?;
    println!("Dismissed {} ({})", dismissed.id, dismissed.operation_name);
    Ok(())
}

pub(crate) fn dismiss_impl(ctx: &Context, id: &str) -> Result<QueuedMutation> {
    match ctx.mutations().dismiss(id) {
        Ok(Some(dismissed)) => Ok(dismissed),
        Ok(None) => Err(Error::MutationNotFound(id.to_string())),
        Err(tether_core::Error::InvalidTransition { from, .. }) => Err(Error::NotDismissable {
            id: id.to_string(),
            status: from,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Without `--older-than-secs` the configured stale-claim age is used.
/// A configured age of 0 disables the sweep, so nothing is reclaimed
/// unless the flag is given.
pub fn reclaim(paths: &Paths, older_than_secs: Option<u64>) -> Result<()> {
    let ctx = Context::open(paths)?;
    match reclaim_impl(&ctx, older_than_secs) {
        Some(reclaimed) => println!("Reclaimed {reclaimed} stale claim(s)"),
        None => println!(
            "Stale-claim sweep is disabled (sync.stale_claim_after_secs = 0); \
             pass --older-than-secs to reclaim anyway"
        ),
    }
    Ok(())
}

/// `None` when no age was given and the configured sweep is disabled.
pub(crate) fn reclaim_impl(ctx: &Context, older_than_secs: Option<u64>) -> Option<usize> {
    let max_age = older_than_secs
        .map(Duration::from_secs)
        .or_else(|| ctx.config.sync.stale_claim_after())?;
    Some(ctx.mutations().reclaim_stale(max_age))
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
