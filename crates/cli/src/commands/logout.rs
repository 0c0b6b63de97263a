// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tether_sync::{perform_logout_cleanup, Paths};

use super::print_json;
use crate::cli::OutputFormat;
use crate::context::Context;
use crate::error::Result;

pub fn run(paths: &Paths, output: OutputFormat) -> Result<()> {
    let ctx = Context::open(paths)?;
    let persister = ctx.cache(paths);
    let report = perform_logout_cleanup(&ctx.offline, Some(&persister));
    match output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            println!(
                "Cleared {} mutation(s), {} registration(s), {} meta entr{}",
                report.mutations_cleared,
                report.registrations_cleared,
                report.meta_entries_cleared,
                if report.meta_entries_cleared == 1 { "y" } else { "ies" }
            );
            Ok(())
        }
    }
}
