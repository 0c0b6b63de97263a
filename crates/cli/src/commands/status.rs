// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use serde::Serialize;
use tether_core::meta::{self, LAST_SYNC_COMPLETED_AT};
use tether_core::QueueStats;
use tether_sync::cache::CacheStats;
use tether_sync::Paths;

use super::print_json;
use crate::cli::OutputFormat;
use crate::context::Context;
use crate::display::{format_bytes, format_ms};
use crate::error::Result;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub data_dir: String,
    pub offline_degraded: bool,
    pub queue: QueueStats,
    pub last_sync_completed_at: Option<u64>,
    pub cache: CacheStats,
}

pub fn run(paths: &Paths, output: OutputFormat) -> Result<()> {
    let ctx = Context::open(paths)?;
    let report = collect(&ctx, paths);
    match output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print!("{}", render(&report));
            Ok(())
        }
    }
}

pub(crate) fn collect(ctx: &Context, paths: &Paths) -> StatusReport {
    StatusReport {
        data_dir: paths.data_dir.display().to_string(),
        offline_degraded: ctx.offline.is_degraded(),
        queue: ctx.mutations().stats(),
        last_sync_completed_at: meta::get_meta(&ctx.offline, LAST_SYNC_COMPLETED_AT)
            .and_then(|entry| entry.value.as_u64()),
        cache: ctx.cache(paths).stats(),
    }
}

pub(crate) fn render(report: &StatusReport) -> String {
    let mode = |degraded: bool| if degraded { "fallback" } else { "sqlite" };
    let mut out = format!("Data dir: {}\n", report.data_dir);
    out.push_str(&format!("Offline store: {}\n", mode(report.offline_degraded)));
    out.push_str(&format!(
        "Mutations: {} pending, {} in flight, {} failed\n",
        report.queue.pending, report.queue.in_flight, report.queue.failed
    ));
    out.push_str(&format!(
        "Last sync: {}\n",
        report
            .last_sync_completed_at
            .map(format_ms)
            .unwrap_or_else(|| "never".to_string())
    ));
    match (report.cache.saved_at, report.cache.bytes) {
        (Some(saved_at), Some(bytes)) => out.push_str(&format!(
            "Cache: {} ({}), saved {}\n",
            format_bytes(bytes),
            mode(report.cache.degraded),
            format_ms(saved_at)
        )),
        _ => out.push_str(&format!("Cache: none ({})\n", mode(report.cache.degraded))),
    }
    out
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
