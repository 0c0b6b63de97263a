// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, Utc};
use tether_core::{QueuedMutation, QueuedSocketEvent};

/// Maximum width of an inline error before it is cut.
const ERROR_WIDTH: usize = 60;

/// Formats epoch milliseconds as an RFC 3339 UTC timestamp.
pub fn format_ms(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| format!("{ms}ms"))
}

/// Formats the time between `then_ms` and `now_ms` as a short age like `3m`.
pub fn format_age(then_ms: u64, now_ms: u64) -> String {
    let secs = now_ms.saturating_sub(then_ms) / 1000;
    match secs {
        0..=59 => format!("{secs}s"),
        60..=3599 => format!("{}m", secs / 60),
        3600..=86_399 => format!("{}h", secs / 3600),
        _ => format!("{}d", secs / 86_400),
    }
}

/// Formats a byte count with a binary unit.
pub fn format_bytes(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// One-line summary used by `queue list`.
pub fn mutation_line(m: &QueuedMutation) -> String {
    let mut line = format!(
        "{}  {:<9}  {}  retries {}/{}",
        m.id,
        m.status.as_str(),
        m.operation_name,
        m.retry_count,
        m.max_retries
    );
    if let Some(err) = &m.last_error {
        line.push_str(&format!("  ({})", truncate(err, ERROR_WIDTH)));
    }
    line
}

/// Multi-line detail view used by `queue show`.
pub fn mutation_detail(m: &QueuedMutation) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}  {}\n", m.id, m.operation_name));
    out.push_str(&format!("  status:          {}\n", m.status));
    out.push_str(&format!("  retries:         {}/{}\n", m.retry_count, m.max_retries));
    out.push_str(&format!("  created:         {}\n", format_ms(m.created_at)));
    if let Some(claimed_at) = m.claimed_at {
        out.push_str(&format!("  claimed:         {}\n", format_ms(claimed_at)));
    }
    out.push_str(&format!("  idempotency key: {}\n", m.idempotency_key));
    if let Some(err) = &m.last_error {
        out.push_str(&format!("  last error:      {err}\n"));
    }
    out.push_str(&format!("  variables:       {}\n", m.variables));
    out.push_str("\n  Query:\n");
    for line in m.query.lines() {
        out.push_str(&format!("    {line}\n"));
    }
    out
}

/// One-line summary used by `socket list`.
pub fn socket_line(ev: &QueuedSocketEvent) -> String {
    let mut line = format!("{}  {}  {}", ev.id, format_ms(ev.created_at), ev.event);
    if let Some(optimistic_id) = &ev.optimistic_id {
        line.push_str(&format!("  -> {optimistic_id}"));
    }
    line
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
