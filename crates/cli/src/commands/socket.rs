// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use tether_sync::Paths;

use super::print_json;
use crate::cli::OutputFormat;
use crate::context::Context;
use crate::display::socket_line;
use crate::error::Result;

pub fn list(paths: &Paths, feature: &str, session: &str, output: OutputFormat) -> Result<()> {
    let ctx = Context::open(paths)?;
    let events = ctx.sockets().pending(feature, session);
    match output {
        OutputFormat::Json => print_json(&events),
        OutputFormat::Text => {
            if events.is_empty() {
                println!("No queued events for {feature}/{session}");
            }
            for ev in &events {
                println!("{}", socket_line(ev));
            }
            Ok(())
        }
    }
}
