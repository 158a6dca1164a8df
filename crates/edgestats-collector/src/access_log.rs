// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Access log sink: one combined-format line per successfully decoded
//! event, appended to a shared buffered file.
//!
//! Appends serialize on a single writer lock so concurrent batches never
//! interleave mid-line; the buffer is flushed once at the end of each batch
//! so lines are durable before the HTTP response completes.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::event::RawEvent;
use crate::labels::{percent_decode, CacheOutcome};

pub struct AccessLog {
    writer: Option<Mutex<BufWriter<File>>>,
    mirror_server_errors: bool,
}

impl AccessLog {
    /// Opens `path` in append mode when configured; `None` disables the
    /// sink entirely. An open failure is fatal to startup, there is no
    /// degraded mode once logging was explicitly requested.
    pub fn new(path: Option<&Path>, mirror_server_errors: bool) -> io::Result<Self> {
        let writer = match path {
            Some(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Mutex::new(BufWriter::new(file)))
            }
            None => None,
        };
        Ok(Self {
            writer,
            mirror_server_errors,
        })
    }

    pub fn disabled() -> Self {
        Self {
            writer: None,
            mirror_server_errors: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    /// Formats and appends one entry. Server-error lines are additionally
    /// mirrored to stderr when configured. Disabled sink: no I/O at all.
    pub fn write(&self, event: &RawEvent, cache: CacheOutcome, start: DateTime<Utc>) {
        let Some(writer) = &self.writer else {
            return;
        };

        let line = format_entry(event, cache, start);
        {
            let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = writer.write_all(line.as_bytes()) {
                warn!("failed to append access log line: {e}");
            }
        }

        if self.mirror_server_errors && is_server_error(&event.message.status) {
            let _ = io::stderr().write_all(line.as_bytes());
        }
    }

    /// Flush buffered lines; called once at the end of each batch.
    pub fn flush(&self) {
        let Some(writer) = &self.writer else {
            return;
        };
        let mut writer = writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.flush() {
            warn!("failed to flush access log: {e}");
        }
    }
}

/// One combined-log-format line, newline terminated. Path and query are
/// percent-decoded for rendering only.
pub fn format_entry(event: &RawEvent, cache: CacheOutcome, start: DateTime<Utc>) -> String {
    let message = &event.message;
    let query = if message.query.is_empty() {
        String::new()
    } else {
        percent_decode(&format!("?{}", message.query))
    };

    format!(
        "{} {} [{}] \"{} {}://{}{}{} HTTP/{}\" {} {} {} \"{}\"\n",
        message.client_ip,
        event.network.edge_ip,
        start.format("%d/%b/%Y:%H:%M:%S %z"),
        message.method,
        message.protocol,
        message.host,
        percent_decode(&message.path),
        query,
        message.protocol_version,
        message.status,
        format_size(event.response_size()),
        cache.as_str(),
        message.user_agent,
    )
}

fn is_server_error(status: &str) -> bool {
    status
        .parse::<u16>()
        .is_ok_and(|code| (500..=599).contains(&code))
}

// Whole byte counts render without a trailing ".0".
fn format_size(size: f64) -> String {
    if size.fract() == 0.0 {
        format!("{}", size as i64)
    } else {
        size.to_string()
    }
}
