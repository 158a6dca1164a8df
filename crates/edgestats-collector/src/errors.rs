// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde_json::error::Category;

/// Errors surfaced by the collector pipeline.
///
/// Only the request-level variants (`InvalidSamplingParameter`,
/// `UnsupportedMethod`) abort a batch; a `MalformedRecord` is counted and
/// the offending line skipped.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("malformed record: {0}")]
    MalformedRecord(#[from] serde_json::Error),

    #[error("invalid sampling parameter {0:?}")]
    InvalidSamplingParameter(String),

    #[error("unsupported method {0}")]
    UnsupportedMethod(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Label value for the parse-error counter.
///
/// A closed four-value vocabulary so decode failures can never explode
/// metric cardinality the way raw error strings would.
pub fn decode_error_label(err: &serde_json::Error) -> &'static str {
    match err.classify() {
        Category::Io => "io",
        Category::Syntax => "syntax",
        Category::Data => "data",
        Category::Eof => "eof",
    }
}
