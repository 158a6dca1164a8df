// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ingestion-and-aggregation pipeline for edge delivery-log event streams.
//!
//! The collector accepts batches of newline-delimited JSON delivery-log
//! records over HTTP, normalizes each record, derives bounded-cardinality
//! labels from its raw fields, and folds it into a shared set of Prometheus
//! counters and latency histograms. Successfully decoded records are also
//! rendered into an optional combined-format access log. The accumulated
//! aggregates are served to a pull-based scraper in the text exposition
//! format.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod access_log;
pub mod collector;
pub mod config;
pub mod device;
pub mod errors;
pub mod event;
pub mod labels;
pub mod metrics;
pub mod sampling;
pub mod server;
