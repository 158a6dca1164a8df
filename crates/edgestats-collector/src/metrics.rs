// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The aggregate store: every counter and latency distribution updated by
//! the ingestion pipeline, registered in one Prometheus registry.
//!
//! All updates are atomic per metric per label tuple, so concurrent batches
//! never lose increments and the scrape path can gather a consistent
//! snapshot without an outer lock. Counters are f64-valued because sampled
//! batches produce scaled (and historically fractional) increments;
//! distributions always receive raw, unscaled observations.

use std::time::Instant;

use prometheus::core::Collector;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, Opts, Registry,
    TextEncoder,
};

use crate::device::DeviceClass;
use crate::event::RawEvent;
use crate::labels::{CacheOutcome, IpVersion};

/// Upstream emits the literal field name when no content type was sent;
/// those placeholders must not become label values.
const CONTENT_TYPE_PLACEHOLDER: &str = "respCT";
const CONTENT_ENCODING_PLACEHOLDER: &str = "contEnc";

const LATENCY_MS_BUCKETS: &[f64] = &[
    1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];
const LOG_LATENCY_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0];
const PROCESSING_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0];

/// Labels derived from one event, computed once and shared by every
/// counter update for that event.
#[derive(Debug, Clone, Copy)]
pub struct EventLabels {
    pub cache: CacheOutcome,
    pub device: DeviceClass,
    pub ip_version: IpVersion,
}

pub struct Metrics {
    registry: Registry,
    pub requests_total: CounterVec,
    pub response_size_bytes: CounterVec,
    pub device_requests_total: CounterVec,
    pub content_types: CounterVec,
    pub content_encodings: CounterVec,
    pub geo_requests_total: CounterVec,
    pub origin_retries_total: CounterVec,
    pub parse_errors: CounterVec,
    pub response_latency: HistogramVec,
    pub origin_latency: HistogramVec,
    pub log_latency: Histogram,
    pub post_processing_time: Histogram,
    pub post_size_bytes: Counter,
}

impl Metrics {
    pub fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of processed log lines")
                .namespace(namespace),
            &[
                "host",
                "method",
                "status_code",
                "cache",
                "protocol",
                "protocol_version",
                "ip_version",
            ],
        )?;
        let response_size_bytes = CounterVec::new(
            Opts::new("http_response_size_bytes", "Total response size in bytes")
                .namespace(namespace),
            &["host", "method", "status_code", "cache", "protocol"],
        )?;
        let device_requests_total = CounterVec::new(
            Opts::new(
                "http_device_requests_total",
                "Total number of processed requests per device class",
            )
            .namespace(namespace),
            &["host", "device", "cache"],
        )?;
        let content_types = CounterVec::new(
            Opts::new("http_response_content_types", "Counter of response content types")
                .namespace(namespace),
            &["host", "cache", "content_type"],
        )?;
        let content_encodings = CounterVec::new(
            Opts::new(
                "http_response_content_encoding",
                "Counter of response content encodings",
            )
            .namespace(namespace),
            &["host", "cache", "content_encoding"],
        )?;
        let geo_requests_total = CounterVec::new(
            Opts::new("http_geo_requests_total", "Total responses by geo location")
                .namespace(namespace),
            &["host", "country"],
        )?;
        let origin_retries_total = CounterVec::new(
            Opts::new("origin_retries_total", "Number of origin retries").namespace(namespace),
            &["host", "status_code", "protocol"],
        )?;
        let parse_errors = CounterVec::new(
            Opts::new("parse_errors_count", "Number of detected parse errors")
                .namespace(namespace),
            &["error"],
        )?;
        let response_latency = HistogramVec::new(
            HistogramOpts::new(
                "http_response_latency_milliseconds",
                "Response latency in milliseconds",
            )
            .namespace(namespace)
            .buckets(LATENCY_MS_BUCKETS.to_vec()),
            &["host", "cache"],
        )?;
        let origin_latency = HistogramVec::new(
            HistogramOpts::new(
                "http_origin_latency_milliseconds",
                "Origin latency in milliseconds",
            )
            .namespace(namespace)
            .buckets(LATENCY_MS_BUCKETS.to_vec()),
            &["host", "cache"],
        )?;
        let log_latency = Histogram::with_opts(
            HistogramOpts::new("log_latency_seconds", "Latency of incoming log events")
                .namespace(namespace)
                .buckets(LOG_LATENCY_BUCKETS.to_vec()),
        )?;
        let post_processing_time = Histogram::with_opts(
            HistogramOpts::new("post_processing_time_seconds", "Seconds to process one batch")
                .namespace(namespace)
                .buckets(PROCESSING_BUCKETS.to_vec()),
        )?;
        let post_size_bytes = Counter::with_opts(
            Opts::new("post_size_bytes", "Size of incoming post data in bytes")
                .namespace(namespace),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(response_size_bytes.clone()))?;
        registry.register(Box::new(device_requests_total.clone()))?;
        registry.register(Box::new(content_types.clone()))?;
        registry.register(Box::new(content_encodings.clone()))?;
        registry.register(Box::new(geo_requests_total.clone()))?;
        registry.register(Box::new(origin_retries_total.clone()))?;
        registry.register(Box::new(parse_errors.clone()))?;
        registry.register(Box::new(response_latency.clone()))?;
        registry.register(Box::new(origin_latency.clone()))?;
        registry.register(Box::new(log_latency.clone()))?;
        registry.register(Box::new(post_processing_time.clone()))?;
        registry.register(Box::new(post_size_bytes.clone()))?;
        registry.register(Box::new(UptimeCollector::new(namespace)?))?;

        Ok(Self {
            registry,
            requests_total,
            response_size_bytes,
            device_requests_total,
            content_types,
            content_encodings,
            geo_requests_total,
            origin_retries_total,
            parse_errors,
            response_latency,
            origin_latency,
            log_latency,
            post_processing_time,
            post_size_bytes,
        })
    }

    /// Folds one successfully normalized event into the store. Counter
    /// increments scale by the batch multiplier; the latency observations
    /// stay raw.
    pub fn record_event(&self, event: &RawEvent, labels: &EventLabels, multiplier: u64) {
        let scale = multiplier as f64;
        let message = &event.message;
        let cache = labels.cache.as_str();

        self.requests_total
            .with_label_values(&[
                &message.host,
                &message.method,
                &message.status,
                cache,
                &message.protocol,
                &message.protocol_version,
                labels.ip_version.as_str(),
            ])
            .inc_by(scale);

        self.response_size_bytes
            .with_label_values(&[
                &message.host,
                &message.method,
                &message.status,
                cache,
                &message.protocol,
            ])
            .inc_by(event.response_size().max(0.0) * scale);

        self.device_requests_total
            .with_label_values(&[&message.host, labels.device.as_str(), cache])
            .inc_by(scale);

        if !message.content_type.is_empty() && message.content_type != CONTENT_TYPE_PLACEHOLDER {
            self.content_types
                .with_label_values(&[&message.host, cache, &message.content_type.to_lowercase()])
                .inc_by(scale);
        }

        let encoding = &event.response.content_encoding;
        if !encoding.is_empty() && encoding != CONTENT_ENCODING_PLACEHOLDER {
            self.content_encodings
                .with_label_values(&[&message.host, cache, &encoding.to_lowercase()])
                .inc_by(scale);
        }

        self.geo_requests_total
            .with_label_values(&[&message.host, &event.geo.country])
            .inc_by(scale);

        self.origin_retries_total
            .with_label_values(&[&message.host, &message.status, &message.protocol])
            .inc_by(f64::from(event.performance.origin_retries) * scale);

        self.response_latency
            .with_label_values(&[&message.host, cache])
            .observe(event.performance.download_time_ms);

        self.origin_latency
            .with_label_values(&[&message.host, cache])
            .observe(event.performance.origin_latency_ms);
    }

    /// One line failed to decode; count it under its error category.
    pub fn record_parse_error(&self, kind: &str) {
        self.parse_errors.with_label_values(&[kind]).inc();
    }

    /// Declared body size of an accepted ingest request.
    pub fn record_post_size(&self, bytes: f64) {
        self.post_size_bytes.inc_by(bytes.max(0.0));
    }

    /// Wall-clock age of one event, observed raw regardless of sampling.
    pub fn observe_log_latency(&self, seconds: f64) {
        self.log_latency.observe(seconds);
    }

    /// Wall-clock span of one batch's line-by-line processing.
    pub fn observe_batch_duration(&self, seconds: f64) {
        self.post_processing_time.observe(seconds);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Render the Prometheus text exposition format.
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap_or(());
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Refreshes the uptime gauge at scrape time, so the exposition always
/// carries the current value without a background ticker.
struct UptimeCollector {
    started: Instant,
    uptime: Gauge,
}

impl UptimeCollector {
    fn new(namespace: &str) -> Result<Self, prometheus::Error> {
        Ok(Self {
            started: Instant::now(),
            uptime: Gauge::with_opts(
                Opts::new("exporter_uptime_seconds", "Uptime of the exporter")
                    .namespace(namespace),
            )?,
        })
    }
}

impl Collector for UptimeCollector {
    fn desc(&self) -> Vec<&prometheus::core::Desc> {
        self.uptime.desc()
    }

    fn collect(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.uptime.set(self.started.elapsed().as_secs_f64());
        self.uptime.collect()
    }
}
