// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batch handler: orchestrates one ingest request end to end.
//!
//! The request moves through method check → sampling resolution →
//! line-by-line processing → flush. A malformed line is counted and
//! skipped, never aborting the batch; only a wrong method or an invalid
//! sampling suffix rejects the request before any line is touched.

use std::sync::Arc;
use std::time::Instant;

use bytes::{BufMut, BytesMut};
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::{header, http, Method, Request, Response, StatusCode};
use tracing::{debug, error};

use crate::access_log::AccessLog;
use crate::config::Config;
use crate::device::DeviceClassifier;
use crate::errors::{decode_error_label, CollectorError};
use crate::event::RawEvent;
use crate::labels::{self, CacheOutcome, IpVersion};
use crate::metrics::{EventLabels, Metrics};
use crate::sampling;

pub type HttpResponse = Response<Full<Bytes>>;

pub struct Collector {
    config: Arc<Config>,
    metrics: Arc<Metrics>,
    access_log: AccessLog,
    classifier: Arc<dyn DeviceClassifier>,
}

impl Collector {
    pub fn new(
        config: Arc<Config>,
        metrics: Arc<Metrics>,
        access_log: AccessLog,
        classifier: Arc<dyn DeviceClassifier>,
    ) -> Self {
        Self {
            config,
            metrics,
            access_log,
            classifier,
        }
    }

    /// Routes one request across the exporter's HTTP surface: the scrape
    /// endpoint, the ingest endpoint (with its optional sampling suffix),
    /// and a 404 for everything else.
    pub async fn route<B>(&self, req: Request<B>) -> http::Result<HttpResponse>
    where
        B: Body + Unpin,
        B::Error: std::fmt::Display,
    {
        let path = req.uri().path().to_string();

        if path == self.config.metrics_path {
            return self.handle_scrape(req.method());
        }

        match sampling::resolve(&path, &self.config.collector_path) {
            Some(resolution) => {
                if req.method() != Method::POST {
                    let err = CollectorError::UnsupportedMethod(req.method().to_string());
                    return log_and_respond(&err.to_string(), StatusCode::METHOD_NOT_ALLOWED);
                }
                match resolution {
                    Ok(multiplier) => self.handle_ingest(req, multiplier).await,
                    Err(err) => log_and_respond(
                        &format!("rejecting batch: {err}"),
                        StatusCode::BAD_REQUEST,
                    ),
                }
            }
            None => Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Full::new(Bytes::new())),
        }
    }

    fn handle_scrape(&self, method: &Method) -> http::Result<HttpResponse> {
        if method != Method::GET {
            let err = CollectorError::UnsupportedMethod(method.to_string());
            return log_and_respond(&err.to_string(), StatusCode::METHOD_NOT_ALLOWED);
        }
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(Full::new(Bytes::from(self.metrics.render())))
    }

    /// Processes one accepted batch. The body is consumed frame by frame
    /// and complete lines handled as they arrive, so a connection closed
    /// mid-read stops after the current line with every prior update kept;
    /// there are no all-or-nothing batch semantics.
    async fn handle_ingest<B>(
        &self,
        req: Request<B>,
        multiplier: u64,
    ) -> http::Result<HttpResponse>
    where
        B: Body + Unpin,
        B::Error: std::fmt::Display,
    {
        let declared_size = req
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(0.0);
        self.metrics.record_post_size(declared_size);

        let began = Instant::now();
        let mut body = req.into_body();
        let mut buffered = BytesMut::new();

        loop {
            let frame = match body.frame().await {
                Some(Ok(frame)) => frame,
                Some(Err(e)) => {
                    debug!("stopping batch early, body read failed: {e}");
                    break;
                }
                None => break,
            };
            let Ok(data) = frame.into_data() else {
                continue;
            };
            buffered.put(data);

            while let Some(pos) = buffered.iter().position(|&b| b == b'\n') {
                let chunk = buffered.split_to(pos + 1);
                self.process_line(trim_line(&chunk[..pos]), multiplier);
            }
        }
        if !buffered.is_empty() {
            self.process_line(trim_line(&buffered), multiplier);
        }

        self.metrics.observe_batch_duration(began.elapsed().as_secs_f64());
        self.access_log.flush();

        Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::new()))
    }

    /// Normalize → derive labels → aggregate → access log, for one line.
    /// A decode failure is counted and the line skipped.
    fn process_line(&self, line: &[u8], multiplier: u64) {
        let event = match RawEvent::from_line(line) {
            Ok(event) => event,
            Err(e) => {
                let label = decode_error_label(&e);
                let err = CollectorError::MalformedRecord(e);
                debug!("skipping line: {err}");
                self.metrics.record_parse_error(label);
                return;
            }
        };

        let cache = CacheOutcome::from_code(event.performance.cache_status);
        let device = self
            .classifier
            .classify(&labels::percent_decode(&event.message.user_agent));
        let ip_version = IpVersion::from_addr(&event.message.client_ip);
        let start = labels::start_time(&event.start);

        self.access_log.write(&event, cache, start);
        self.metrics.record_event(
            &event,
            &EventLabels {
                cache,
                device,
                ip_version,
            },
            multiplier,
        );

        let age = Utc::now().signed_duration_since(start);
        self.metrics
            .observe_log_latency(age.num_milliseconds() as f64 / 1000.0);
    }
}

fn trim_line(line: &[u8]) -> &[u8] {
    match line {
        [rest @ .., b'\r'] => rest,
        _ => line,
    }
}

/// Logs the message and answers it back in a small JSON body; the same
/// shape for every non-success response.
fn log_and_respond(message: &str, status: StatusCode) -> http::Result<HttpResponse> {
    if status.is_success() {
        debug!("{message}");
    } else {
        error!("{message}");
    }
    let body = serde_json::json!({ "message": message }).to_string();
    Response::builder()
        .status(status)
        .body(Full::new(Bytes::from(body)))
}
