// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use edgestats_collector::access_log::AccessLog;
use edgestats_collector::collector::Collector;
use edgestats_collector::config::Config;
use edgestats_collector::device::UaClassifier;
use edgestats_collector::metrics::Metrics;
use edgestats_collector::server;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid exporter configuration")?;

    let env_filter = format!("h2=off,hyper=off,{}", config.log_level);
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).context("could not parse configured log level")?,
        )
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;
    debug!("logging subsystem enabled");

    let metrics =
        Arc::new(Metrics::new(&config.namespace).context("failed to build metric registry")?);

    // An unusable access log is fatal: once logging was explicitly
    // requested there is no plausible degraded mode.
    let access_log = AccessLog::new(config.access_log_path.as_deref(), config.mirror_server_errors)
        .with_context(|| {
            format!("failed to open access log {:?}", config.access_log_path)
        })?;
    if let Some(path) = &config.access_log_path {
        info!("logging incoming events to {}", path.display());
    }

    let config = Arc::new(config);
    let collector = Arc::new(Collector::new(
        Arc::clone(&config),
        metrics,
        access_log,
        Arc::new(UaClassifier::new()),
    ));

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    info!("providing metrics at {}{}", config.listen_addr, config.metrics_path);
    info!("accepting delivery logs at {}{}", config.listen_addr, config.collector_path);

    server::serve(listener, collector).await
}
