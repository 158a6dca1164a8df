// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::sync::Arc;

use hyper::service::service_fn;
use tokio::net::TcpListener;
use tracing::{debug, error};

use crate::collector::Collector;

/// Accept loop for the exporter's HTTP surface: one task per connection,
/// transient accept errors skipped, a panicking handler never takes the
/// server down with it.
pub async fn serve(listener: TcpListener, collector: Arc<Collector>) -> anyhow::Result<()> {
    let server = hyper::server::conn::http1::Builder::new();
    let mut joinset = tokio::task::JoinSet::new();

    loop {
        let conn = tokio::select! {
            conn_res = listener.accept() => match conn_res {
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::ConnectionAborted
                            | io::ErrorKind::ConnectionReset
                            | io::ErrorKind::ConnectionRefused
                    ) =>
                {
                    continue;
                }
                Err(e) => {
                    error!("server error: {e}");
                    return Err(e.into());
                }
                Ok((conn, _)) => conn,
            },
            finished = async {
                match joinset.join_next().await {
                    Some(finished) => finished,
                    None => std::future::pending().await,
                }
            } => match finished {
                Err(e) if e.is_panic() => {
                    error!("connection handler panicked: {e:?}");
                    continue;
                }
                Ok(()) | Err(_) => continue,
            },
        };

        let io = hyper_util::rt::TokioIo::new(conn);
        let server = server.clone();
        let collector = Arc::clone(&collector);
        joinset.spawn(async move {
            let service = service_fn(move |req| {
                let collector = Arc::clone(&collector);
                async move { collector.route(req).await }
            });
            if let Err(e) = server.serve_connection(io, service).await {
                debug!("connection error: {e}");
            }
        });
    }
}
