//! Prometheus metrics for the guildrag CLI.
//!
//! Exposes:
//! - `guildrag_command_duration_seconds` (histogram)
//! - `guildrag_command_total` (counter with status)
//! - `guildrag_command_inflight` (gauge)
//! - process metrics via `process` collector

use std::convert::Infallible;
use std::net::SocketAddr;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use once_cell::sync::Lazy;
use prometheus::process_collector::ProcessCollector;
use prometheus::{
    default_registry, register_histogram_vec, register_int_counter_vec, register_int_gauge_vec,
    Encoder, HistogramVec, IntCounterVec, IntGaugeVec, TextEncoder,
};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

static PROCESS_COLLECTOR: Lazy<()> = Lazy::new(|| {
    if let Err(err) = default_registry().register(Box::new(ProcessCollector::for_self())) {
        warn!("Failed to register process collector: {}", err);
    }
});

static COMMAND_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    // Exponential buckets from 50ms up to ~3 minutes.
    let buckets =
        prometheus::exponential_buckets(0.05, 2.0, 14).expect("failed to create histogram buckets");
    register_histogram_vec!(
        "guildrag_command_duration_seconds",
        "CLI command duration in seconds",
        &["command"],
        buckets
    )
    .expect("failed to register command duration histogram")
});

static COMMAND_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "guildrag_command_total",
        "Total command executions by status",
        &["command", "status"]
    )
    .expect("failed to register command counter")
});

static COMMAND_INFLIGHT: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "guildrag_command_inflight",
        "Number of in-flight commands",
        &["command"]
    )
    .expect("failed to register inflight gauge")
});

/// Ensure collectors are registered.
fn init_collectors() {
    Lazy::force(&PROCESS_COLLECTOR);
    Lazy::force(&COMMAND_DURATION);
    Lazy::force(&COMMAND_TOTAL);
    Lazy::force(&COMMAND_INFLIGHT);
}

/// Increment inflight gauge for a command.
pub fn record_command_start(command: &'static str) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).inc();
}

/// Record command completion with duration and status.
pub fn record_command_result(command: &'static str, elapsed: Duration, success: bool) {
    init_collectors();
    COMMAND_INFLIGHT.with_label_values(&[command]).dec();
    COMMAND_DURATION
        .with_label_values(&[command])
        .observe(elapsed.as_secs_f64());
    let status = if success { "ok" } else { "error" };
    COMMAND_TOTAL.with_label_values(&[command, status]).inc();
}

/// Spawn the /metrics endpoint on `addr`.
pub fn spawn_metrics_server(addr: SocketAddr) {
    init_collectors();
    tokio::spawn(async move {
        let listener = match TcpListener::bind(addr).await {
            Ok(listener) => listener,
            Err(err) => {
                error!("Failed to bind metrics listener on {}: {}", addr, err);
                return;
            }
        };
        info!("Metrics endpoint listening on http://{}/metrics", addr);

        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(err) => {
                    warn!("Metrics accept failed: {}", err);
                    continue;
                }
            };
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                if let Err(err) = http1::Builder::new()
                    .serve_connection(io, service_fn(serve_metrics))
                    .await
                {
                    warn!("Metrics connection error: {}", err);
                }
            });
        }
    });
}

async fn serve_metrics(
    req: Request<Incoming>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    if req.uri().path() != "/metrics" {
        let mut not_found = Response::new(Full::new(Bytes::from("not found")));
        *not_found.status_mut() = StatusCode::NOT_FOUND;
        return Ok(not_found);
    }

    let metric_families = default_registry().gather();
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        warn!("Failed to encode metrics: {}", err);
        let mut failed = Response::new(Full::new(Bytes::from("encode error")));
        *failed.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        return Ok(failed);
    }

    Ok(Response::new(Full::new(Bytes::from(buffer))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_lifecycle_does_not_panic() {
        record_command_start("test_cmd");
        record_command_result("test_cmd", Duration::from_millis(120), true);
        record_command_result("test_cmd", Duration::from_millis(80), false);
    }

    #[test]
    fn counters_accumulate_by_status() {
        init_collectors();
        let before = COMMAND_TOTAL.with_label_values(&["acc_cmd", "ok"]).get();
        record_command_start("acc_cmd");
        record_command_result("acc_cmd", Duration::from_millis(5), true);
        let after = COMMAND_TOTAL.with_label_values(&["acc_cmd", "ok"]).get();
        assert_eq!(after, before + 1);
    }
}
