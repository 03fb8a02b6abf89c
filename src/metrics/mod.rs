//! Prometheus metrics for the discovery health client
//!
//! Exposes metrics via HTTP endpoint for Prometheus scraping.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
};
use std::sync::OnceLock;

/// Content type of the Prometheus text exposition format
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Global metrics registry
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get the global metrics instance
pub fn metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Vigil metrics collection
pub struct Metrics {
    /// Registry for all metrics
    pub registry: Registry,

    // Heartbeat metrics
    /// TTL check updates attempted, by outcome, accepted or not
    pub heartbeat_reports_total: IntCounterVec,
    /// TTL check updates the registry did not accept
    pub heartbeat_report_failures_total: IntCounter,
    /// Services currently heartbeated
    pub heartbeat_services: IntGauge,

    // Filter metrics
    /// Filter runs by result
    pub filter_runs_total: IntCounterVec,
    /// Size of the candidate lists handed to the filter
    pub filter_candidates: Histogram,
}

impl Metrics {
    /// Create a new metrics collection
    pub fn new() -> Self {
        let registry = Registry::new();

        // Heartbeat metrics
        let heartbeat_reports_total = IntCounterVec::new(
            Opts::new(
                "vigil_heartbeat_reports_total",
                "Total number of TTL check updates attempted",
            ),
            &["outcome"], // pass, warn, fail
        )
        .unwrap();

        let heartbeat_report_failures_total = IntCounter::new(
            "vigil_heartbeat_report_failures_total",
            "Total number of TTL check updates that failed",
        )
        .unwrap();

        let heartbeat_services = IntGauge::new(
            "vigil_heartbeat_services",
            "Current number of services with a TTL heartbeat",
        )
        .unwrap();

        // Filter metrics
        let filter_runs_total = IntCounterVec::new(
            Opts::new("vigil_filter_runs_total", "Total number of server list filter runs"),
            &["result"], // selected, empty, error, skipped
        )
        .unwrap();

        let filter_candidates = Histogram::with_opts(
            HistogramOpts::new(
                "vigil_filter_candidates",
                "Number of candidate servers per filter run",
            )
            .buckets(vec![1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0, 128.0]),
        )
        .unwrap();

        // Register all metrics
        registry
            .register(Box::new(heartbeat_reports_total.clone()))
            .unwrap();
        registry
            .register(Box::new(heartbeat_report_failures_total.clone()))
            .unwrap();
        registry
            .register(Box::new(heartbeat_services.clone()))
            .unwrap();
        registry
            .register(Box::new(filter_runs_total.clone()))
            .unwrap();
        registry
            .register(Box::new(filter_candidates.clone()))
            .unwrap();

        Self {
            registry,
            heartbeat_reports_total,
            heartbeat_report_failures_total,
            heartbeat_services,
            filter_runs_total,
            filter_candidates,
        }
    }

    /// Record a TTL check update attempt and whether it was accepted
    pub fn record_heartbeat(&self, outcome: &str, accepted: bool) {
        self.heartbeat_reports_total
            .with_label_values(&[outcome])
            .inc();
        if !accepted {
            self.heartbeat_report_failures_total.inc();
        }
    }

    /// Update the number of heartbeated services
    pub fn set_heartbeat_services(&self, count: usize) {
        self.heartbeat_services.set(count as i64);
    }

    /// Record a filter run
    pub fn record_filter_run(&self, result: &str) {
        self.filter_runs_total.with_label_values(&[result]).inc();
    }

    /// Record the size of a candidate list
    pub fn observe_filter_candidates(&self, count: usize) {
        self.filter_candidates.observe(count as f64);
    }

    /// Get metrics as Prometheus text format
    pub fn gather(&self) -> String {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Response of the metrics server for `path`
fn route(path: &str) -> Response<Full<Bytes>> {
    match path {
        "/metrics" => {
            let body = metrics().gather();
            Response::builder()
                .status(StatusCode::OK)
                .header("Content-Type", PROMETHEUS_CONTENT_TYPE)
                .body(Full::new(Bytes::from(body)))
                .unwrap()
        }
        "/health" => Response::builder()
            .status(StatusCode::OK)
            .body(Full::new(Bytes::from("OK")))
            .unwrap(),
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("Not Found")))
            .unwrap(),
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(addr: &str) -> anyhow::Result<()> {
    use hyper::server::conn::http1;
    use hyper::service::service_fn;
    use hyper::Request;
    use hyper_util::rt::TokioIo;
    use std::convert::Infallible;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tracing::{error, info};

    async fn handle_request(
        req: Request<hyper::body::Incoming>,
    ) -> Result<Response<Full<Bytes>>, Infallible> {
        Ok(route(req.uri().path()))
    }

    let addr: SocketAddr = addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Metrics server listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handle_request))
                .await
            {
                error!(error = %e, "Metrics server connection error");
            }
        });
    }
}
