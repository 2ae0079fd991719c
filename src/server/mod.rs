//! HTTP surface: the text exposition endpoint and the landing page.

mod handlers;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, Registry, TextEncoder};

use crate::error::{ExporterError, Result};

pub use handlers::{handle_landing_page, handle_metrics};

/// Shared by every request handler
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub landing_page: Arc<str>,
}

impl AppState {
    pub fn new(registry: Registry, telemetry_path: &str) -> Self {
        Self {
            registry,
            landing_page: landing_page_html(telemetry_path).into(),
        }
    }
}

/// Build the router serving `telemetry_path` and `/`
pub fn router(registry: Registry, telemetry_path: &str) -> Router {
    Router::new()
        .route(telemetry_path, get(handle_metrics))
        .route("/", get(handle_landing_page))
        .with_state(AppState::new(registry, telemetry_path))
}

/// Gather every registered collector and encode the result as exposition text.
///
/// Gathering runs a full poll cycle and blocks on the hardware, so callers on
/// an async runtime should run this on a blocking thread.
pub fn render_metrics(registry: &Registry) -> Result<String> {
    let encoder = TextEncoder::new();
    let families = registry.gather();

    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;

    String::from_utf8(buffer)
        .map_err(|e| ExporterError::protocol(format!("exposition text is not UTF-8: {}", e)))
}

pub fn landing_page_html(telemetry_path: &str) -> String {
    format!(
        "<html>
<head><title>NVML Exporter</title></head>
<body>
<h1>NVML Exporter</h1>
<p><a href='{}'>Metrics</a></p>
</body>
</html>
",
        telemetry_path
    )
}
