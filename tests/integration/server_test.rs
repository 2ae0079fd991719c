use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use nvml_exporter::core::exporter::{FailurePolicy, Query};
use nvml_exporter::platform::gpu::MockDeviceSource;
use nvml_exporter::server::router;
use tower::ServiceExt;

use super::support::{fleet, registry_for, Scrape};

async fn get(app: Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = router(
        registry_for(MockDeviceSource::demo(), FailurePolicy::AbortCycle),
        "/metrics",
    );

    let (status, content_type, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(content_type.as_deref(), Some(prometheus::TEXT_FORMAT));
    assert!(body.contains("# HELP nvml_up Were the NVML queries successful?"));
    assert!(body.contains("# TYPE nvml_gpu_percent gauge"));

    let scrape = Scrape::parse(&body);
    assert_eq!(scrape.up(), 1.0);
    assert_eq!(scrape.value("nvml_temperature_fahrenheit", Some("0")), Some(158.0));
    assert_eq!(scrape.value("nvml_power_watts", Some("0")), Some(125.0));
}

#[tokio::test]
async fn test_degraded_scrape_still_succeeds() {
    let source = fleet(2);
    source.fail_on(0, Query::Utilization);
    let app = router(registry_for(source, FailurePolicy::AbortCycle), "/metrics");

    let (status, _, body) = get(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    let scrape = Scrape::parse(&body);
    assert_eq!(scrape.up(), 0.0);
    assert_eq!(scrape.samples.len(), 1);
}

#[tokio::test]
async fn test_landing_page() {
    let app = router(
        registry_for(MockDeviceSource::demo(), FailurePolicy::AbortCycle),
        "/gpu/metrics",
    );

    let (status, content_type, body) = get(app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(content_type.unwrap().starts_with("text/html"));
    assert!(body.contains("<a href='/gpu/metrics'>Metrics</a>"));
}

#[tokio::test]
async fn test_custom_telemetry_path() {
    let registry = registry_for(MockDeviceSource::demo(), FailurePolicy::AbortCycle);
    let app = router(registry, "/gpu/metrics");

    let (status, _, body) = get(app.clone(), "/gpu/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(Scrape::parse(&body).up(), 1.0);

    let (status, _, _) = get(app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_telemetry_path_is_literal() {
    let registry = registry_for(MockDeviceSource::demo(), FailurePolicy::AbortCycle);
    let app = router(registry, "/gpu:metrics");

    let (status, _, _) = get(app.clone(), "/gpu:metrics").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = get(app, "/favicon.ico").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
