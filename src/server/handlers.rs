use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};

use super::{render_metrics, AppState};

/// `GET <telemetry-path>`: run one poll cycle and return the exposition text
pub async fn handle_metrics(State(state): State<AppState>) -> Response {
    let registry = state.registry.clone();

    match tokio::task::spawn_blocking(move || render_metrics(&registry)).await {
        Ok(Ok(body)) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Ok(Err(e)) => {
            log::error!("Failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
        Err(e) => {
            log::error!("Metrics collection task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "metrics collection failed".to_string(),
            )
                .into_response()
        }
    }
}

/// `GET /`
pub async fn handle_landing_page(State(state): State<AppState>) -> Html<String> {
    Html(state.landing_page.to_string())
}
