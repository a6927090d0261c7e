use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::rest::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// Ready once the instance registry answers.
pub async fn ready(State(state): State<AppState>) -> StatusCode {
    match state.kapacitors.all().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "instance store not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
