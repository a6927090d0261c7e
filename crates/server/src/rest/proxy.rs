use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, warn};

use super::params::parse_id;
use super::rules::connect;
use crate::error::ApiError;
use crate::kapacitor::RemoteError;
use crate::rest::AppState;
use crate::scope;

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    pub path: Option<String>,
}

/// Forwards a raw request to the instance, passing its answer through.
pub async fn proxy(
    State(state): State<AppState>,
    Path((src, kid)): Path<(String, String)>,
    Query(query): Query<ProxyQuery>,
    method: Method,
    body: Bytes,
) -> Result<Response, ApiError> {
    let kapa_id = parse_id(&kid)?;
    let src_id = parse_id(&src)?;
    let path = match query.path {
        Some(path) if !path.is_empty() => path,
        _ => {
            return Err(ApiError::InvalidRequest(
                "path query parameter required".into(),
            ))
        }
    };
    // Only the path is caller-controlled; host and credentials belong to the instance.
    if !path.starts_with('/') {
        return Err(ApiError::InvalidRequest(format!(
            "path must start with '/': {path}"
        )));
    }

    let srv = scope::resolve(state.kapacitors.as_ref(), src_id, kapa_id).await?;
    let engine = connect(&state, &srv)?;
    debug!(src_id, kapa_id, %method, %path, "proxying to kapacitor");

    let res = engine
        .proxy(method, &path, body)
        .await
        .map_err(|err| {
            if err != RemoteError::NotFound {
                warn!(src_id, kapa_id, %path, error = %err, "kapacitor proxy failed");
            }
            ApiError::from_remote(err, kapa_id)
        })?;

    let status = StatusCode::from_u16(res.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut out = (status, Body::from(res.body)).into_response();
    if let Some(ct) = res.content_type.and_then(|ct| ct.parse().ok()) {
        out.headers_mut().insert(header::CONTENT_TYPE, ct);
    }
    Ok(out)
}
