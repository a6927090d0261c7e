use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::params::{decode_json, parse_id};
use crate::error::ApiError;
use crate::rest::AppState;
use crate::scope;
use crate::store::KapacitorRecord;
use crate::API_PREFIX;

#[derive(Debug, Deserialize)]
pub struct CreateKapacitorRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateKapacitorRequest {
    pub name: Option<String>,
    pub url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct KapaLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    pub proxy: String,
    pub rules: String,
}

/// Outward representation of an instance. The password is never returned.
#[derive(Debug, Serialize)]
pub struct KapacitorResponse {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    pub active: bool,
    pub links: KapaLinks,
}

#[derive(Debug, Serialize)]
pub struct KapacitorsResponse {
    pub kapacitors: Vec<KapacitorResponse>,
}

impl From<KapacitorRecord> for KapacitorResponse {
    fn from(srv: KapacitorRecord) -> Self {
        let base = format!("{API_PREFIX}/sources/{}/kapacitors/{}", srv.src_id, srv.id);
        Self {
            id: srv.id.to_string(),
            name: srv.name,
            url: srv.url,
            username: srv.username,
            active: srv.active,
            links: KapaLinks {
                proxy: format!("{base}/proxy"),
                rules: format!("{base}/rules"),
                self_link: base,
            },
        }
    }
}

/// Requires an absolute URI with a scheme, e.g. `http://localhost:9092`.
fn validate_url(raw: &str) -> Result<(), ApiError> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| ApiError::InvalidInstance(format!("invalid source URI: {e}")))?;
    if parsed.scheme().is_empty() || parsed.cannot_be_a_base() {
        return Err(ApiError::InvalidInstance(
            "Invalid URL; no URL scheme defined".into(),
        ));
    }
    Ok(())
}

impl CreateKapacitorRequest {
    fn validate(&self) -> Result<(&str, &str), ApiError> {
        let (Some(name), Some(url)) = (self.name.as_deref(), self.url.as_deref()) else {
            return Err(ApiError::InvalidInstance("name and url required".into()));
        };
        if name.is_empty() || url.is_empty() {
            return Err(ApiError::InvalidInstance("name and url required".into()));
        }
        validate_url(url)?;
        Ok((name, url))
    }
}

impl UpdateKapacitorRequest {
    fn validate(&self) -> Result<(), ApiError> {
        match self.url.as_deref() {
            Some(url) => validate_url(url),
            None => Ok(()),
        }
    }

    /// Overwrites only the fields present in the request.
    fn apply(self, srv: &mut KapacitorRecord) {
        if let Some(name) = self.name {
            srv.name = name;
        }
        if let Some(url) = self.url {
            srv.url = url;
        }
        if let Some(username) = self.username {
            srv.username = username;
        }
        if let Some(password) = self.password {
            srv.password = password;
        }
        if let Some(active) = self.active {
            srv.active = active;
        }
    }
}

pub async fn create_kapacitor(
    State(state): State<AppState>,
    Path(src): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let src_id = parse_id(&src)?;
    if !state.sources.exists(src_id).await? {
        return Err(ApiError::SourceNotFound(src_id));
    }

    let req: CreateKapacitorRequest = decode_json(&body)?;
    let (name, url) = req.validate()?;
    let record = KapacitorRecord {
        id: 0,
        src_id,
        name: name.to_string(),
        url: url.to_string(),
        username: req.username.clone(),
        password: req.password.clone(),
        active: req.active,
    };

    let srv = state
        .kapacitors
        .add(record)
        .await
        .map_err(|e| ApiError::StoreFailure(format!("Error storing kapacitor: {e}")))?;
    info!(src_id, kapa_id = srv.id, url = %srv.url, "kapacitor registered");

    let res = KapacitorResponse::from(srv);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, res.links.self_link.clone())],
        Json(res),
    ))
}

pub async fn list_kapacitors(
    State(state): State<AppState>,
    Path(src): Path<String>,
) -> Result<Json<KapacitorsResponse>, ApiError> {
    let src_id = parse_id(&src)?;
    let all = state
        .kapacitors
        .all()
        .await
        .map_err(|_| ApiError::StoreFailure("Error loading kapacitors".into()))?;
    let kapacitors = all
        .into_iter()
        .filter(|srv| srv.src_id == src_id)
        .map(KapacitorResponse::from)
        .collect();
    Ok(Json(KapacitorsResponse { kapacitors }))
}

pub async fn get_kapacitor(
    State(state): State<AppState>,
    Path((src, kid)): Path<(String, String)>,
) -> Result<Json<KapacitorResponse>, ApiError> {
    let kapa_id = parse_id(&kid)?;
    let src_id = parse_id(&src)?;
    let srv = scope::resolve(state.kapacitors.as_ref(), src_id, kapa_id).await?;
    Ok(Json(srv.into()))
}

pub async fn update_kapacitor(
    State(state): State<AppState>,
    Path((src, kid)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<KapacitorResponse>, ApiError> {
    let kapa_id = parse_id(&kid)?;
    let src_id = parse_id(&src)?;
    let mut srv = scope::resolve(state.kapacitors.as_ref(), src_id, kapa_id).await?;

    let req: UpdateKapacitorRequest = decode_json(&body)?;
    req.validate()?;
    req.apply(&mut srv);

    let updated = state
        .kapacitors
        .update(&srv)
        .await
        .map_err(|_| ApiError::StoreFailure(format!("Error updating kapacitor ID {kapa_id}")))?;
    if !updated {
        return Err(ApiError::InstanceNotFound(kapa_id));
    }
    Ok(Json(srv.into()))
}

pub async fn delete_kapacitor(
    State(state): State<AppState>,
    Path((src, kid)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let kapa_id = parse_id(&kid)?;
    let src_id = parse_id(&src)?;
    let srv = scope::resolve(state.kapacitors.as_ref(), src_id, kapa_id).await?;

    if !state.kapacitors.delete(srv.id).await? {
        return Err(ApiError::InstanceNotFound(kapa_id));
    }
    info!(src_id, kapa_id, "kapacitor removed");
    Ok(StatusCode::NO_CONTENT)
}
