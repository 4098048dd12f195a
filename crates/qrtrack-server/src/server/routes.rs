use axum::Json;
use axum::extract::{Path, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use qrtrack_core::db::unix_timestamp;

use super::AppState;
use super::error::ApiError;
use super::extract::{OwnerId, ScanMeta};
use crate::analytics::{self, CodeAnalytics, Summary};
use crate::scan::recorder::UNKNOWN_LOCATION;
use crate::scan::ScanInput;
use crate::security::{SecurityRequest, password, validate_destination};
use crate::storage::{NewCode, QrCode, QrType};
use crate::tracking;

/// Token recorded for scans that arrive without one.
pub const DIRECT_TOKEN: &str = "direct";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCodeRequest {
    pub text: String,
    #[serde(default, alias = "qr_type")]
    pub qr_type: Option<String>,
    #[serde(default)]
    pub security: SecurityRequest,
    #[serde(default, alias = "enable_tracking")]
    pub enable_tracking: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VerifyPasswordRequest {
    pub password: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyPasswordResponse {
    pub success: bool,
    pub redirect_url: String,
    pub analytics: ScanCounters,
}

#[derive(Debug, Serialize)]
pub struct ScanCounters {
    pub scan_count: i64,
    pub max_scans: i64,
    pub remaining_scans: Option<i64>,
}

impl From<&QrCode> for ScanCounters {
    fn from(code: &QrCode) -> Self {
        Self {
            scan_count: code.scan_count,
            max_scans: code.max_scans,
            remaining_scans: code.remaining_scans(),
        }
    }
}

/// Body for a recorded scan of a code whose payload is not a link.
#[derive(Debug, Serialize)]
pub struct ScanContent {
    pub success: bool,
    pub text: String,
    pub qr_type: String,
    #[serde(flatten)]
    pub analytics: ScanCounters,
}

/// `Location` value for codes that redirect, `None` for payloads that are
/// served as content.
fn redirect_target(code: &QrCode) -> Option<HeaderValue> {
    if code.qr_type != QrType::Url.as_str() {
        return None;
    }
    HeaderValue::from_str(&code.destination).ok()
}

fn redirect(location: HeaderValue) -> Response {
    (StatusCode::TEMPORARY_REDIRECT, [(LOCATION, location)]).into_response()
}

fn scan_input(state: &AppState, meta: &ScanMeta, token: String) -> ScanInput {
    let location = meta.client_ip.and_then(|ip| state.geo.lookup(ip));
    let (country, city) = location.map_or_else(
        || (UNKNOWN_LOCATION.to_string(), UNKNOWN_LOCATION.to_string()),
        |loc| (loc.country, loc.city),
    );
    ScanInput {
        user_agent: meta.user_agent.clone(),
        source_ip: meta.client_ip.map(|ip| ip.to_string()).unwrap_or_default(),
        referer: meta.referer.clone(),
        country,
        city,
        tracking_token: token,
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

/// `POST /codes`
pub async fn create_code(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    meta: ScanMeta,
    Json(body): Json<CreateCodeRequest>,
) -> Result<(StatusCode, Json<QrCode>), ApiError> {
    let destination = validate_destination(&body.text)?;
    let qr_type = match body.qr_type.as_deref() {
        None => QrType::default(),
        Some(raw) => raw.parse::<QrType>().map_err(ApiError::BadRequest)?,
    };
    let settings = body.security.normalize(unix_timestamp())?;

    let id = uuid::Uuid::new_v4().simple().to_string();
    let tracking_enabled = body
        .enable_tracking
        .unwrap_or(state.config.tracking.enabled_by_default);
    let tracking_url = if tracking_enabled {
        let base = state.public_base_url(&meta).ok_or_else(|| {
            ApiError::BadRequest("Cannot determine public base URL for tracking".into())
        })?;
        Some(tracking::issue_with_length(
            &base,
            &id,
            state.config.tracking.token_length,
        ))
    } else {
        None
    };

    let code = state
        .db
        .create_code(&NewCode {
            id: &id,
            owner_id: &owner,
            destination,
            qr_type,
            tracking_url: tracking_url.as_deref(),
            is_password_protected: settings.is_password_protected,
            password_hash: &settings.password_hash,
            expires_at: settings.expires_at,
            max_scans: settings.max_scans,
        })
        .await?;

    info!(
        code_id = %code.id,
        owner_id = %owner,
        max_scans = code.max_scans,
        expires_at = ?code.expires_at,
        protected = code.is_password_protected,
        "QR code created"
    );
    Ok((StatusCode::CREATED, Json(code)))
}

/// `GET /track/{id}`
pub async fn track_direct(Path(id): Path<String>) -> Result<Response, ApiError> {
    let location = HeaderValue::from_str(&format!("/track/{id}/{DIRECT_TOKEN}"))
        .map_err(|_| ApiError::BadRequest("Invalid QR code id".into()))?;
    Ok(redirect(location))
}

/// `GET /track/{id}/{token}`
pub async fn track(
    State(state): State<AppState>,
    Path((id, token)): Path<(String, String)>,
    meta: ScanMeta,
) -> Result<Response, ApiError> {
    let code = state.db.get_code(&id).await?;
    state.recorder.ensure_valid(&code).await?;

    if code.is_password_protected {
        return Ok((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "requires_password": true, "id": code.id })),
        )
            .into_response());
    }

    let target = redirect_target(&code);
    let scan = scan_input(&state, &meta, token);
    let updated = state.recorder.record_scan(&code.id, &scan).await?;

    Ok(match target {
        Some(location) => redirect(location),
        None => Json(ScanContent {
            success: true,
            analytics: ScanCounters::from(&updated),
            text: updated.destination,
            qr_type: updated.qr_type,
        })
        .into_response(),
    })
}

/// `POST /verify-password/{id}`
pub async fn verify_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    meta: ScanMeta,
    Json(body): Json<VerifyPasswordRequest>,
) -> Result<Json<VerifyPasswordResponse>, ApiError> {
    let code = state.db.get_code(&id).await?;
    if !code.is_password_protected {
        return Err(ApiError::BadRequest(
            "QR code is not password protected".into(),
        ));
    }
    state.recorder.ensure_valid(&code).await?;

    let candidate = body.password.unwrap_or_default();
    if candidate.trim().is_empty() {
        return Err(ApiError::PasswordMissing);
    }
    let hash = code.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || password::verify_password(&candidate, &hash))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !verified {
        warn!(code_id = %code.id, "Password verification failed");
        return Err(ApiError::WrongPassword);
    }

    let token = body.token.unwrap_or_else(|| DIRECT_TOKEN.to_string());
    let scan = scan_input(&state, &meta, token);
    let updated = state.recorder.record_scan(&code.id, &scan).await?;

    Ok(Json(VerifyPasswordResponse {
        success: true,
        analytics: ScanCounters::from(&updated),
        redirect_url: updated.destination,
    }))
}

/// `GET /analytics`
pub async fn owner_analytics(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
) -> Result<Json<Summary>, ApiError> {
    Ok(Json(analytics::aggregate(&state.db, &owner).await?))
}

/// `GET /analytics/{id}`
pub async fn code_analytics(
    State(state): State<AppState>,
    OwnerId(owner): OwnerId,
    Path(id): Path<String>,
) -> Result<Json<CodeAnalytics>, ApiError> {
    let code = state.db.get_owned_code(&id, &owner).await?;
    Ok(Json(analytics::code_analytics(&state.db, &code).await?))
}
