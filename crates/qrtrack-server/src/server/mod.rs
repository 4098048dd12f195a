//! HTTP surface.

pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, Method};
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use qrtrack_core::Config;

use crate::geo::{GeoLocator, UnknownLocator};
use crate::scan::ScanRecorder;
use crate::storage::QrDatabase;
use extract::{OWNER_HEADER, ScanMeta};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: QrDatabase,
    pub recorder: ScanRecorder,
    pub geo: Arc<dyn GeoLocator>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: QrDatabase, config: Config) -> Self {
        Self {
            recorder: ScanRecorder::new(db.clone()),
            db,
            geo: Arc::new(UnknownLocator),
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn with_geo(mut self, geo: Arc<dyn GeoLocator>) -> Self {
        self.geo = geo;
        self
    }

    /// Configured public origin, else the origin the request came in on.
    pub fn public_base_url(&self, meta: &ScanMeta) -> Option<String> {
        self.config
            .server
            .public_base_url
            .clone()
            .or_else(|| meta.origin.clone())
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(OWNER_HEADER)])
        .max_age(Duration::from_secs(state.config.server.cors_max_age_secs));

    Router::new()
        .route("/health", get(routes::health))
        .route("/codes", post(routes::create_code))
        .route("/track/{id}", get(routes::track_direct))
        .route("/track/{id}/{token}", get(routes::track))
        .route("/verify-password/{id}", post(routes::verify_password))
        .route("/analytics", get(routes::owner_analytics))
        .route("/analytics/{id}", get(routes::code_analytics))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
