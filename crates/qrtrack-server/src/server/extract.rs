//! Request extractors.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;

use super::AppState;
use super::error::ApiError;
use crate::geo::parse_client_ip;

pub const OWNER_HEADER: &str = "x-user-id";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Owner identity supplied by the upstream authentication layer.
#[derive(Debug, Clone)]
pub struct OwnerId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for OwnerId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        header(&parts.headers, OWNER_HEADER)
            .map(|id| Self(id.to_string()))
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Request metadata captured with a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanMeta {
    pub user_agent: String,
    pub referer: String,
    /// Canonical client address, if one could be determined.
    pub client_ip: Option<IpAddr>,
    /// Origin this request was addressed to, e.g. `http://host:8080`.
    pub origin: Option<String>,
}

impl FromRequestParts<AppState> for ScanMeta {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        // With a trusted proxy, the first X-Forwarded-For hop wins over the peer.
        let forwarded = state
            .config
            .server
            .trust_forwarded_for
            .then(|| header(headers, "x-forwarded-for"))
            .flatten()
            .and_then(|v| v.split(',').next())
            .and_then(parse_client_ip);
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_canonical());

        let origin = header(headers, "host").map(|host| {
            let scheme = header(headers, "x-forwarded-proto").unwrap_or("http");
            format!("{scheme}://{host}")
        });

        Ok(Self {
            user_agent: header(headers, "user-agent").unwrap_or_default().to_string(),
            referer: header(headers, "referer").unwrap_or_default().to_string(),
            client_ip: forwarded.or(peer),
            origin,
        })
    }
}
