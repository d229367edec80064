//! Request metadata extraction.
//!
//! # Responsibilities
//! - Resolve the per-request trace ID (inbound header or UUID v4)
//! - Determine the client IP behind proxies
//! - Rebuild the logged path with its query string
//! - Decide which requests bypass capture entirely

use std::fmt;
use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, HeaderName, Request, Uri};
use uuid::Uuid;

use crate::config::CaptureConfig;

/// Correlation header read from requests and written to responses.
pub static X_TRACE_ID: HeaderName = HeaderName::from_static("x-trace-id");

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Per-request correlation identifier.
///
/// Inserted into request extensions so handlers can read it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraceId(String);

impl TraceId {
    /// Use the inbound `X-Trace-Id` if it is present and non-blank,
    /// otherwise generate a fresh UUID v4.
    pub fn resolve(headers: &HeaderMap) -> Self {
        headers
            .get(&X_TRACE_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.trim().is_empty())
            .map(|v| Self(v.to_string()))
            .unwrap_or_else(Self::generate)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity established by an authentication layer.
///
/// Anything that authenticates a caller inserts this into the request (or
/// response) extensions; the interceptor copies it into `user_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// Client IP: first `X-Forwarded-For` hop if present, else the peer address.
pub fn client_ip<B>(request: &Request<B>) -> String {
    let forwarded = request
        .headers()
        .get(X_FORWARDED_FOR)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string());

    if let Some(ip) = forwarded {
        return ip;
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Path with the raw query string appended when one was sent.
pub fn path_with_query(uri: &Uri) -> String {
    match uri.query() {
        Some(query) => format!("{}?{}", uri.path(), query),
        None => uri.path().to_string(),
    }
}

/// `User-Agent` header copied verbatim.
pub fn user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
}

/// Path rules that exclude requests from capture.
///
/// Plain prefix and exact-match checks; no pattern language.
#[derive(Debug, Clone, Default)]
pub struct BypassRules {
    prefixes: Vec<String>,
    exact: Vec<String>,
}

impl BypassRules {
    pub fn new(prefixes: Vec<String>, exact: Vec<String>) -> Self {
        Self { prefixes, exact }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(config.bypass_prefixes.clone(), config.bypass_paths.clone())
    }

    pub fn matches(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}
