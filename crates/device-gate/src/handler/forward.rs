//! Upstream forwarding
//!
//! Requests the gate lets through are replayed against the CRUD backend
//! with the same method, path, query, headers and body bytes. Bodies are
//! streamed, never buffered here. The backend's response is relayed back
//! unchanged apart from hop-by-hop headers.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json, Router,
};
use reqwest::Url;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Headers that describe a single connection and are never relayed
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

/// Upstream forwarding errors
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Invalid upstream URL: {0}")]
    InvalidUpstream(String),

    #[error("Upstream did not respond within {0}ms")]
    Timeout(u64),

    #[error("Upstream unreachable: {0}")]
    Unreachable(String),

    #[error("Invalid upstream response: {0}")]
    Response(String),
}

impl ForwardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ForwardError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ForwardError::InvalidUpstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ForwardError::Unreachable(_) | ForwardError::Response(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ForwardError::InvalidUpstream(_) => "INVALID_UPSTREAM",
            ForwardError::Timeout(_) => "UPSTREAM_TIMEOUT",
            ForwardError::Unreachable(_) => "UPSTREAM_UNREACHABLE",
            ForwardError::Response(_) => "BAD_UPSTREAM_RESPONSE",
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// HTTP client bound to the upstream CRUD backend
#[derive(Debug, Clone)]
pub struct Upstream {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl Upstream {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ForwardError> {
        let base_url =
            Url::parse(base_url).map_err(|e| ForwardError::InvalidUpstream(e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ForwardError::InvalidUpstream(format!(
                "unsupported scheme '{}'",
                base_url.scheme()
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ForwardError::InvalidUpstream(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Target URL for an incoming path and query
    pub fn target(&self, path_and_query: &str) -> String {
        format!(
            "{}{}",
            self.base_url.as_str().trim_end_matches('/'),
            path_and_query
        )
    }

    /// Replay `request` against the upstream and relay its response
    pub async fn forward(&self, request: Request) -> Result<Response, ForwardError> {
        let (parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target = self.target(path_and_query);

        tracing::debug!(method = %parts.method, target = %target, "Forwarding request");

        let upstream_response = self
            .client
            .request(parts.method, &target)
            .headers(strip_hop_by_hop(&parts.headers))
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = upstream_response.status();
        let headers = strip_hop_by_hop(upstream_response.headers());
        let body = upstream_response
            .bytes()
            .await
            .map_err(|e| self.classify(e))?;

        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    fn classify(&self, error: reqwest::Error) -> ForwardError {
        if error.is_timeout() {
            ForwardError::Timeout(self.timeout.as_millis() as u64)
        } else if error.is_connect() {
            ForwardError::Unreachable(error.to_string())
        } else {
            ForwardError::Response(error.to_string())
        }
    }
}

fn strip_hop_by_hop(headers: &HeaderMap) -> HeaderMap {
    let mut relayed = headers.clone();
    for name in HOP_BY_HOP {
        relayed.remove(*name);
    }
    relayed
}

async fn forward_handler(State(upstream): State<Upstream>, request: Request) -> Response {
    match upstream.forward(request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(error = %e, upstream = %upstream.base_url(), "Forwarding failed");
            e.into_response()
        }
    }
}

/// Router that forwards every request it receives to `upstream`
pub fn forwarding_router(upstream: Upstream) -> Router {
    Router::new()
        .fallback(forward_handler)
        .with_state(upstream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_upstream_url_validation() {
        assert!(Upstream::new("http://localhost:5000", Duration::from_secs(1)).is_ok());
        assert!(matches!(
            Upstream::new("ftp://localhost", Duration::from_secs(1)),
            Err(ForwardError::InvalidUpstream(_))
        ));
        assert!(matches!(
            Upstream::new("not a url", Duration::from_secs(1)),
            Err(ForwardError::InvalidUpstream(_))
        ));
    }

    #[test]
    fn test_target_joins_path_and_query() {
        let upstream = Upstream::new("http://backend:5000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            upstream.target("/api/devices/7?force=true"),
            "http://backend:5000/api/devices/7?force=true"
        );
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("connection", HeaderValue::from_static("keep-alive"));
        headers.insert("content-length", HeaderValue::from_static("12"));
        headers.insert("host", HeaderValue::from_static("gate:8080"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("authorization", HeaderValue::from_static("Bearer abc"));

        let relayed = strip_hop_by_hop(&headers);
        assert_eq!(relayed.len(), 2);
        assert_eq!(relayed["content-type"], "application/json");
        assert_eq!(relayed["authorization"], "Bearer abc");
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ForwardError::Timeout(1000).status_code(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ForwardError::Unreachable("refused".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(ForwardError::Timeout(1000).error_code(), "UPSTREAM_TIMEOUT");
    }
}
