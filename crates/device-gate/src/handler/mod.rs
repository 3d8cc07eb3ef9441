//! HTTP handling for the request gate
//!
//! - `gate`: the axum middleware that inspects device writes and the
//!   rejection type it produces
//! - `forward`: reverse-proxy handler that hands accepted requests to the
//!   upstream CRUD backend
//! - `routes`: router assembly plus the health and metrics endpoints
//!
//! The rule catalog is loaded before any of this is built and injected
//! through [`GateState`]; nothing here touches a data store.

pub mod forward;
pub mod gate;
pub mod routes;

pub use forward::{forwarding_router, ForwardError, Upstream};
pub use gate::{gate_middleware, GateRejection, Passage};
pub use routes::{create_router, health_check, metrics_endpoint, protect};

use axum::http::Method;
use device_rules::RuleCatalog;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::GateConfig;
use crate::error::Result;
use crate::telemetry::GateMetrics;

/// State shared by the gate middleware and the operational endpoints
#[derive(Clone)]
pub struct GateState {
    catalog: Arc<RuleCatalog>,
    config: Arc<GateConfig>,
    metrics: Arc<GateMetrics>,
    protected_prefix: Arc<str>,
}

impl GateState {
    /// Build gate state around an already loaded catalog
    pub fn new(catalog: Arc<RuleCatalog>, config: GateConfig) -> Result<Self> {
        config.validate()?;
        let metrics = GateMetrics::new()?;
        metrics.set_rule_sets(catalog.len());
        let protected_prefix: Arc<str> = Arc::from(config.protected_prefix.to_lowercase());

        Ok(Self {
            catalog,
            config: Arc::new(config),
            metrics: Arc::new(metrics),
            protected_prefix,
        })
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }

    /// Whether a request targets a protected write path
    pub fn is_protected(&self, method: &Method, path: &str) -> bool {
        (*method == Method::POST || *method == Method::PUT)
            && path.to_lowercase().starts_with(&*self.protected_prefix)
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    /// Number of rule sets in the loaded catalog
    pub rule_sets: usize,
    /// Content digest of the loaded catalog
    pub catalog_digest: String,
    pub version: String,
    /// ISO 8601 timestamp of the check
    pub timestamp: String,
}

/// Health status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> GateState {
        GateState::new(Arc::new(RuleCatalog::empty()), GateConfig::default()).unwrap()
    }

    #[test]
    fn test_protected_paths() {
        let state = state();
        assert!(state.is_protected(&Method::POST, "/api/devices"));
        assert!(state.is_protected(&Method::PUT, "/api/devices/42"));
        assert!(state.is_protected(&Method::POST, "/API/Devices"));
        assert!(!state.is_protected(&Method::GET, "/api/devices"));
        assert!(!state.is_protected(&Method::DELETE, "/api/devices/42"));
        assert!(!state.is_protected(&Method::PATCH, "/api/devices/42"));
        assert!(!state.is_protected(&Method::POST, "/api/employees"));
    }

    #[test]
    fn test_custom_prefix_is_case_insensitive() {
        let config = GateConfig {
            protected_prefix: "/API/Assets".to_string(),
            ..Default::default()
        };
        let state = GateState::new(Arc::new(RuleCatalog::empty()), config).unwrap();
        assert!(state.is_protected(&Method::POST, "/api/assets"));
        assert!(!state.is_protected(&Method::POST, "/api/devices"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GateConfig {
            max_body_size: 0,
            ..Default::default()
        };
        assert!(GateState::new(Arc::new(RuleCatalog::empty()), config).is_err());
    }

    #[test]
    fn test_health_status_serialization() {
        let json = serde_json::to_string(&HealthStatus::Healthy).unwrap();
        assert_eq!(json, "\"healthy\"");
    }
}
