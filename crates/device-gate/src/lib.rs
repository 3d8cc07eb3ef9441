//! Device Gate
//!
//! An HTTP request gate that sits in front of a device CRUD backend and
//! refuses create/update payloads whose additional properties break the
//! conditional field rules of a [`device_rules::RuleCatalog`].
//!
//! ## Architecture
//!
//! 1. **Rules** (`device-rules` crate): catalog loading, rule matching and
//!    field validation. Pure, synchronous, no I/O after load.
//!
//! 2. **Handler** (`handler/`): the axum gate middleware, the upstream
//!    forwarder and the `/health` and `/metrics` endpoints.
//!
//! 3. **Telemetry** (`telemetry/`): `tracing` subscriber setup and
//!    Prometheus metrics.
//!
//! 4. **CLI** (`cli/`): `serve`, `check` and `rules` commands.
//!
//! ## CLI Usage
//!
//! ```bash
//! # Serve the gate in front of the backend
//! device-gate serve --rules rules.json --upstream http://localhost:5000
//!
//! # Run one payload through the gate offline
//! device-gate check --rules rules.json --request laptop.json
//!
//! # List the loaded catalog
//! device-gate rules --rules rules.yaml --format json
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use axum::{routing::post, Router};
//! use device_gate::{create_router, GateConfig, GateState};
//! use device_rules::CatalogLoader;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let catalog = CatalogLoader::load("example_validation_rules.json")?;
//!     let state = GateState::new(Arc::new(catalog), GateConfig::default())?;
//!
//!     let devices = Router::new().route("/api/devices", post(|| async { "stored" }));
//!     let app = create_router(state, devices);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod handler;
pub mod telemetry;

pub use cli::{ExitCode, GateCli, GateCommands, OutputFormat};
pub use config::{GateConfig, LogFormat};
pub use error::{GateError, Result};
pub use handler::{
    create_router, forwarding_router, gate_middleware, protect, ForwardError, GateRejection,
    GateState, HealthResponse, HealthStatus, Passage, Upstream,
};
pub use telemetry::{init_tracing, GateMetrics, Outcome, TelemetryError};

/// Gate version (from Cargo.toml)
pub const GATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the CLI and map any failure to an exit code.
///
/// Failures are printed with their full source chain.
pub async fn run_cli(cli: GateCli) -> ExitCode {
    match cli::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            let code = ExitCode::from_error(&e);
            eprintln!("Error: {:#}", anyhow::Error::from(e));
            code
        }
    }
}
