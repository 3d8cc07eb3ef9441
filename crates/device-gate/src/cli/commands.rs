//! CLI command definitions for the device gate
//!
//! Clap-based commands for serving the gate, checking a single payload
//! offline and listing a rule catalog.

use axum::http::Method;
use clap::{Args, Parser, Subcommand};
use device_rules::CatalogLoader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::output::{CheckReport, OutputFormat, RulesReport};
use super::ExitCode;
use crate::config::{GateConfig, LogFormat};
use crate::error::{GateError, Result};
use crate::handler::{create_router, forwarding_router, GateRejection, GateState, Upstream};
use crate::telemetry::{init_tracing, level_for};

/// Device Gate CLI
///
/// Validate device create/update payloads against conditional field rules
/// before they reach the CRUD backend.
#[derive(Parser, Debug)]
#[command(name = "device-gate")]
#[command(about = "Device Gate - conditional field validation for device writes", long_about = None)]
#[command(version)]
pub struct GateCli {
    /// Output verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: GateCommands,
}

/// Available gate commands
#[derive(Subcommand, Debug)]
pub enum GateCommands {
    /// Serve the gate in front of the upstream backend
    Serve(ServeArgs),

    /// Run one request body through the gate without serving
    ///
    /// Exits 0 when the request would be let through and 1 when it would be
    /// rejected.
    Check {
        /// Rule catalog file (JSON, YAML or TOML)
        #[arg(short, long)]
        rules: PathBuf,

        /// File holding the JSON request body
        #[arg(long)]
        request: PathBuf,

        /// Gate configuration file for field names and limits
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// HTTP method of the simulated request
        #[arg(short, long, default_value = "POST")]
        method: String,

        /// Path of the simulated request
        #[arg(short, long, default_value = "/api/devices")]
        path: String,

        /// Output format for the decision
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Load a rule catalog and list its rule sets
    Rules {
        /// Rule catalog file (JSON, YAML or TOML)
        #[arg(short, long)]
        rules: PathBuf,

        /// Output format for the listing
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

/// Arguments for `serve`; each overrides the configuration file
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Gate configuration file (JSON, YAML or TOML)
    #[arg(short, long, env = "DEVICE_GATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Socket address to listen on
    #[arg(short, long, env = "DEVICE_GATE_BIND")]
    pub bind: Option<String>,

    /// Rule catalog file
    #[arg(short, long, env = "DEVICE_GATE_RULES")]
    pub rules: Option<PathBuf>,

    /// Base URL of the CRUD backend
    #[arg(short, long, env = "DEVICE_GATE_UPSTREAM")]
    pub upstream: Option<String>,

    /// Log output format
    #[arg(long, value_enum, env = "DEVICE_GATE_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl ServeArgs {
    /// Resolve the effective configuration: file (or defaults), then flags
    pub fn resolve(self) -> Result<GateConfig> {
        let mut config = match &self.config {
            Some(path) => GateConfig::load(path)?,
            None => GateConfig::default(),
        };

        if let Some(bind) = self.bind {
            config.bind_addr = bind;
        }
        if let Some(rules) = self.rules {
            config.rules_path = rules;
        }
        if let Some(upstream) = self.upstream {
            config.upstream_url = Some(upstream);
        }
        if let Some(log_format) = self.log_format {
            config.log_format = log_format;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Tracing for the offline commands: warnings unless asked for more
pub fn init_cli_tracing(verbose: u8, quiet: bool) {
    init_tracing(
        LogFormat::Text,
        level_for(verbose, quiet, tracing::Level::WARN),
    );
}

/// Execute the serve command
pub async fn execute_serve(args: ServeArgs, verbose: u8, quiet: bool) -> Result<ExitCode> {
    let config = args.resolve()?;
    init_tracing(
        config.log_format,
        level_for(verbose, quiet, tracing::Level::INFO),
    );

    let catalog = CatalogLoader::load(&config.rules_path)?;
    if catalog.is_empty() {
        tracing::warn!(
            rules = %config.rules_path.display(),
            "Rule catalog is empty; every request passes through"
        );
    }

    let upstream_url = config.upstream_url.clone().ok_or_else(|| {
        GateError::config("upstream_url is required to serve (--upstream or DEVICE_GATE_UPSTREAM)")
    })?;
    let upstream = Upstream::new(
        &upstream_url,
        Duration::from_millis(config.upstream_timeout_ms),
    )?;

    let bind_addr = config.bind_addr.clone();
    let state = GateState::new(Arc::new(catalog), config)?;
    let app = create_router(state, forwarding_router(upstream));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, upstream = %upstream_url, "Device gate listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Device gate stopped");
    Ok(ExitCode::Success)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

/// Execute the check command
pub fn execute_check(
    rules: PathBuf,
    request: PathBuf,
    config: Option<PathBuf>,
    method: String,
    path: String,
    format: OutputFormat,
) -> Result<ExitCode> {
    let config = match &config {
        Some(config_path) => GateConfig::load(config_path)?,
        None => GateConfig::default(),
    };
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| GateError::invalid_input(format!("Invalid HTTP method: {}", method)))?;

    let catalog = CatalogLoader::load(&rules)?;
    let body = read_request(&request)?;
    let state = GateState::new(Arc::new(catalog), config)?;

    let report = if !state.is_protected(&method, &path) {
        CheckReport::bypassed(&method, &path)
    } else if body.len() > state.config().max_body_size {
        CheckReport::rejected(
            &method,
            &path,
            &GateRejection::BodyTooLarge {
                size: Some(body.len()),
                limit: state.config().max_body_size,
            },
        )
    } else {
        match state.inspect(&body) {
            Ok(passage) => CheckReport::passed(&method, &path, &passage),
            Err(rejection) => CheckReport::rejected(&method, &path, &rejection),
        }
    };

    report.render(format)?;

    Ok(if report.forwarded {
        ExitCode::Success
    } else {
        ExitCode::Rejected
    })
}

/// Execute the rules command
pub fn execute_rules(rules: PathBuf, format: OutputFormat) -> Result<ExitCode> {
    let catalog = CatalogLoader::load(&rules)?;
    RulesReport::new(&rules, &catalog).render(format)?;
    Ok(ExitCode::Success)
}

fn read_request(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        GateError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read request file '{}': {}", path.display(), e),
        ))
    })
}
