//! CLI module for the device gate
//!
//! `serve` runs the gate in front of the backend; `check` and `rules` give
//! operators an offline view of what the gate would do.

pub mod commands;
pub mod output;

pub use commands::{GateCli, GateCommands};
pub use output::OutputFormat;

use device_rules::CatalogError;

use crate::error::GateError;

/// Exit codes for CLI operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command completed; a checked request would be let through
    Success = 0,
    /// A checked request would be rejected
    Rejected = 1,
    /// Invalid input or arguments
    InvalidInput = 3,
    /// File not found or inaccessible
    FileError = 4,
    /// Rule catalog is malformed
    RulesError = 5,
    /// Internal error
    InternalError = 10,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Exit code for a command that failed with `error`
    pub fn from_error(error: &GateError) -> Self {
        match error {
            GateError::Catalog(CatalogError::Io { .. }) | GateError::Io(_) => ExitCode::FileError,
            GateError::Catalog(_) => ExitCode::RulesError,
            GateError::InvalidInput(_) | GateError::Config(_) => ExitCode::InvalidInput,
            GateError::Telemetry(_) | GateError::Upstream(_) | GateError::Serialization(_) => {
                ExitCode::InternalError
            }
        }
    }
}

/// Run the CLI with the given arguments and return the exit code
pub async fn run(cli: GateCli) -> Result<ExitCode, GateError> {
    let (verbose, quiet) = (cli.verbose, cli.quiet);
    match cli.command {
        GateCommands::Serve(args) => commands::execute_serve(args, verbose, quiet).await,
        GateCommands::Check {
            rules,
            request,
            config,
            method,
            path,
            format,
        } => {
            commands::init_cli_tracing(verbose, quiet);
            commands::execute_check(rules, request, config, method, path, format)
        }
        GateCommands::Rules { rules, format } => {
            commands::init_cli_tracing(verbose, quiet);
            commands::execute_rules(rules, format)
        }
    }
}
