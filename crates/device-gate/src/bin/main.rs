//! Device Gate CLI
//!
//! # Usage
//!
//! ```bash
//! # Serve the gate in front of the device backend
//! device-gate serve --config device-gate.toml --upstream http://localhost:5000
//!
//! # Check one payload offline
//! device-gate check --rules example_validation_rules.json --request laptop.json
//!
//! # List a rule catalog
//! device-gate rules --rules example_validation_rules.json
//! ```
//!
//! # Exit Codes
//!
//! - 0: Success - served and shut down cleanly, or request would pass
//! - 1: Checked request would be rejected
//! - 3: Invalid input, arguments or configuration
//! - 4: File not found or inaccessible
//! - 5: Malformed rule catalog
//! - 10: Internal error

use clap::Parser;
use device_gate::{run_cli, GateCli};

#[tokio::main]
async fn main() {
    let cli = GateCli::parse();

    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}
