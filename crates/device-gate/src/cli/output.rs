//! Output formatting for the device gate CLI
//!
//! JSON for scripts, colored tables for people.

use axum::http::{Method, StatusCode};
use clap::ValueEnum;
use colored::Colorize;
use device_rules::{RuleCatalog, RuleSet};
use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{GateError, Result};
use crate::handler::{GateRejection, Passage};

/// Output format options for CLI results
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum OutputFormat {
    /// Human-readable table format with colors
    #[default]
    Table,
    /// JSON format for machine processing
    Json,
}

/// What the gate did with a checked request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Bypassed,
    Unmatched,
    Accepted,
    Rejected,
}

/// Result of `device-gate check`
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub method: String,
    pub path: String,
    pub decision: Decision,
    /// Whether the request would reach the backend
    pub forwarded: bool,
    /// Status the gate itself would answer with; absent when forwarded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Response body the client would see
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CheckReport {
    fn base(method: &Method, path: &str, decision: Decision) -> Self {
        Self {
            method: method.to_string(),
            path: path.to_string(),
            decision,
            forwarded: decision != Decision::Rejected,
            status: None,
            device_type: None,
            rule_type: None,
            reason: None,
            message: None,
        }
    }

    pub fn bypassed(method: &Method, path: &str) -> Self {
        Self::base(method, path, Decision::Bypassed)
    }

    pub fn passed(method: &Method, path: &str, passage: &Passage) -> Self {
        match passage {
            Passage::Unmatched { device_type } => Self {
                device_type: Some(device_type.clone()),
                ..Self::base(method, path, Decision::Unmatched)
            },
            Passage::Accepted {
                device_type,
                rule_type,
            } => Self {
                device_type: Some(device_type.clone()),
                rule_type: Some(rule_type.clone()),
                ..Self::base(method, path, Decision::Accepted)
            },
        }
    }

    pub fn rejected(method: &Method, path: &str, rejection: &GateRejection) -> Self {
        Self {
            status: Some(rejection.status_code().as_u16()),
            reason: Some(rejection.reason_label().to_string()),
            message: Some(rejection.to_string()),
            ..Self::base(method, path, Decision::Rejected)
        }
    }

    /// Render output in the specified format
    pub fn render(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => render_json(self),
            OutputFormat::Table => {
                self.render_table();
                Ok(())
            }
        }
    }

    fn render_table(&self) {
        let mut stdout = io::stdout();

        writeln!(stdout).ok();
        writeln!(
            stdout,
            "{} {} {}",
            "Gate Decision:".cyan().bold(),
            self.method,
            self.path
        )
        .ok();
        writeln!(stdout, "{}", "=".repeat(60)).ok();

        let summary = match self.decision {
            Decision::Bypassed => format!(
                "{} not a protected write; forwarded without inspection",
                "+".green()
            ),
            Decision::Unmatched => format!(
                "{} no rule set for '{}'; forwarded unchanged",
                "+".green(),
                self.device_type.as_deref().unwrap_or_default()
            ),
            Decision::Accepted => format!(
                "{} rule set '{}' satisfied; forwarded unchanged",
                "+".green(),
                self.rule_type.as_deref().unwrap_or_default()
            ),
            Decision::Rejected => format!(
                "{} {} {}",
                "x".red(),
                "REJECTED".red().bold(),
                self.message.as_deref().unwrap_or_default()
            ),
        };
        writeln!(stdout, "{}", summary).ok();

        if let (Some(status), Some(reason)) = (self.status, &self.reason) {
            let status_text = StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("");
            writeln!(
                stdout,
                "  {} {} {}",
                "Status:".dimmed(),
                status,
                status_text
            )
            .ok();
            writeln!(stdout, "  {} {}", "Reason:".dimmed(), reason.yellow()).ok();
        }

        stdout.flush().ok();
    }
}

/// Result of `device-gate rules`
#[derive(Debug, Serialize)]
pub struct RulesReport<'a> {
    pub source: String,
    pub digest: &'a str,
    pub rule_sets: &'a [RuleSet],
}

impl<'a> RulesReport<'a> {
    pub fn new(source: &Path, catalog: &'a RuleCatalog) -> Self {
        Self {
            source: source.display().to_string(),
            digest: catalog.digest(),
            rule_sets: catalog.rule_sets(),
        }
    }

    pub fn render(&self, format: OutputFormat) -> Result<()> {
        match format {
            OutputFormat::Json => render_json(self),
            OutputFormat::Table => {
                self.render_table();
                Ok(())
            }
        }
    }

    fn render_table(&self) {
        let mut stdout = io::stdout();

        writeln!(stdout).ok();
        writeln!(
            stdout,
            "{}",
            format!("Rule Catalog: {}", self.source).green().bold()
        )
        .ok();
        writeln!(stdout, "  {} {}", "Digest:".dimmed(), self.digest).ok();
        writeln!(stdout, "  {} {}", "Rule sets:".dimmed(), self.rule_sets.len()).ok();

        for (index, rule_set) in self.rule_sets.iter().enumerate() {
            writeln!(stdout).ok();
            writeln!(
                stdout,
                "{} {} {}",
                format!("[{}]", index).dimmed(),
                rule_set.rule_type.cyan().bold(),
                format!(
                    "when {} = {}",
                    rule_set.precondition_field, rule_set.precondition_value
                )
                .dimmed()
            )
            .ok();
            for rule in &rule_set.field_rules {
                writeln!(stdout, "  {} {}: {}", "-".blue(), rule.param_name, rule.matcher).ok();
            }
        }

        stdout.flush().ok();
    }
}

fn render_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| GateError::Serialization(e.to_string()))?;
    println!("{}", json);
    Ok(())
}
