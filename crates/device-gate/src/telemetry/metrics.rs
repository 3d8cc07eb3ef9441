//! Prometheus metrics for the request gate
//!
//! - `device_gate_requests_total` (counter) - requests by gate outcome
//! - `device_gate_rejections_total` (counter) - rejections by reason
//! - `device_gate_validation_duration_seconds` (histogram) - time spent
//!   matching and validating a buffered body
//! - `device_gate_rule_sets` (gauge) - size of the loaded catalog

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

use super::{Result, TelemetryError};

/// What the gate did with a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not a protected write; never inspected
    Bypassed,
    /// Inspected, no rule set applied
    Unmatched,
    /// Inspected and validated
    Accepted,
    /// Inspected and refused
    Rejected,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Bypassed => "bypassed",
            Outcome::Unmatched => "unmatched",
            Outcome::Accepted => "accepted",
            Outcome::Rejected => "rejected",
        }
    }
}

/// Gate metrics with their own registry
pub struct GateMetrics {
    registry: Registry,
    requests_total: IntCounterVec,
    rejections_total: IntCounterVec,
    validation_duration_seconds: Histogram,
    rule_sets: IntGauge,
}

impl GateMetrics {
    /// Create and register all gate metrics
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("requests_total", "Requests seen by the gate, by outcome")
                .namespace("device_gate"),
            &["outcome"],
        )?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Rejected requests, by reason").namespace("device_gate"),
            &["reason"],
        )?;

        let validation_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "validation_duration_seconds",
                "Time spent parsing, matching and validating a request body",
            )
            .namespace("device_gate")
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
        )?;

        let rule_sets = IntGauge::with_opts(
            Opts::new("rule_sets", "Rule sets in the loaded catalog").namespace("device_gate"),
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(rejections_total.clone()))?;
        registry.register(Box::new(validation_duration_seconds.clone()))?;
        registry.register(Box::new(rule_sets.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            rejections_total,
            validation_duration_seconds,
            rule_sets,
        })
    }

    pub fn record_outcome(&self, outcome: Outcome) {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    pub fn record_rejection(&self, reason: &str) {
        self.rejections_total.with_label_values(&[reason]).inc();
    }

    pub fn observe_validation(&self, duration_secs: f64) {
        self.validation_duration_seconds.observe(duration_secs);
    }

    pub fn set_rule_sets(&self, count: usize) {
        self.rule_sets.set(count as i64);
    }

    /// Current count for an outcome
    pub fn outcome_count(&self, outcome: Outcome) -> u64 {
        self.requests_total
            .with_label_values(&[outcome.as_str()])
            .get()
    }

    /// Current count for a rejection reason
    pub fn rejection_count(&self, reason: &str) -> u64 {
        self.rejections_total.with_label_values(&[reason]).get()
    }

    /// Render all metrics in the Prometheus text exposition format
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::EncodingFailed(e.to_string()))
    }

    pub fn content_type(&self) -> &'static str {
        prometheus::TEXT_FORMAT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_render() {
        let metrics = GateMetrics::new().unwrap();
        metrics.record_outcome(Outcome::Accepted);
        metrics.record_outcome(Outcome::Accepted);
        metrics.record_outcome(Outcome::Rejected);
        metrics.record_rejection("pattern_mismatch");
        metrics.observe_validation(0.0002);
        metrics.set_rule_sets(3);

        assert_eq!(metrics.outcome_count(Outcome::Accepted), 2);
        assert_eq!(metrics.outcome_count(Outcome::Bypassed), 0);
        assert_eq!(metrics.rejection_count("pattern_mismatch"), 1);

        let text = metrics.render().unwrap();
        assert!(text.contains("device_gate_requests_total{outcome=\"accepted\"} 2"));
        assert!(text.contains("device_gate_rejections_total{reason=\"pattern_mismatch\"} 1"));
        assert!(text.contains("device_gate_rule_sets 3"));
        assert!(text.contains("device_gate_validation_duration_seconds_count 1"));
    }

    #[test]
    fn test_independent_registries() {
        let a = GateMetrics::new().unwrap();
        let b = GateMetrics::new().unwrap();
        a.record_outcome(Outcome::Unmatched);
        assert_eq!(b.outcome_count(Outcome::Unmatched), 0);
    }

    #[test]
    fn test_content_type() {
        let metrics = GateMetrics::new().unwrap();
        assert!(metrics.content_type().starts_with("text/plain"));
    }
}
