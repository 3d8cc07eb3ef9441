//! Request gate middleware
//!
//! Device create/update requests are buffered, inspected and either passed
//! on untouched or refused with a plain-text 400. The body handed to the
//! next stage is the exact byte sequence the client sent.

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use device_rules::{
    FieldValidator, InvalidReason, PropertyBag, PropertyValue, RuleMatcher, Verdict,
};
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

use super::GateState;
use crate::telemetry::Outcome;

/// Why the gate refused a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateRejection {
    /// The body is not JSON
    #[error("Malformed JSON in request body.")]
    MalformedBody,

    /// Discriminator, precondition or property bag is absent
    #[error("Missing required fields in request body.")]
    MissingRequiredFields,

    /// Body length exceeds the configured limit. `size` is the declared
    /// length, when there is one.
    #[error("Request body too large.")]
    BodyTooLarge { size: Option<usize>, limit: usize },

    /// The body stream failed before it was fully buffered
    #[error("Request body could not be read.")]
    UnreadableBody,

    /// A field rule failed
    #[error("{}", field_message(.param_name, .reason))]
    FieldInvalid {
        param_name: String,
        reason: InvalidReason,
    },
}

fn field_message(param_name: &str, reason: &InvalidReason) -> String {
    reason.message_for(param_name)
}

impl GateRejection {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GateRejection::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Label used for logs and the rejection counter
    pub fn reason_label(&self) -> &'static str {
        match self {
            GateRejection::MalformedBody => "malformed_body",
            GateRejection::MissingRequiredFields => "missing_required_fields",
            GateRejection::BodyTooLarge { .. } => "body_too_large",
            GateRejection::UnreadableBody => "unreadable_body",
            GateRejection::FieldInvalid { reason, .. } => reason.as_str(),
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

/// A request the gate lets through after inspection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Passage {
    /// No rule set applies to this device type and precondition
    Unmatched { device_type: String },
    /// A rule set applied and every field rule passed
    Accepted {
        device_type: String,
        rule_type: String,
    },
}

impl Passage {
    pub fn outcome(&self) -> Outcome {
        match self {
            Passage::Unmatched { .. } => Outcome::Unmatched,
            Passage::Accepted { .. } => Outcome::Accepted,
        }
    }
}

impl GateState {
    /// Decide on a buffered request body.
    ///
    /// Structural problems are reported before any rule set is consulted.
    pub fn inspect(&self, body: &[u8]) -> Result<Passage, GateRejection> {
        let payload: Value =
            serde_json::from_slice(body).map_err(|_| GateRejection::MalformedBody)?;
        let root = payload
            .as_object()
            .ok_or(GateRejection::MissingRequiredFields)?;

        let config = self.config();
        let device_type = scalar_field(root, &config.discriminator_field);
        let precondition = scalar_field(root, &config.precondition_field);
        let properties = root
            .get(&config.properties_field)
            .and_then(PropertyBag::from_value);

        let (Some(device_type), Some(precondition), Some(properties)) =
            (device_type, precondition, properties)
        else {
            return Err(GateRejection::MissingRequiredFields);
        };

        let matcher = RuleMatcher::new(self.catalog(), &config.precondition_field);
        let Some(rule_set) = matcher.find(&device_type, &precondition) else {
            return Ok(Passage::Unmatched { device_type });
        };

        match FieldValidator::new().validate(rule_set, &properties) {
            Verdict::Valid => Ok(Passage::Accepted {
                device_type,
                rule_type: rule_set.rule_type.clone(),
            }),
            Verdict::Invalid { param_name, reason } => {
                Err(GateRejection::FieldInvalid { param_name, reason })
            }
        }
    }
}

/// Top-level scalar in canonical form; `null` counts as absent
fn scalar_field(root: &Map<String, Value>, name: &str) -> Option<String> {
    match root.get(name)? {
        Value::Null => None,
        value => Some(PropertyValue::new(value).canonical_string()),
    }
}

/// Gate middleware for device write requests.
///
/// Requests outside the protected write paths are passed through without
/// touching the body.
pub async fn gate_middleware(
    State(state): State<GateState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.is_protected(request.method(), request.uri().path()) {
        state.metrics().record_outcome(Outcome::Bypassed);
        return next.run(request).await;
    }

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::info!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        "Validating additional properties"
    );

    let (parts, body) = request.into_parts();
    let bytes = match buffer_body(&parts.headers, body, state.config().max_body_size).await {
        Ok(bytes) => bytes,
        Err(rejection) => return reject(&state, &request_id, rejection),
    };

    let start = Instant::now();
    let decision = state.inspect(&bytes);
    state
        .metrics()
        .observe_validation(start.elapsed().as_secs_f64());

    match decision {
        Ok(passage) => {
            match &passage {
                Passage::Unmatched { device_type } => tracing::debug!(
                    request_id = %request_id,
                    device_type = %device_type,
                    "No rule set applies; passing through"
                ),
                Passage::Accepted { rule_type, .. } => tracing::info!(
                    request_id = %request_id,
                    rule_type = %rule_type,
                    "Additional properties validation passed"
                ),
            }
            state.metrics().record_outcome(passage.outcome());
            next.run(Request::from_parts(parts, Body::from(bytes))).await
        }
        Err(rejection) => reject(&state, &request_id, rejection),
    }
}

async fn buffer_body(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Bytes, GateRejection> {
    if let Some(size) = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
    {
        if size > limit {
            return Err(GateRejection::BodyTooLarge {
                size: Some(size),
                limit,
            });
        }
    }

    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if e.into_inner().is::<LengthLimitError>() {
            GateRejection::BodyTooLarge { size: None, limit }
        } else {
            GateRejection::UnreadableBody
        }
    })
}

fn reject(state: &GateState, request_id: &str, rejection: GateRejection) -> Response {
    tracing::warn!(
        request_id = %request_id,
        reason = rejection.reason_label(),
        message = %rejection,
        "Request rejected by gate"
    );
    state.metrics().record_outcome(Outcome::Rejected);
    state.metrics().record_rejection(rejection.reason_label());
    rejection.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateConfig;
    use device_rules::{FieldRule, RuleCatalog, RuleSet};
    use std::sync::Arc;

    fn state() -> GateState {
        let catalog = RuleCatalog::new(vec![RuleSet::new(
            "Laptop",
            "isEnabled",
            "true",
            vec![
                FieldRule::pattern("serialNumber", r"^[A-Z]{2}\d{6}$").unwrap(),
                FieldRule::allowed("warrantyYears", ["1", "2", "3"]),
            ],
        )]);
        GateState::new(Arc::new(catalog), GateConfig::default()).unwrap()
    }

    #[test]
    fn test_inspect_accepts_valid_payload() {
        let body = br#"{"deviceTypeName":"Laptop","isEnabled":true,
            "additionalProperties":{"serialNumber":"AB123456","warrantyYears":"2"}}"#;
        assert_eq!(
            state().inspect(body),
            Ok(Passage::Accepted {
                device_type: "Laptop".to_string(),
                rule_type: "Laptop".to_string(),
            })
        );
    }

    #[test]
    fn test_inspect_unmatched() {
        let body = br#"{"deviceTypeName":"Phone","isEnabled":true,"additionalProperties":{}}"#;
        let passage = state().inspect(body).unwrap();
        assert_eq!(passage.outcome(), Outcome::Unmatched);
    }

    #[test]
    fn test_inspect_string_precondition() {
        let body = br#"{"deviceTypeName":"laptop","isEnabled":"TRUE",
            "additionalProperties":{"serialNumber":"AB123456"}}"#;
        assert_eq!(
            state().inspect(body).unwrap_err().to_string(),
            "Missing property: warrantyYears"
        );
    }

    #[test]
    fn test_inspect_structural_errors() {
        let state = state();
        assert_eq!(state.inspect(b"not json"), Err(GateRejection::MalformedBody));
        assert_eq!(state.inspect(b""), Err(GateRejection::MalformedBody));
        assert_eq!(
            state.inspect(b"[1, 2]"),
            Err(GateRejection::MissingRequiredFields)
        );
        assert_eq!(
            state.inspect(br#"{"deviceTypeName":"Laptop","isEnabled":true}"#),
            Err(GateRejection::MissingRequiredFields)
        );
        assert_eq!(
            state.inspect(
                br#"{"deviceTypeName":null,"isEnabled":true,"additionalProperties":{}}"#
            ),
            Err(GateRejection::MissingRequiredFields)
        );
        assert_eq!(
            state.inspect(
                br#"{"deviceTypeName":"Laptop","isEnabled":true,"additionalProperties":"x"}"#
            ),
            Err(GateRejection::MissingRequiredFields)
        );
    }

    #[tokio::test]
    async fn test_buffer_body_limits_streams_without_length() {
        let chunks: Vec<Result<&'static str, std::io::Error>> =
            vec![Ok("0123456789"), Ok("0123456789")];
        let body = Body::from_stream(futures::stream::iter(chunks));
        assert_eq!(
            buffer_body(&HeaderMap::new(), body, 16).await,
            Err(GateRejection::BodyTooLarge {
                size: None,
                limit: 16
            })
        );

        let failing: Vec<Result<&'static str, std::io::Error>> = vec![
            Ok("{"),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let body = Body::from_stream(futures::stream::iter(failing));
        assert_eq!(
            buffer_body(&HeaderMap::new(), body, 16).await,
            Err(GateRejection::UnreadableBody)
        );
    }

    #[test]
    fn test_rejection_messages_and_status() {
        let rejection = GateRejection::FieldInvalid {
            param_name: "serialNumber".to_string(),
            reason: InvalidReason::PatternMismatch,
        };
        assert_eq!(rejection.to_string(), "Invalid format for serialNumber");
        assert_eq!(rejection.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(rejection.reason_label(), "pattern_mismatch");

        assert_eq!(
            GateRejection::MissingRequiredFields.to_string(),
            "Missing required fields in request body."
        );
        let too_large = GateRejection::BodyTooLarge {
            size: Some(10),
            limit: 5,
        };
        assert_eq!(too_large.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.to_string(), "Request body too large.");
    }
}
