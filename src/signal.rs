// signal.rs - Defense Signal Classification
// Purpose: Turn one raw login response into exactly one typed defense signal,
//          surfacing wire-contract violations instead of guessing

use std::time::Duration;

use serde_json::Value;

use crate::client::{RawResponse, TransportFailure};
use crate::errors::AttackError;

/// Exactly one signal is derived per attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefenseSignal {
    Success,
    Failure,
    RateLimited { retry_after: Duration },
    Locked,
    CaptchaRequired,
    CaptchaInvalid,
    SecondFactorRequired,
    TransportError { cause: String },
}

/// Classifies one attempt outcome. Transport failures become a signal (they
/// are recoverable noise); a 200 without a boolean `success` field or a 429
/// without a usable Retry-After are protocol violations and abort the run.
/// Any unrecognized status is a conservative Failure so it never blocks
/// further attempts.
pub fn classify(result: Result<RawResponse, TransportFailure>) -> Result<DefenseSignal, AttackError> {
    let raw = match result {
        Ok(raw) => raw,
        Err(failure) => return Ok(DefenseSignal::TransportError { cause: failure.cause }),
    };

    match raw.status {
        200 => {
            let body: Value = serde_json::from_str(&raw.body)
                .map_err(|e| AttackError::Protocol(format!("invalid JSON in 200 response: {e}")))?;
            match body.get("success").and_then(Value::as_bool) {
                Some(true) => Ok(DefenseSignal::Success),
                Some(false) => Ok(DefenseSignal::Failure),
                None => Err(AttackError::Protocol(
                    "200 response without a boolean 'success' field".to_string(),
                )),
            }
        }
        429 => {
            let seconds = raw
                .retry_after
                .as_deref()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .ok_or(AttackError::MissingRetryAfter)?;
            Ok(DefenseSignal::RateLimited { retry_after: Duration::from_secs(seconds) })
        }
        403 => {
            // 403 bodies are best-effort: an unreadable body is just a Failure.
            let body: Value = serde_json::from_str(&raw.body).unwrap_or(Value::Null);
            let error = body.get("error").and_then(Value::as_str).unwrap_or("");
            if error.contains("locked") {
                Ok(DefenseSignal::Locked)
            } else if body.get("captcha_required").and_then(Value::as_bool) == Some(true) {
                Ok(DefenseSignal::CaptchaRequired)
            } else if error.contains("invalid_captcha") {
                Ok(DefenseSignal::CaptchaInvalid)
            } else {
                Ok(DefenseSignal::Failure)
            }
        }
        401 => Ok(DefenseSignal::SecondFactorRequired),
        _ => Ok(DefenseSignal::Failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> Result<RawResponse, TransportFailure> {
        Ok(RawResponse { status, body: body.to_string(), retry_after: None })
    }

    #[test]
    fn test_success_and_failure() {
        assert_eq!(classify(raw(200, r#"{"success": true}"#)).unwrap(), DefenseSignal::Success);
        assert_eq!(classify(raw(200, r#"{"success": false}"#)).unwrap(), DefenseSignal::Failure);
    }

    #[test]
    fn test_missing_success_field_is_protocol_violation() {
        assert!(matches!(classify(raw(200, r#"{"ok": 1}"#)), Err(AttackError::Protocol(_))));
        assert!(matches!(classify(raw(200, "not json")), Err(AttackError::Protocol(_))));
    }

    #[test]
    fn test_rate_limited_parses_retry_after() {
        let result = classify(Ok(RawResponse {
            status: 429,
            body: String::new(),
            retry_after: Some("2".to_string()),
        }));
        assert_eq!(
            result.unwrap(),
            DefenseSignal::RateLimited { retry_after: Duration::from_secs(2) }
        );
    }

    #[test]
    fn test_rate_limited_without_header_is_an_error() {
        assert!(matches!(classify(raw(429, "")), Err(AttackError::MissingRetryAfter)));

        let garbled = classify(Ok(RawResponse {
            status: 429,
            body: String::new(),
            retry_after: Some("soon".to_string()),
        }));
        assert!(matches!(garbled, Err(AttackError::MissingRetryAfter)));
    }

    #[test]
    fn test_lockout_and_captcha_variants() {
        assert_eq!(classify(raw(403, r#"{"error": "locked"}"#)).unwrap(), DefenseSignal::Locked);
        assert_eq!(
            classify(raw(403, r#"{"captcha_required": true}"#)).unwrap(),
            DefenseSignal::CaptchaRequired
        );
        assert_eq!(
            classify(raw(403, r#"{"error": "invalid_captcha"}"#)).unwrap(),
            DefenseSignal::CaptchaInvalid
        );
        // Unrecognized 403 body falls back to Failure.
        assert_eq!(classify(raw(403, r#"{"error": "nope"}"#)).unwrap(), DefenseSignal::Failure);
    }

    #[test]
    fn test_second_factor_gate() {
        assert_eq!(
            classify(raw(401, r#"{"totp_required": true}"#)).unwrap(),
            DefenseSignal::SecondFactorRequired
        );
    }

    #[test]
    fn test_unknown_status_is_conservative_failure() {
        assert_eq!(classify(raw(500, "oops")).unwrap(), DefenseSignal::Failure);
        assert_eq!(classify(raw(302, "")).unwrap(), DefenseSignal::Failure);
    }

    #[test]
    fn test_transport_failure_becomes_signal() {
        let result = classify(Err(TransportFailure { cause: "connection refused".to_string() }));
        assert_eq!(
            result.unwrap(),
            DefenseSignal::TransportError { cause: "connection refused".to_string() }
        );
    }
}
