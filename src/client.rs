// client.rs - Blocking HTTP Transport for the Auth Endpoint
// Purpose: Issue login and captcha-token requests over the wire contract and
//          hand back raw responses for classification. One request in flight
//          at a time; all waits block the calling thread.

use std::time::Duration;

use serde_json::{Value, json};

use crate::errors::AttackError;

/// Raw outcome of one wire call, before defense-signal classification.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    /// Verbatim Retry-After header value, if present.
    pub retry_after: Option<String>,
}

/// Transport-level failure: timeout, connection refused, broken body read.
/// Recoverable by design; the attempt loop records it and moves on.
#[derive(Debug, Clone)]
pub struct TransportFailure {
    pub cause: String,
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cause)
    }
}

/// Seam between the engines and the network. The real implementation is
/// [`AuthClient`]; tests substitute scripted fakes.
pub trait LoginTransport {
    fn login(
        &mut self,
        username: &str,
        password: &str,
        captcha_token: Option<&str>,
    ) -> Result<RawResponse, TransportFailure>;

    fn captcha_token(&mut self, group_seed: &str) -> Result<String, TransportFailure>;
}

pub struct AuthClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl AuthClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AttackError> {
        let http = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }

    /// Creates a test account on the server under test. Returns false when the
    /// server reports the user already exists.
    pub fn register(&self, username: &str, password: &str, totp: bool) -> Result<bool, AttackError> {
        let response = self
            .http
            .post(format!("{}/register", self.base_url))
            .json(&json!({ "username": username, "password": password, "totp": totp }))
            .send()?;

        match response.status().as_u16() {
            200 => Ok(true),
            400 => Ok(false),
            other => Err(AttackError::Protocol(format!(
                "unexpected status {other} from /register"
            ))),
        }
    }
}

impl LoginTransport for AuthClient {
    fn login(
        &mut self,
        username: &str,
        password: &str,
        captcha_token: Option<&str>,
    ) -> Result<RawResponse, TransportFailure> {
        let mut payload = json!({ "username": username, "password": password });
        if let Some(token) = captcha_token {
            payload["captcha_token"] = json!(token);
        }

        let response = self
            .http
            .post(format!("{}/login", self.base_url))
            .json(&payload)
            .send()
            .map_err(|e| TransportFailure { cause: e.to_string() })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .map_err(|e| TransportFailure { cause: e.to_string() })?;

        Ok(RawResponse { status, body, retry_after })
    }

    fn captcha_token(&mut self, group_seed: &str) -> Result<String, TransportFailure> {
        let response = self
            .http
            .get(format!("{}/admin/captcha_token", self.base_url))
            .query(&[("group_seed", group_seed)])
            .send()
            .map_err(|e| TransportFailure { cause: e.to_string() })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(TransportFailure {
                cause: format!("token endpoint returned status {status}"),
            });
        }

        let body: Value = response
            .json()
            .map_err(|e| TransportFailure { cause: e.to_string() })?;
        body.get("token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| TransportFailure {
                cause: "token endpoint response missing 'token' field".to_string(),
            })
    }
}
