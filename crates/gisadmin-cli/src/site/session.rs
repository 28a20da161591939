//! Token issuance and per-operation sessions.
//!
//! Tokens are short-lived, so one is requested immediately before each
//! privileged call and dropped straight after. Nothing is cached.

use std::fmt;

use gisadmin_config::SiteEndpoint;
use serde_json::Value;

use super::call::{
    ApplicationFailure, FailureKind, OperationRequest, OperationResult, execute,
};
use super::error::{Phase, SiteError};
use super::transport::{REFERER_TAG, Transport};

/// Resource, relative to the site root, that issues tokens.
pub const TOKEN_RESOURCE: &str = "tokens/generateToken";

/// Primary site administrator credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Bundles a username and password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Administrator account name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Administrator password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A token lent to exactly one privileged operation.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
}

impl Session {
    /// Wraps a token issued by the site.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Exchanges `credentials` for a token.
///
/// On success the payload is the token as a JSON string. A 200 body carrying
/// an `error` object means the server refused the credentials or has no site
/// yet; both surface as [`FailureKind::Rejected`], and the two cannot be told
/// apart from this response alone.
pub fn acquire_token<T>(
    transport: &T,
    endpoint: &SiteEndpoint,
    credentials: &Credentials,
) -> OperationResult
where
    T: Transport + ?Sized,
{
    let request = OperationRequest::site(endpoint, TOKEN_RESOURCE)
        .param("username", credentials.username())
        .param("password", credentials.password())
        .param("client", "referer")
        .param("referer", REFERER_TAG);

    let payload = match execute(transport, &request) {
        OperationResult::Success(payload) => payload,
        other => return other,
    };

    if let Some(error) = payload.get("error") {
        return OperationResult::ApplicationError(ApplicationFailure::new(
            FailureKind::Rejected,
            rejection_messages(error),
        ));
    }

    match payload.get("token").and_then(Value::as_str) {
        Some(token) if !token.is_empty() => OperationResult::Success(Value::from(token)),
        _ => OperationResult::ApplicationError(ApplicationFailure::new(
            FailureKind::MalformedBody,
            vec![String::from("token response did not include a token")],
        )),
    }
}

/// Acquires a token, lends it to `operation`, then drops it.
///
/// # Errors
///
/// Returns the token failure, or whatever `operation` returns.
pub fn with_fresh_session<T, F, R>(
    transport: &T,
    endpoint: &SiteEndpoint,
    credentials: &Credentials,
    operation: F,
) -> Result<R, SiteError>
where
    T: Transport + ?Sized,
    F: FnOnce(&Session) -> Result<R, SiteError>,
{
    let payload = acquire_token(transport, endpoint, credentials)
        .into_payload(Phase::IssueToken, endpoint)?;
    let session = match payload {
        Value::String(token) => Session::new(token),
        other => Session::new(other.to_string()),
    };
    operation(&session)
}

fn rejection_messages(error: &Value) -> Vec<String> {
    let mut messages = Vec::new();
    if let Some(message) = error.get("message").and_then(Value::as_str) {
        messages.push(message.to_owned());
    }
    if let Some(Value::Array(details)) = error.get("details") {
        messages.extend(details.iter().filter_map(Value::as_str).map(str::to_owned));
    }
    if messages.is_empty() {
        messages.push(error.to_string());
    }
    messages
}
