//! Request construction and response classification.
//!
//! Every administrative call goes through [`execute`], which folds the three
//! failure layers (transport, HTTP status, JSON error envelope) into a single
//! [`OperationResult`].

use std::fmt;

use gisadmin_config::SiteEndpoint;
use serde_json::Value;

use super::error::{Phase, SiteError};
use super::session::Session;
use super::transport::{Transport, TransportError};

/// Ordered form fields sent with a request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormParameters {
    pairs: Vec<(String, String)>,
}

impl FormParameters {
    /// Creates an empty parameter list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field, keeping insertion order.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Returns the first value recorded for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(name, _)| name.as_str())
    }

    /// Borrowed view suitable for form serialisation.
    #[must_use]
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

// Credentials and tokens travel in the form, so only names are printed.
impl fmt::Debug for FormParameters {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.keys()).finish()
    }
}

/// A single administrative call, built fresh for each phase.
#[derive(Debug, Clone)]
pub struct OperationRequest<'a> {
    endpoint: &'a SiteEndpoint,
    path: String,
    form: FormParameters,
}

impl<'a> OperationRequest<'a> {
    /// Request against an operation under the admin context.
    #[must_use]
    pub fn admin(endpoint: &'a SiteEndpoint, operation: &str) -> Self {
        Self::at(endpoint, endpoint.admin_path(operation))
    }

    /// Request against a resource under the site root.
    #[must_use]
    pub fn site(endpoint: &'a SiteEndpoint, resource: &str) -> Self {
        Self::at(endpoint, endpoint.site_path(resource))
    }

    fn at(endpoint: &'a SiteEndpoint, path: String) -> Self {
        let mut form = FormParameters::new();
        form.push("f", "json");
        Self {
            endpoint,
            path,
            form,
        }
    }

    /// Attaches the session token.
    #[must_use]
    pub fn authorised(mut self, session: &Session) -> Self {
        self.form.push("token", session.token());
        self
    }

    /// Adds a form field.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.form.push(key, value);
        self
    }

    /// Target site.
    #[must_use]
    pub fn endpoint(&self) -> &SiteEndpoint {
        self.endpoint
    }

    /// Unencoded request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Form fields in order.
    #[must_use]
    pub fn form(&self) -> &FormParameters {
        &self.form
    }
}

/// Why the server's answer was treated as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Status other than 200; the body is the only message.
    Http {
        /// Status code returned by the server.
        status: u16,
    },
    /// `{"status": "error", "messages": [...]}` envelope.
    Envelope,
    /// A JSON `error` object returned by token issuance.
    Rejected,
    /// A 200 body that could not be interpreted.
    MalformedBody,
}

/// Application-level failure with the server's messages verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationFailure {
    /// Classification of the failure.
    pub kind: FailureKind,
    /// Messages in the order the server sent them.
    pub messages: Vec<String>,
}

impl ApplicationFailure {
    /// Builds a failure from its parts.
    #[must_use]
    pub fn new(kind: FailureKind, messages: Vec<String>) -> Self {
        Self { kind, messages }
    }
}

/// Outcome of one administrative call.
#[derive(Debug)]
pub enum OperationResult {
    /// The server accepted the request; carries the parsed payload.
    Success(Value),
    /// The server answered but refused or failed the request.
    ApplicationError(ApplicationFailure),
    /// No usable answer was received.
    TransportError(TransportError),
}

impl OperationResult {
    /// Converts the outcome into the payload or a [`SiteError`] for `phase`.
    ///
    /// # Errors
    ///
    /// Returns the [`SiteError`] matching the failure layer.
    pub fn into_payload(self, phase: Phase, endpoint: &SiteEndpoint) -> Result<Value, SiteError> {
        match self {
            Self::Success(payload) => Ok(payload),
            Self::ApplicationError(failure) => Err(SiteError::from_failure(phase, endpoint, failure)),
            Self::TransportError(source) => Err(SiteError::Transport {
                phase,
                host: endpoint.host().to_owned(),
                source,
            }),
        }
    }

    /// Returns `true` for [`OperationResult::Success`].
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Reports whether `body` is free of an application error envelope.
///
/// Returns `false` only when the body is a JSON object whose `status` is
/// `"error"`; each entry of its `messages` array is passed to `on_message`.
/// Bodies that are not JSON are not judged here.
pub fn is_application_success(body: &str, mut on_message: impl FnMut(&str)) -> bool {
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) else {
        return true;
    };
    if object.get("status").and_then(Value::as_str) != Some("error") {
        return true;
    }

    if let Some(Value::Array(messages)) = object.get("messages") {
        for message in messages {
            match message {
                Value::String(text) => on_message(text),
                other => on_message(&other.to_string()),
            }
        }
    }
    false
}

/// Sends `request` and classifies the answer.
pub fn execute<T>(transport: &T, request: &OperationRequest<'_>) -> OperationResult
where
    T: Transport + ?Sized,
{
    let response = match transport.post(request.endpoint(), request.path(), request.form()) {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!(
                target: "gisadmin::call",
                event = "transport_failed",
                path = %request.path(),
                error = %error,
                "request did not complete"
            );
            return OperationResult::TransportError(error);
        }
    };

    if response.status != 200 {
        return OperationResult::ApplicationError(ApplicationFailure::new(
            FailureKind::Http {
                status: response.status,
            },
            vec![response.body],
        ));
    }

    let mut messages = Vec::new();
    if !is_application_success(&response.body, |message| messages.push(message.to_owned())) {
        return OperationResult::ApplicationError(ApplicationFailure::new(
            FailureKind::Envelope,
            messages,
        ));
    }

    match serde_json::from_str::<Value>(&response.body) {
        Ok(payload @ Value::Object(_)) => OperationResult::Success(payload),
        _ => OperationResult::ApplicationError(ApplicationFailure::new(
            FailureKind::MalformedBody,
            vec![response.body],
        )),
    }
}
