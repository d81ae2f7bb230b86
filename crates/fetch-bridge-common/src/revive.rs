//! Serialized errors and their revival.
//!
//! Errors cross the context boundary as JSON of the form
//! `{"name": ..., "message": ..., "stack": ..., "cause": ...}`. On the caller
//! side the `name` is looked up in a table of known kinds; anything else
//! revives as [`ErrorKind::Unknown`] with the original name preserved.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Name used when nothing more specific is known.
const GENERIC_ERROR_NAME: &str = "Error";

/// Known error kinds, indexed by their wire name.
const KNOWN_KINDS: &[(&str, ErrorKind)] = &[
    ("Error", ErrorKind::Error),
    ("TypeError", ErrorKind::TypeError),
    ("RangeError", ErrorKind::RangeError),
    ("SyntaxError", ErrorKind::SyntaxError),
    ("ReferenceError", ErrorKind::ReferenceError),
    ("EvalError", ErrorKind::EvalError),
    ("URIError", ErrorKind::UriError),
    ("AggregateError", ErrorKind::AggregateError),
    ("AbortError", ErrorKind::AbortError),
    ("TimeoutError", ErrorKind::TimeoutError),
];

/// Typed error kinds recognised during revival.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    SyntaxError,
    ReferenceError,
    EvalError,
    UriError,
    AggregateError,
    AbortError,
    TimeoutError,
    /// The wire name did not match any known kind.
    Unknown,
}

impl ErrorKind {
    /// Look up the kind for a wire name.
    pub fn from_name(name: &str) -> Self {
        KNOWN_KINDS
            .iter()
            .find(|(known, _)| *known == name)
            .map_or(Self::Unknown, |(_, kind)| *kind)
    }

    /// The canonical wire name, or `None` for [`ErrorKind::Unknown`].
    pub fn name(self) -> Option<&'static str> {
        KNOWN_KINDS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(name, _)| *name)
    }
}

/// Serializable error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Error discriminant, e.g. `"TypeError"`.
    #[serde(default = "generic_name")]
    pub name: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Stack trace, if the producer had one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// The error that caused this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ErrorPayload>>,
}

fn generic_name() -> String {
    GENERIC_ERROR_NAME.to_string()
}

impl ErrorPayload {
    /// Create a payload with a name and message.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            stack: None,
            cause: None,
        }
    }

    /// Attach a stack trace.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attach a cause.
    pub fn with_cause(mut self, cause: ErrorPayload) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Build a payload from a Rust error, carrying its source chain as causes.
    pub fn from_error(name: impl Into<String>, err: &(dyn std::error::Error + 'static)) -> Self {
        let mut payload = Self::new(name, err.to_string());
        if let Some(source) = err.source() {
            payload.cause = Some(Box::new(Self::from_error(GENERIC_ERROR_NAME, source)));
        }
        payload
    }

    /// Parse a payload from its wire form.
    ///
    /// Input that is not a JSON error object revives as a generic error whose
    /// message is the raw text, so a garbled payload is never lost.
    pub fn decode(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_else(|err| {
            warn!(error = %err, "Serialized error payload is malformed");
            Self::new(GENERIC_ERROR_NAME, raw)
        })
    }

    /// Serialize to the wire form.
    pub fn encode(&self) -> String {
        encode_error(self)
    }

    /// Reconstruct a typed error.
    pub fn revive(self) -> RevivedError {
        RevivedError {
            kind: ErrorKind::from_name(&self.name),
            name: self.name,
            message: self.message,
            stack: self.stack,
            cause: self.cause.map(|cause| Box::new((*cause).revive())),
        }
    }
}

impl fmt::Display for ErrorPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// Serialize an error value for transport.
///
/// If serialization fails, a minimal payload derived from the value's
/// `Display` output is returned instead, so the caller always gets an error.
pub fn encode_error<T>(err: &T) -> String
where
    T: Serialize + fmt::Display + ?Sized,
{
    match serde_json::to_string(err) {
        Ok(json) => json,
        Err(serialize_err) => {
            warn!(
                error = %serialize_err,
                "Failed to serialize error, sending string-derived fallback"
            );
            serde_json::json!({
                "name": GENERIC_ERROR_NAME,
                "message": err.to_string(),
            })
            .to_string()
        }
    }
}

/// An error reconstructed from its serialized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevivedError {
    kind: ErrorKind,
    name: String,
    message: String,
    stack: Option<String>,
    cause: Option<Box<RevivedError>>,
}

impl RevivedError {
    /// The typed kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The original wire name, preserved for unknown kinds.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    pub fn cause(&self) -> Option<&RevivedError> {
        self.cause.as_deref()
    }
}

impl fmt::Display for RevivedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

impl std::error::Error for RevivedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_deref()
            .map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
