//! Error types for the fetch bridge.
//!
//! [`BridgeError`] is the single error type returned by a synchronous fetch.
//! Failures that crossed the context boundary carry a [`RevivedError`], so the
//! caller sees the error kind and message produced on the background side.

use thiserror::Error;

use crate::revive::RevivedError;
use crate::wire::RequestId;

/// Top-level bridge errors.
///
/// A fetch either returns a complete response or exactly one of these.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The HTTP client failed before a response was produced.
    ///
    /// The bridge instance stays usable after a transport failure.
    #[error("Transport failure: {0}")]
    Transport(RevivedError),

    /// The serviced endpoint reported an error from its own logic.
    ///
    /// Signalled by status 500 plus the error marker header.
    #[error("Application error: {0}")]
    Application(RevivedError),

    /// The response did not belong to the outstanding request.
    ///
    /// This is an internal consistency fault; the instance is terminated.
    #[error("Correlation fault: expected response {expected}, received {received:?}")]
    Correlation {
        /// Id of the request that was sent.
        expected: RequestId,
        /// Id of the message that was received, if any.
        received: Option<RequestId>,
    },

    /// A fetch was issued while another one was still outstanding.
    #[error("Bridge busy: a fetch is already in flight on this instance")]
    Busy,

    /// The bridge instance was disposed.
    #[error("Bridge disposed")]
    Disposed,

    /// The background context exited while the caller depended on it.
    #[error("Background context terminated")]
    ContextTerminated,

    /// The background context could not be started.
    #[error("Failed to start background context: {reason}")]
    ContextStart {
        /// Description of the startup failure.
        reason: String,
    },

    /// The request URL could not be parsed.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as given by the caller.
        url: String,
        /// Why parsing failed.
        reason: String,
    },

    /// The request could not be built.
    #[error("Invalid request: {reason}")]
    InvalidRequest {
        /// Description of the problem.
        reason: String,
    },
}

impl BridgeError {
    /// Create a new `ContextStart` error.
    pub fn context_start(reason: impl Into<String>) -> Self {
        Self::ContextStart {
            reason: reason.into(),
        }
    }

    /// Create a new `InvalidUrl` error.
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a new `InvalidRequest` error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Returns `true` for a network-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` for an error raised by the serviced endpoint.
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Application(_))
    }

    /// Returns `true` if the bridge instance can no longer be used.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Correlation { .. } | Self::Disposed | Self::ContextTerminated
        )
    }

    /// The revived error carried across the boundary, if any.
    pub fn revived(&self) -> Option<&RevivedError> {
        match self {
            Self::Transport(err) | Self::Application(err) => Some(err),
            _ => None,
        }
    }
}
