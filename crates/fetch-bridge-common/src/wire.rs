//! Messages exchanged between the caller and the background context.
//!
//! The vocabulary is deliberately small: one request shape and one response
//! shape with a success and a failure variant. Messages are correlated by id
//! only to detect bugs; at most one request is ever outstanding.

use bytes::Bytes;

use crate::stream::StreamHandle;

/// Marks a request as issued through the bridge.
///
/// Serving code uses it to avoid handling the call synchronously again.
pub const BRIDGE_ORIGIN_HEADER: &str = "x-bridge-originated";

/// Response sentinel opting in to a streamed body.
pub const STREAM_BODY_HEADER: &str = "x-bridge-stream-body";

/// Response marker: the body is a serialized application error.
///
/// Only honoured together with status 500.
pub const ERROR_BODY_HEADER: &str = "x-bridge-error";

/// Status paired with [`ERROR_BODY_HEADER`].
pub const APPLICATION_ERROR_STATUS: u16 = 500;

/// Request correlation id, monotonic per bridge instance.
pub type RequestId = u64;

/// A request sent from the caller to the background context.
///
/// The body is always fully materialized; a blocked caller cannot feed a
/// stream incrementally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMessage {
    pub id: RequestId,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
}

/// Response body as delivered to the caller.
#[derive(Debug, Default)]
pub enum ResponseBody {
    /// No body (HEAD requests, 204, 304 and similar).
    #[default]
    Null,
    /// The complete body.
    Bytes(Bytes),
    /// A live stream handle; ownership moved to the receiver.
    Stream(StreamHandle),
}

impl ResponseBody {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// The buffered bytes, if the body was buffered.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Take the stream handle, if the body was streamed.
    pub fn into_stream(self) -> Option<StreamHandle> {
        match self {
            Self::Stream(handle) => Some(handle),
            _ => None,
        }
    }
}

/// A response sent from the background context to the caller.
#[derive(Debug)]
pub enum ResponseMessage {
    Success {
        id: RequestId,
        status: u16,
        headers: Vec<(String, String)>,
        body: ResponseBody,
    },
    Failure {
        id: RequestId,
        /// Serialized [`ErrorPayload`](crate::ErrorPayload).
        error: String,
    },
}

impl ResponseMessage {
    /// The id of the request this message answers.
    pub fn id(&self) -> RequestId {
        match self {
            Self::Success { id, .. } | Self::Failure { id, .. } => *id,
        }
    }
}

/// Get a header value by name (case-insensitive).
pub fn header_value<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}
