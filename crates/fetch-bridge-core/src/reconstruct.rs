//! Caller-side reconstruction of response messages.

use http::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use fetch_bridge_common::wire::{APPLICATION_ERROR_STATUS, ERROR_BODY_HEADER, header_value};
use fetch_bridge_common::{BridgeError, ErrorPayload, ResponseBody, ResponseMessage};

use crate::fetch::BridgeResponse;

/// Turn a correlated response message into a response or a raised error.
///
/// - `Failure` revives its payload as a [`BridgeError::Transport`].
/// - Status 500 with the error marker and a buffered body revives the body as
///   a [`BridgeError::Application`].
/// - Anything else is returned with headers rebuilt and the body untouched.
pub fn reconstruct(message: ResponseMessage) -> Result<BridgeResponse, BridgeError> {
    match message {
        ResponseMessage::Failure { error, .. } => {
            Err(BridgeError::Transport(ErrorPayload::decode(&error).revive()))
        }
        ResponseMessage::Success {
            status,
            headers,
            body,
            ..
        } => {
            if status == APPLICATION_ERROR_STATUS && header_value(&headers, ERROR_BODY_HEADER).is_some()
            {
                if let ResponseBody::Bytes(raw) = &body {
                    let payload = ErrorPayload::decode(&String::from_utf8_lossy(raw));
                    debug!(name = %payload.name, "Reviving application error");
                    return Err(BridgeError::Application(payload.revive()));
                }
            }

            Ok(BridgeResponse {
                status,
                headers: rebuild_headers(headers),
                body,
            })
        }
    }
}

/// Build a case-insensitive header map, keeping repeated headers.
fn rebuild_headers(raw: Vec<(String, String)>) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(raw.len());
    for (name, value) in raw {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %name, "Dropping invalid response header"),
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use fetch_bridge_common::ErrorKind;

    use super::*;

    fn success(status: u16, headers: &[(&str, &str)], body: ResponseBody) -> ResponseMessage {
        ResponseMessage::Success {
            id: 1,
            status,
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            body,
        }
    }

    #[test]
    fn test_success_rebuilds_headers() {
        let message = success(
            200,
            &[("Content-Type", "text/plain"), ("set-cookie", "a=1"), ("set-cookie", "b=2")],
            ResponseBody::Bytes(Bytes::from_static(b"hello")),
        );

        let response = reconstruct(message).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.headers.get_all("set-cookie").iter().count(), 2);
        assert_eq!(response.body.as_bytes().unwrap(), "hello");
    }

    #[test]
    fn test_application_error_revived() {
        let message = success(
            500,
            &[(ERROR_BODY_HEADER, "1")],
            ResponseBody::Bytes(Bytes::from_static(br#"{"name":"RangeError","message":"boom"}"#)),
        );

        let err = reconstruct(message).unwrap_err();
        assert!(err.is_application());
        let revived = err.revived().unwrap();
        assert_eq!(revived.kind(), ErrorKind::RangeError);
        assert_eq!(revived.name(), "RangeError");
        assert_eq!(revived.message(), "boom");
    }

    #[test]
    fn test_plain_500_is_a_response() {
        let message = success(
            500,
            &[("content-type", "text/plain")],
            ResponseBody::Bytes(Bytes::from_static(b"oops")),
        );
        let response = reconstruct(message).unwrap();
        assert_eq!(response.status, 500);
    }

    #[test]
    fn test_marker_on_other_status_is_a_response() {
        let message = success(
            502,
            &[(ERROR_BODY_HEADER, "1")],
            ResponseBody::Bytes(Bytes::from_static(b"{}")),
        );
        assert_eq!(reconstruct(message).unwrap().status, 502);
    }

    #[test]
    fn test_marker_with_null_body_is_a_response() {
        let message = success(500, &[(ERROR_BODY_HEADER, "1")], ResponseBody::Null);
        assert!(reconstruct(message).unwrap().body.is_null());
    }

    #[test]
    fn test_failure_is_transport_error() {
        let message = ResponseMessage::Failure {
            id: 1,
            error: ErrorPayload::new("TypeError", "fetch failed").encode(),
        };
        let err = reconstruct(message).unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.revived().unwrap().kind(), ErrorKind::TypeError);
    }

    #[test]
    fn test_invalid_header_dropped() {
        let message = success(
            200,
            &[("bad header", "x"), ("x-ok", "1")],
            ResponseBody::Null,
        );
        let response = reconstruct(message).unwrap();
        assert_eq!(response.headers.len(), 1);
        assert_eq!(response.header("x-ok"), Some("1"));
    }
}
