//! End-to-end tests: a blocking caller fetching from a real HTTP server.
//!
//! The development server runs on a multi-threaded runtime while the test
//! thread drives a reqwest-backed bridge synchronously.

use fetch_bridge_common::BridgeConfig;
use fetch_bridge_common::wire::BRIDGE_ORIGIN_HEADER;
use fetch_bridge_core::{BridgeError, BridgeState, ErrorKind, FetchInit, SyncFetchBridge};
use fetch_bridge_server::handler::STREAM_CHUNKS;
use fetch_bridge_server::{DevServer, TestHandle};
use http::Method;
use tokio::runtime::Runtime;

// ============================================================================
// Test Helpers
// ============================================================================

fn start_server() -> (Runtime, TestHandle) {
    let runtime = Runtime::new().unwrap();
    let handle = runtime.block_on(DevServer::start_test()).unwrap();
    (runtime, handle)
}

fn stop_server(runtime: Runtime, handle: TestHandle) {
    runtime.block_on(handle.shutdown());
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/health")
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn test_health_round_trip() {
    let (runtime, server) = start_server();
    let bridge = SyncFetchBridge::new(BridgeConfig::default());

    let response = bridge.fetch(&server.url("/health"), FetchInit::new()).unwrap();

    assert_eq!(response.status, 200);
    assert!(response.ok());
    assert_eq!(response.text().unwrap(), "OK");
    assert_eq!(bridge.state(), BridgeState::Ready);

    bridge.dispose();
    stop_server(runtime, server);
}

#[test]
fn test_echo_sees_body_and_origin_marker() {
    let (runtime, server) = start_server();
    let bridge = SyncFetchBridge::new(BridgeConfig::default());

    let response = bridge
        .fetch(
            &server.url("/echo"),
            FetchInit::new()
                .method(Method::POST)
                .header("content-type", "application/json")
                .header(BRIDGE_ORIGIN_HEADER, "0")
                .body(r#"{"k":1}"#),
        )
        .unwrap();
    assert_eq!(response.status, 200);

    let echoed: serde_json::Value = serde_json::from_str(&response.text().unwrap()).unwrap();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["body"], r#"{"k":1}"#);
    assert_eq!(echoed["bridged"], true);
    assert_eq!(echoed["headers"][BRIDGE_ORIGIN_HEADER], "1");
    assert_eq!(echoed["headers"]["content-type"], "application/json");

    bridge.dispose();
    stop_server(runtime, server);
}

#[test]
fn test_streamed_body_arrives_as_handle() {
    let (runtime, server) = start_server();
    let bridge = SyncFetchBridge::new(BridgeConfig::default());

    let response = bridge.fetch(&server.url("/stream"), FetchInit::new()).unwrap();
    assert!(response.body.is_stream());

    let handle = response.into_stream().unwrap();
    assert_eq!(handle.read_all().unwrap(), STREAM_CHUNKS.concat().as_bytes());

    bridge.dispose();
    stop_server(runtime, server);
}

#[test]
fn test_application_error_is_raised() {
    let (runtime, server) = start_server();
    let bridge = SyncFetchBridge::new(BridgeConfig::default());

    let err = bridge.fetch(&server.url("/fail"), FetchInit::new()).unwrap_err();
    assert!(err.is_application());
    let revived = err.revived().unwrap();
    assert_eq!(revived.kind(), ErrorKind::RangeError);
    assert_eq!(revived.message(), "boom");

    let err = bridge
        .fetch(&server.url("/fail/CustomError"), FetchInit::new())
        .unwrap_err();
    let revived = err.revived().unwrap();
    assert_eq!(revived.kind(), ErrorKind::Unknown);
    assert_eq!(revived.name(), "CustomError");

    bridge.dispose();
    stop_server(runtime, server);
}

#[test]
fn test_connection_refused_then_recovery() {
    let (runtime, server) = start_server();
    let bridge = SyncFetchBridge::new(BridgeConfig::default());

    let err = bridge.fetch(&closed_port_url(), FetchInit::new()).unwrap_err();
    let BridgeError::Transport(revived) = &err else {
        panic!("expected transport error, got {err:?}");
    };
    assert_eq!(revived.kind(), ErrorKind::TypeError);
    assert_eq!(revived.message(), "fetch failed");

    let response = bridge.fetch(&server.url("/health"), FetchInit::new()).unwrap();
    assert_eq!(response.status, 200);

    bridge.dispose();
    stop_server(runtime, server);
}

#[test]
fn test_null_bodies() {
    let (runtime, server) = start_server();
    let bridge = SyncFetchBridge::new(BridgeConfig::default());

    let head = bridge
        .fetch(&server.url("/health"), FetchInit::new().method(Method::HEAD))
        .unwrap();
    assert_eq!(head.status, 200);
    assert!(head.body.is_null());

    let no_content = bridge
        .fetch(&server.url("/status/204"), FetchInit::new())
        .unwrap();
    assert_eq!(no_content.status, 204);
    assert!(no_content.body.is_null());

    bridge.dispose();
    stop_server(runtime, server);
}

#[test]
fn test_switching_between_servers() {
    let (runtime, first) = start_server();
    let second = runtime.block_on(DevServer::start_test()).unwrap();
    let bridge = SyncFetchBridge::new(BridgeConfig::default());

    for url in [
        first.url("/health"),
        second.url("/health"),
        first.url("/health"),
    ] {
        assert_eq!(bridge.fetch(&url, FetchInit::new()).unwrap().status, 200);
    }
    assert_eq!(bridge.requests_sent(), 3);

    bridge.dispose();
    runtime.block_on(second.shutdown());
    stop_server(runtime, first);
}
