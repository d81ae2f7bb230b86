//! Caller side of the synchronous fetch bridge.
//!
//! This crate exposes [`SyncFetchBridge`], which turns an asynchronous HTTP
//! request into a blocking call:
//! - [`bridge`]: Lifecycle manager owning the background context
//! - [`fetch`]: Request options and the response type
//! - [`reconstruct`]: Rebuilds responses and revives serialized errors
//!
//! # Quick Start
//!
//! ```ignore
//! use fetch_bridge_core::{BridgeConfig, FetchInit, SyncFetchBridge};
//!
//! let bridge = SyncFetchBridge::new(BridgeConfig::default());
//! let response = bridge.fetch("http://127.0.0.1:8787/health", FetchInit::new())?;
//! assert_eq!(response.status, 200);
//! bridge.dispose();
//! ```

pub mod bridge;
pub mod fetch;
pub mod reconstruct;

pub use bridge::{BridgeState, SyncFetchBridge};
pub use fetch::{BridgeResponse, FetchInit};
pub use reconstruct::reconstruct;

pub use fetch_bridge_common::{
    BridgeConfig, BridgeError, ErrorKind, ResponseBody, RevivedError, StreamHandle,
};
