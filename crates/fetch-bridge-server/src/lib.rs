//! Serving side of the synchronous fetch bridge.
//!
//! Code that answers bridged requests uses this crate to:
//!
//! - Detect requests issued through the bridge ([`BridgeOrigin`])
//! - Raise an application error in the caller ([`application_error_response`])
//! - Hand the caller a live stream instead of a buffered body
//!   ([`streamed_response`])
//!
//! [`DevServer`] serves a handful of fixed routes built on these helpers.
//!
//! # Quick Start
//!
//! ```ignore
//! use fetch_bridge_server::{DevServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     DevServer::new(ServerConfig::default()).run().await
//! }
//! ```

pub mod handler;
pub mod origin;
pub mod response;
pub mod router;
pub mod server;

pub use origin::{BridgeOrigin, mark_bridge_origin};
pub use response::{BufferedResponse, application_error_response, streamed_response};
pub use router::build_router;
pub use server::{DevServer, ServerConfig, TestHandle};
