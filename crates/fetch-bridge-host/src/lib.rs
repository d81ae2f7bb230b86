//! Background side of the synchronous fetch bridge.
//!
//! Everything in this crate runs on the background execution context, never
//! on the blocked caller:
//!
//! - [`client`]: Pooled client and connector traits, destination authority
//! - [`reqwest_client`]: `reqwest`-backed connector
//! - [`pool`]: Single-entry client cache keyed by authority
//! - [`dispatcher`]: Executes requests and builds response messages
//! - [`context`]: The background thread and its runtime
//!
//! # Completion order
//!
//! The dispatcher enqueues a response message first and sets the shared
//! notification cell second. A caller woken by the cell therefore always
//! finds a message waiting.

pub mod client;
pub mod context;
pub mod dispatcher;
pub mod pool;
pub mod reqwest_client;

pub use client::{Authority, Connector, OutboundRequest, PooledClient, UpstreamBody, UpstreamResponse};
pub use context::BackgroundContext;
pub use dispatcher::Dispatcher;
pub use pool::PoolCache;
pub use reqwest_client::{ReqwestClient, ReqwestConnector};
