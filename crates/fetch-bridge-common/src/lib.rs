//! Common types, errors, and primitives for the synchronous fetch bridge.
//!
//! This crate provides the pieces shared by both sides of the bridge:
//! - Error types using `thiserror`, plus revival of serialized errors
//! - Configuration structures and the TOML config file
//! - The wire messages exchanged between the caller and the background context
//! - The notification cell, duplex channel, and stream handle primitives

pub mod cell;
pub mod channel;
pub mod config;
pub mod config_file;
pub mod error;
pub mod revive;
pub mod stream;
pub mod wire;

pub use cell::NotifyCell;
pub use channel::{BackgroundEndpoint, CallerEndpoint, duplex};
pub use config::{BridgeConfig, PoolConfig, StreamConfig};
pub use config_file::{ConfigFile, ConfigFileError, LoggingConfig, ServeConfig};
pub use error::BridgeError;
pub use revive::{ErrorKind, ErrorPayload, RevivedError, encode_error};
pub use stream::{StreamHandle, StreamSender, stream_channel};
pub use wire::{RequestId, RequestMessage, ResponseBody, ResponseMessage};
