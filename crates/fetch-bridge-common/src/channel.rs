//! Duplex message channel between the caller and the background context.
//!
//! [`duplex`] returns two endpoints. The [`BackgroundEndpoint`] is moved into
//! the background context when it starts; the caller keeps the
//! [`CallerEndpoint`]. Payloads inside messages (byte buffers, stream
//! handles) move with the message and are never copied.

use tokio::sync::mpsc::{self, error::TryRecvError};

use crate::error::BridgeError;
use crate::wire::{RequestMessage, ResponseMessage};

/// Create a connected pair of endpoints.
pub fn duplex() -> (CallerEndpoint, BackgroundEndpoint) {
    let (request_tx, request_rx) = mpsc::unbounded_channel();
    let (response_tx, response_rx) = mpsc::unbounded_channel();

    (
        CallerEndpoint {
            requests: request_tx,
            responses: response_rx,
        },
        BackgroundEndpoint {
            requests: request_rx,
            responses: response_tx,
        },
    )
}

/// Caller side of the channel.
#[derive(Debug)]
pub struct CallerEndpoint {
    requests: mpsc::UnboundedSender<RequestMessage>,
    responses: mpsc::UnboundedReceiver<ResponseMessage>,
}

impl CallerEndpoint {
    /// Send a request without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ContextTerminated`] if the background endpoint
    /// has been dropped.
    pub fn send(&self, request: RequestMessage) -> Result<(), BridgeError> {
        self.requests
            .send(request)
            .map_err(|_| BridgeError::ContextTerminated)
    }

    /// Non-blocking receive.
    ///
    /// Only meaningful after the notification cell has been set. Returns
    /// `Ok(None)` when no message is queued.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ContextTerminated`] if the queue is empty and the
    /// background endpoint has been dropped.
    pub fn try_receive(&mut self) -> Result<Option<ResponseMessage>, BridgeError> {
        match self.responses.try_recv() {
            Ok(message) => Ok(Some(message)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(BridgeError::ContextTerminated),
        }
    }
}

/// Background side of the channel.
#[derive(Debug)]
pub struct BackgroundEndpoint {
    requests: mpsc::UnboundedReceiver<RequestMessage>,
    responses: mpsc::UnboundedSender<ResponseMessage>,
}

impl BackgroundEndpoint {
    /// Wait for the next request. Returns `None` once the caller endpoint is
    /// dropped.
    pub async fn receive(&mut self) -> Option<RequestMessage> {
        self.requests.recv().await
    }

    /// Enqueue a response. Returns `false` if the caller endpoint is gone.
    pub fn reply(&self, response: ResponseMessage) -> bool {
        self.responses.send(response).is_ok()
    }
}
