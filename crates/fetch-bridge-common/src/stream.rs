//! Streamed response bodies.
//!
//! A [`StreamHandle`] is handed to the caller when the server opts in to
//! streaming. Chunks are produced on the background context by a pump task
//! holding the matching [`StreamSender`]. Dropping the handle closes the
//! channel, which ends the pump and releases the upstream body.
//!
//! The pump marks a complete body with an explicit end frame. A channel that
//! closes without one (the background context went away mid-body) surfaces as
//! an `AbortError`, never as a short body.

use std::fmt;
use std::io::{self, Read};

use bytes::{Buf, Bytes, BytesMut};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::BridgeError;
use crate::revive::{ErrorPayload, RevivedError};

enum Frame {
    Data(Bytes),
    End,
    Failed(RevivedError),
}

/// Create a bounded chunk channel.
///
/// `capacity` is clamped to at least one chunk.
pub fn stream_channel(capacity: usize) -> (StreamSender, StreamHandle) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        StreamSender { tx },
        StreamHandle {
            frames: rx,
            pending: Bytes::new(),
            finished: false,
        },
    )
}

/// Producer half, owned by the background context.
#[derive(Debug, Clone)]
pub struct StreamSender {
    tx: mpsc::Sender<Frame>,
}

impl StreamSender {
    /// Forward a chunk. Returns `false` once the handle has been dropped.
    pub async fn send_chunk(&self, chunk: Bytes) -> bool {
        self.tx.send(Frame::Data(chunk)).await.is_ok()
    }

    /// Mark the body as complete.
    pub async fn finish(&self) {
        let _ = self.tx.send(Frame::End).await;
    }

    /// Terminate the stream with an error.
    pub async fn fail(&self, error: RevivedError) {
        let _ = self.tx.send(Frame::Failed(error)).await;
    }

    /// Returns `true` if the consumer has dropped the handle.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer has dropped the handle.
    pub async fn closed(&self) {
        self.tx.closed().await;
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(chunk) => write!(f, "Data({} bytes)", chunk.len()),
            Self::End => f.write_str("End"),
            Self::Failed(err) => write!(f, "Failed({err})"),
        }
    }
}

/// Live handle to a streamed response body.
///
/// Reading blocks the calling thread, so it must not be used from inside an
/// async runtime.
pub struct StreamHandle {
    frames: mpsc::Receiver<Frame>,
    pending: Bytes,
    finished: bool,
}

impl StreamHandle {
    /// Block for the next chunk. Returns `Ok(None)` at end of body.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Transport`] if the upstream body failed
    /// mid-stream, or with an `AbortError` if the background context stopped
    /// before the body was complete.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn next_chunk(&mut self) -> Result<Option<Bytes>, BridgeError> {
        if !self.pending.is_empty() {
            return Ok(Some(std::mem::take(&mut self.pending)));
        }
        if self.finished {
            return Ok(None);
        }

        match self.frames.blocking_recv() {
            Some(Frame::Data(chunk)) => Ok(Some(chunk)),
            Some(Frame::End) => {
                self.finished = true;
                Ok(None)
            }
            Some(Frame::Failed(err)) => {
                self.finished = true;
                Err(BridgeError::Transport(err))
            }
            None => {
                self.finished = true;
                debug!("Stream closed without end of body");
                Err(BridgeError::Transport(
                    ErrorPayload::new("AbortError", "body terminated").revive(),
                ))
            }
        }
    }

    /// Drain the rest of the body into one buffer.
    ///
    /// # Errors
    ///
    /// Fails as [`next_chunk`](Self::next_chunk) does; the partial body is
    /// discarded.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn read_all(mut self) -> Result<Bytes, BridgeError> {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.next_chunk()? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf.freeze())
    }

    /// Returns `true` once the end of the body (or an error) was observed.
    pub fn is_finished(&self) -> bool {
        self.finished && self.pending.is_empty()
    }
}

impl Read for StreamHandle {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        while self.pending.is_empty() {
            match self.next_chunk().map_err(io::Error::other)? {
                Some(chunk) => self.pending = chunk,
                None => return Ok(0),
            }
        }
        let n = out.len().min(self.pending.len());
        out[..n].copy_from_slice(&self.pending[..n]);
        self.pending.advance(n);
        Ok(n)
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("pending", &self.pending.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if !self.finished {
            debug!("Stream handle dropped before end of body, cancelling upstream");
        }
    }
}
