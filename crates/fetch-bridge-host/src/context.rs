//! Background execution context.
//!
//! The context is a dedicated OS thread running a single-threaded Tokio
//! runtime that drives a [`Dispatcher`]. It owns the background endpoint of
//! the duplex channel for its whole life and stops when the caller endpoint
//! is dropped.

use std::sync::Arc;
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info};

use fetch_bridge_common::{BackgroundEndpoint, BridgeConfig, BridgeError, NotifyCell};

use crate::client::Connector;
use crate::dispatcher::Dispatcher;

/// Sets the cell when the background thread exits for any reason, so a
/// caller blocked on it wakes and observes the closed channel.
struct NotifyOnExit(Arc<NotifyCell>);

impl Drop for NotifyOnExit {
    fn drop(&mut self) {
        self.0.notify();
    }
}

/// Handle to a running background context.
#[derive(Debug)]
pub struct BackgroundContext {
    name: String,
    thread: Option<JoinHandle<()>>,
}

impl BackgroundContext {
    /// Start the background thread and wait until its runtime is up.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::ContextStart`] if the thread cannot be spawned
    /// or its runtime cannot be built.
    pub fn spawn<C: Connector>(
        name: impl Into<String>,
        connector: C,
        config: &BridgeConfig,
        endpoint: BackgroundEndpoint,
        cell: Arc<NotifyCell>,
    ) -> Result<Self, BridgeError> {
        let name = name.into();
        let dispatcher = Dispatcher::new(connector, config);
        let (init_tx, init_rx) = std_mpsc::channel::<Result<(), String>>();

        let thread = thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                let _notify = NotifyOnExit(Arc::clone(&cell));

                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => {
                        let _ = init_tx.send(Ok(()));
                        runtime
                    }
                    Err(e) => {
                        let _ = init_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                runtime.block_on(dispatcher.run(endpoint, cell));
            })
            .map_err(|e| BridgeError::context_start(e.to_string()))?;

        match init_rx.recv() {
            Ok(Ok(())) => {
                info!(context = %name, "Background context started");
                Ok(Self {
                    name,
                    thread: Some(thread),
                })
            }
            Ok(Err(reason)) => {
                let _ = thread.join();
                Err(BridgeError::context_start(reason))
            }
            Err(_) => {
                let _ = thread.join();
                Err(BridgeError::context_start(
                    "background thread exited during startup",
                ))
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while the background thread has not been joined.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Wait for the background thread to exit.
    ///
    /// The caller endpoint must be dropped first; the thread only stops once
    /// its request queue closes. Calling this again is a no-op.
    pub fn terminate(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            error!(context = %self.name, "Background context panicked");
        } else {
            debug!(context = %self.name, "Background context terminated");
        }
    }
}
