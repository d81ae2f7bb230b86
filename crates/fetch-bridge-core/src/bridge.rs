//! Bridge lifecycle manager.
//!
//! [`SyncFetchBridge`] lets a caller that cannot suspend issue HTTP requests
//! that are serviced on a background execution context. Each instance owns
//! its own context, channel and notification cell; nothing is shared between
//! instances.
//!
//! ```text
//!  caller thread                         background context
//!  ─────────────                         ──────────────────
//!  cell.reset()
//!  endpoint.send(request) ───────────▶   dispatcher.dispatch()
//!  cell.wait()                             pool cache → network
//!       ⋮                                endpoint.reply(response)
//!       ◀──────────────────────────────  cell.notify()
//!  endpoint.try_receive()
//!  reconstruct()
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, error, info, instrument};
use url::Url;
use uuid::Uuid;

use fetch_bridge_common::{
    BridgeConfig, BridgeError, CallerEndpoint, NotifyCell, RequestId, RequestMessage,
    ResponseMessage, duplex,
};
use fetch_bridge_host::{BackgroundContext, Connector, ReqwestConnector};

use crate::fetch::{BridgeResponse, FetchInit};
use crate::reconstruct::reconstruct;

/// How long [`SyncFetchBridge::state`] waits on the lifecycle lock between
/// checks of the busy flag.
const STATE_POLL: Duration = Duration::from_millis(1);

/// Observable lifecycle state of a bridge instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// No background context has been started yet.
    Uninitialized,
    /// The background context is running and idle.
    Ready,
    /// A fetch is blocked waiting for its response.
    AwaitingResponse,
    /// Disposed, or aborted after a fatal fault.
    Terminated,
}

/// The caller endpoint plus the context serving it.
struct Wiring {
    endpoint: CallerEndpoint,
    background: BackgroundContext,
}

enum Lifecycle<C> {
    Uninitialized(C),
    Ready(Wiring),
    Terminated,
}

/// Marks the instance busy for the duration of one fetch.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, BridgeError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BridgeError::Busy)?;
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Synchronous fetch bridge for one emulated runtime instance.
///
/// The background context is started lazily on the first fetch and lives
/// until [`dispose`](Self::dispose) (or drop). At most one fetch may be in
/// flight; a second concurrent call fails with [`BridgeError::Busy`].
///
/// # Blocking
///
/// `fetch` blocks the calling thread with no deadline until the background
/// context replies. It must not be called from inside an async runtime.
pub struct SyncFetchBridge<C: Connector = ReqwestConnector> {
    instance_id: Uuid,
    config: BridgeConfig,
    cell: Arc<NotifyCell>,
    lifecycle: Mutex<Lifecycle<C>>,
    next_id: AtomicU64,
    busy: AtomicBool,
}

impl SyncFetchBridge<ReqwestConnector> {
    /// Create a bridge backed by `reqwest`.
    pub fn new(config: BridgeConfig) -> Self {
        let connector = ReqwestConnector::new(config.pool.clone());
        Self::with_connector(connector, config)
    }
}

impl Default for SyncFetchBridge<ReqwestConnector> {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

impl<C: Connector> SyncFetchBridge<C> {
    /// Create a bridge that builds pooled clients with `connector`.
    pub fn with_connector(connector: C, config: BridgeConfig) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            config,
            cell: Arc::new(NotifyCell::new()),
            lifecycle: Mutex::new(Lifecycle::Uninitialized(connector)),
            next_id: AtomicU64::new(0),
            busy: AtomicBool::new(false),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Number of requests sent so far.
    pub fn requests_sent(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    ///
    /// Only an in-flight fetch reports [`BridgeState::AwaitingResponse`].
    /// While a context start or disposal holds the lifecycle, this waits for
    /// it to finish.
    pub fn state(&self) -> BridgeState {
        loop {
            if self.busy.load(Ordering::Acquire) {
                return BridgeState::AwaitingResponse;
            }
            // A fetch raises the busy flag before taking the lock, so a short
            // timed wait never blocks for a whole round trip.
            if let Some(lifecycle) = self.lifecycle.try_lock_for(STATE_POLL) {
                return match &*lifecycle {
                    Lifecycle::Uninitialized(_) => BridgeState::Uninitialized,
                    Lifecycle::Ready(_) => BridgeState::Ready,
                    Lifecycle::Terminated => BridgeState::Terminated,
                };
            }
        }
    }

    /// Start the background context if it is not running yet.
    ///
    /// Idempotent. A context that fails to start leaves the instance
    /// terminated.
    pub fn ensure_context(&self) -> Result<(), BridgeError> {
        let mut lifecycle = self.lifecycle.lock();
        self.wiring(&mut lifecycle).map(|_| ())
    }

    /// Issue a request and block until its complete result is available.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Transport`] if the request never produced a response
    /// - [`BridgeError::Application`] if the endpoint returned a serialized
    ///   error (status 500 plus the error marker)
    /// - [`BridgeError::InvalidUrl`] / [`BridgeError::InvalidRequest`] if the
    ///   request is rejected before it is sent
    /// - [`BridgeError::Busy`] if another fetch is in flight
    /// - [`BridgeError::Disposed`] after [`dispose`](Self::dispose)
    /// - [`BridgeError::Correlation`] / [`BridgeError::ContextTerminated`] on
    ///   internal faults; the instance is terminated
    #[instrument(skip(self, init), fields(instance = %self.instance_id, method = %init.method))]
    pub fn fetch(&self, url: &str, init: FetchInit) -> Result<BridgeResponse, BridgeError> {
        let url = Url::parse(url).map_err(|e| BridgeError::invalid_url(url, e))?;
        init.validate()?;
        let _busy = BusyGuard::acquire(&self.busy)?;

        let mut lifecycle = self.lifecycle.lock();
        let message = match self.round_trip(&mut lifecycle, url, init) {
            Ok(message) => message,
            Err(err) => {
                if matches!(
                    err,
                    BridgeError::Correlation { .. } | BridgeError::ContextTerminated
                ) {
                    error!(error = %err, "Bridge fault, terminating instance");
                    Self::shut_down(&mut lifecycle);
                }
                return Err(err);
            }
        };
        drop(lifecycle);

        reconstruct(message)
    }

    /// Terminate the background context.
    ///
    /// Safe to call repeatedly; the instance cannot be used afterwards.
    pub fn dispose(&self) {
        let mut lifecycle = self.lifecycle.lock();
        Self::shut_down(&mut lifecycle);
    }

    fn wiring<'a>(&self, lifecycle: &'a mut Lifecycle<C>) -> Result<&'a mut Wiring, BridgeError> {
        if let Lifecycle::Uninitialized(_) = lifecycle {
            let Lifecycle::Uninitialized(connector) =
                std::mem::replace(lifecycle, Lifecycle::Terminated)
            else {
                return Err(BridgeError::Disposed);
            };

            let (endpoint, background_endpoint) = duplex();
            let short_id = self.instance_id.simple().to_string();
            let background = BackgroundContext::spawn(
                format!("fetch-bridge-{}", &short_id[..8]),
                connector,
                &self.config,
                background_endpoint,
                Arc::clone(&self.cell),
            )?;

            *lifecycle = Lifecycle::Ready(Wiring {
                endpoint,
                background,
            });
        }

        match lifecycle {
            Lifecycle::Ready(wiring) => Ok(wiring),
            Lifecycle::Uninitialized(_) | Lifecycle::Terminated => Err(BridgeError::Disposed),
        }
    }

    fn round_trip(
        &self,
        lifecycle: &mut Lifecycle<C>,
        url: Url,
        init: FetchInit,
    ) -> Result<ResponseMessage, BridgeError> {
        let wiring = self.wiring(lifecycle)?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;

        debug!(id = id, url = %url, "Sending bridged request");

        self.cell.reset();
        wiring.endpoint.send(RequestMessage {
            id,
            method: init.method.to_string(),
            url: url.into(),
            headers: init.headers,
            body: init.body,
        })?;
        self.cell.wait();

        receive_correlated(&mut wiring.endpoint, id)
    }

    fn shut_down(lifecycle: &mut Lifecycle<C>) {
        if let Lifecycle::Ready(Wiring {
            endpoint,
            mut background,
        }) = std::mem::replace(lifecycle, Lifecycle::Terminated)
        {
            // The background thread stops once its request queue closes.
            drop(endpoint);
            background.terminate();
            info!(context = %background.name(), "Bridge disposed");
        }
    }
}

impl<C: Connector> Drop for SyncFetchBridge<C> {
    fn drop(&mut self) {
        Self::shut_down(self.lifecycle.get_mut());
    }
}

impl<C: Connector> std::fmt::Debug for SyncFetchBridge<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncFetchBridge")
            .field("instance_id", &self.instance_id)
            .field("state", &self.state())
            .field("requests_sent", &self.requests_sent())
            .finish_non_exhaustive()
    }
}

/// Take the single message the cell announced and check it answers `expected`.
fn receive_correlated(
    endpoint: &mut CallerEndpoint,
    expected: RequestId,
) -> Result<ResponseMessage, BridgeError> {
    match endpoint.try_receive()? {
        Some(message) if message.id() == expected => Ok(message),
        Some(message) => Err(BridgeError::Correlation {
            expected,
            received: Some(message.id()),
        }),
        None => Err(BridgeError::Correlation {
            expected,
            received: None,
        }),
    }
}
