//! Persistent WebSocket transport.
//!
//! # Synchronization
//!
//! The connection state, the current [`ConnectionHandle`], the open-attempt
//! epoch and the last failure live together in one slot behind a
//! `tokio::sync::watch` channel. Every state change goes through that
//! channel, so a reader always sees a state and a handle that belong
//! together, and waiters are woken on each change.
//!
//! Open attempts are started only while holding the `pending` lock, which
//! also owns the task of the in-flight attempt. Starting an attempt aborts
//! the previous one and bumps the epoch; callbacks carrying an older epoch
//! are ignored.
//!
//! # Concurrent Sends
//!
//! A send that observes `Disconnected` or `Closing` starts an open attempt.
//! A send that observes `Connecting` joins the in-flight attempt. Every
//! waiting send resumes when the attempt settles, and transmits only on the
//! handle published together with `Open`.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request as ClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tracing::{debug, info, trace, warn};

use crate::config::{ReconnectPolicy, TransportConfig, TransportKind};
use crate::error::{Error, Result};

use super::connection::ConnectionHandle;
use super::event::{Diagnostics, ErrorEvent};
use super::listener::SocketEventListener;
use super::outcome::{Ack, Failure, SendResult};
use super::state::{ConnectionState, Transition};
use super::TransportRepository;

// ============================================================================
// Constants
// ============================================================================

/// Close code for a deliberate close from this side.
pub const NORMAL_CLOSURE_CODE: u16 = 1000;

/// Close reason for a deliberate close from this side.
pub const NORMAL_CLOSURE_REASON: &str = "normal closure";

// ============================================================================
// Slot
// ============================================================================

/// Connection state published through the watch channel.
///
/// Invariant: `handle` is `Some` only while `state` is `Open` or `Closing`.
#[derive(Default)]
pub(crate) struct Slot {
    state: ConnectionState,
    handle: Option<ConnectionHandle>,
    epoch: u64,
    last_error: Option<String>,
}

// ============================================================================
// SocketShared
// ============================================================================

/// State shared between the transport, its open tasks and its listeners.
pub(crate) struct SocketShared {
    config: TransportConfig,
    /// Background execution context for open and reconnect tasks.
    runtime: Handle,
    slot: watch::Sender<Slot>,
    /// Task of the in-flight open attempt.
    pending: Mutex<Option<JoinHandle<()>>>,
    diagnostics: Diagnostics,
}

impl SocketShared {
    pub(crate) fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Applies `transition` if `epoch` is still current.
    ///
    /// `install` becomes the current handle on a move to `Open`; a move to
    /// `Disconnected` discards the handle. `error` is recorded as the last
    /// failure. Returns `true` if the slot changed.
    pub(crate) fn apply(
        &self,
        epoch: u64,
        transition: Transition,
        install: Option<ConnectionHandle>,
        error: Option<&str>,
    ) -> bool {
        self.slot.send_if_modified(|slot| {
            if slot.epoch != epoch {
                trace!(epoch, current = slot.epoch, ?transition, "Stale transition ignored");
                return false;
            }

            let Some(next) = slot.state.next(transition) else {
                warn!(epoch, state = %slot.state, ?transition, "Transition rejected");
                return false;
            };

            debug!(epoch, from = %slot.state, to = %next, "Connection state changed");
            slot.state = next;

            match next {
                ConnectionState::Open => slot.handle = install,
                ConnectionState::Disconnected => slot.handle = None,
                ConnectionState::Connecting | ConnectionState::Closing => {}
            }

            if let Some(cause) = error {
                slot.last_error = Some(cause.to_owned());
            }

            true
        })
    }

    /// Publishes a failure of attempt `epoch` and applies the reconnect policy.
    pub(crate) fn report_failure(self: &Arc<Self>, epoch: u64, cause: &str) {
        self.diagnostics.emit(ErrorEvent::now(cause));

        if let ReconnectPolicy::OnFailure { delay } = self.config.reconnect() {
            debug!(epoch, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

            let owner = Arc::downgrade(self);
            self.runtime.spawn(async move {
                sleep(delay).await;
                if let Some(owner) = owner.upgrade() {
                    owner.reopen_if_idle(epoch);
                }
            });
        }
    }

    /// Starts a new open attempt, cancelling the in-flight one.
    fn open(self: &Arc<Self>) -> u64 {
        let mut pending = self.pending.lock();
        self.open_locked(&mut pending)
    }

    /// Reopens only if attempt `epoch` is still the latest and has failed.
    fn reopen_if_idle(self: &Arc<Self>, epoch: u64) {
        let mut pending = self.pending.lock();

        let idle = {
            let slot = self.slot.borrow();
            slot.epoch == epoch && slot.state == ConnectionState::Disconnected
        };

        if idle {
            info!(epoch, endpoint = %self.config.endpoint(), "Reconnecting after failure");
            self.open_locked(&mut pending);
        }
    }

    fn open_locked(self: &Arc<Self>, pending: &mut Option<JoinHandle<()>>) -> u64 {
        if let Some(task) = pending.take()
            && !task.is_finished()
        {
            debug!("Cancelling pending open attempt");
            task.abort();
        }

        let mut epoch = 0;
        self.slot.send_modify(|slot| {
            slot.epoch += 1;
            epoch = slot.epoch;
            if let Some(next) = slot.state.next(Transition::OpenRequested) {
                slot.state = next;
            }
            slot.handle = None;
            slot.last_error = None;
        });

        debug!(epoch, endpoint = %self.config.endpoint(), "Opening WebSocket connection");

        let listener = SocketEventListener::new(epoch, Arc::downgrade(self));
        let request = self.client_request();
        *pending = Some(self.runtime.spawn(run_open(request, listener)));

        epoch
    }

    /// Builds the handshake request for the configured endpoint and headers.
    fn client_request(&self) -> Result<ClientRequest> {
        let mut request = self.config.endpoint().as_str().into_client_request()?;

        for (name, value) in self.config.headers() {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("Invalid header name {name}: {e}")))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|e| Error::config(format!("Invalid value for header {name}: {e}")))?;
            request.headers_mut().append(header_name, header_value);
        }

        Ok(request)
    }

    /// Returns a handle that is ready for transmission, opening or joining
    /// an open attempt first if needed.
    async fn ready_handle(self: &Arc<Self>) -> Result<ConnectionHandle> {
        let mut rx = self.slot.subscribe();

        {
            let mut pending = self.pending.lock();

            let (state, handle) = {
                let slot = self.slot.borrow();
                (slot.state, slot.handle.clone())
            };

            if state.is_open()
                && let Some(handle) = handle
            {
                return Ok(handle);
            }

            if state.needs_open() {
                debug!(%state, "Connection not open, reopening before send");
                self.open_locked(&mut pending);
            }
        }

        let slot = rx
            .wait_for(|slot| slot.state != ConnectionState::Connecting)
            .await
            .map_err(|_| Error::ConnectionClosed)?;

        match (slot.state, &slot.handle, &slot.last_error) {
            (ConnectionState::Open, Some(handle), _) => Ok(handle.clone()),
            (_, _, Some(cause)) => Err(Error::connection(format!(
                "reconnection attempt failed: {cause}"
            ))),
            _ => Err(Error::ConnectionClosed),
        }
    }

    /// Sends a normal-closure frame on the current handle.
    async fn close(&self) -> Result<()> {
        enum Target {
            Send(ConnectionHandle),
            AlreadyClosing,
            Missing(ConnectionState),
        }

        let mut target = Target::Missing(ConnectionState::Disconnected);

        self.slot.send_if_modified(|slot| {
            let next = slot.state.next(Transition::CloseRequested);

            match (&slot.handle, next) {
                (Some(handle), Some(next)) => {
                    target = Target::Send(handle.clone());
                    debug!(epoch = slot.epoch, from = %slot.state, to = %next, "Connection state changed");
                    slot.state = next;
                    true
                }
                (Some(_), None) if slot.state == ConnectionState::Closing => {
                    target = Target::AlreadyClosing;
                    false
                }
                _ => {
                    target = Target::Missing(slot.state);
                    false
                }
            }
        });

        match target {
            Target::Send(handle) => {
                debug!(epoch = handle.epoch(), "Closing WebSocket connection");
                handle
                    .close(NORMAL_CLOSURE_CODE, NORMAL_CLOSURE_REASON)
                    .await
            }
            Target::AlreadyClosing => Ok(()),
            Target::Missing(state) => {
                warn!(%state, "Close requested without an open connection");
                Err(Error::NotConnected)
            }
        }
    }
}

impl Drop for SocketShared {
    fn drop(&mut self) {
        if let Some(task) = self.pending.get_mut().take() {
            task.abort();
        }
    }
}

/// Open task: performs the handshake and hands the result to the listener.
async fn run_open(request: Result<ClientRequest>, listener: SocketEventListener) {
    let request = match request {
        Ok(request) => request,
        Err(e) => {
            listener.on_failure(&e.to_string());
            return;
        }
    };

    match connect_async(request).await {
        Ok((ws_stream, response)) => {
            trace!(epoch = listener.epoch(), status = %response.status(), "Handshake completed");
            let handle = ConnectionHandle::new(ws_stream, listener.clone());
            listener.on_open(handle);
        }
        Err(e) => listener.on_failure(&Error::from(e).to_string()),
    }
}

// ============================================================================
// SocketTransport
// ============================================================================

/// Transport over one persistent WebSocket connection.
///
/// Holds at most one live connection at a time and reconnects lazily when a
/// send finds the connection not open.
///
/// # Example
///
/// ```no_run
/// use live_location_transport::{SocketTransport, TransportConfig, TransportRepository};
///
/// # async fn example() -> live_location_transport::Result<()> {
/// let config = TransportConfig::builder("wss://tracker.example.com/live").build()?;
/// let transport = SocketTransport::new(config)?;
///
/// transport.open_connection();
/// match transport.send_data(r#"{"lat":52.52,"lng":13.40}"#).await {
///     Ok(ack) => println!("sent as {}", ack.body),
///     Err(failure) => eprintln!("failed: {failure}"),
/// }
/// transport.close_connection().await?;
/// # Ok(())
/// # }
/// ```
pub struct SocketTransport {
    shared: Arc<SocketShared>,
}

impl SocketTransport {
    /// Creates a transport that schedules its tasks on the current runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if called outside a tokio runtime or `config` is
    ///   not a socket configuration
    pub fn new(config: TransportConfig) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|_| Error::config("SocketTransport must be created inside a Tokio runtime"))?;
        Self::with_runtime(config, runtime)
    }

    /// Creates a transport that schedules its tasks on `runtime`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is not a socket configuration.
    pub fn with_runtime(config: TransportConfig, runtime: Handle) -> Result<Self> {
        if config.kind() != TransportKind::Socket {
            return Err(Error::config(format!(
                "SocketTransport requires a socket configuration, got {:?}",
                config.kind()
            )));
        }

        let (slot, _) = watch::channel(Slot::default());

        Ok(Self {
            shared: Arc::new(SocketShared {
                config,
                runtime,
                slot,
                pending: Mutex::new(None),
                diagnostics: Diagnostics::new(),
            }),
        })
    }

    /// Current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.shared.slot.borrow().state
    }

    /// Most recent failure since the last open attempt started.
    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.shared.slot.borrow().last_error.clone()
    }

    /// Waits until the connection reaches `target`.
    ///
    /// No timeout is applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the transport is torn down.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<()> {
        let mut rx = self.shared.slot.subscribe();
        rx.wait_for(|slot| slot.state == target)
            .await
            .map(|_| ())
            .map_err(|_| Error::ConnectionClosed)
    }
}

#[async_trait]
impl TransportRepository for SocketTransport {
    fn config(&self) -> &TransportConfig {
        &self.shared.config
    }

    /// Starts an open attempt in the background and returns immediately.
    fn open_connection(&self) {
        self.shared.open();
    }

    /// Sends code 1000 "normal closure" on the current connection.
    ///
    /// Returns once the frame is written. The state reaches `Disconnected`
    /// when the remote end completes the close.
    async fn close_connection(&self) -> Result<()> {
        self.shared.close().await
    }

    async fn send_data(&self, payload: &str) -> SendResult {
        let sent = match self.shared.ready_handle().await {
            Ok(handle) => handle.transmit(payload.to_owned()).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(id) => Ok(Ack::new(id.to_string())),
            Err(e) => {
                let failure = Failure::from(e);
                warn!(reason = %failure, "Socket send failed");
                Err(failure)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ErrorEvent> {
        self.shared.diagnostics.subscribe()
    }
}

impl std::fmt::Debug for SocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketTransport")
            .field("endpoint", &self.shared.config.endpoint().as_str())
            .field("state", &self.state())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
