//! Live WebSocket connection and its I/O event loop.
//!
//! A [`ConnectionHandle`] is the only way to write to an established socket.
//! Creating one spawns a tokio task that owns the stream and handles:
//!
//! - Outgoing payloads and close frames from the owning transport
//! - Incoming frames, translated into listener callbacks
//!
//! The loop is the single writer, so transmissions on one handle are
//! serialized. Dropping every clone of a handle ends the loop and releases
//! the socket without a close frame.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::TransmissionId;

use super::listener::SocketEventListener;

// ============================================================================
// Constants
// ============================================================================

/// Close code reported when the remote close frame carries no status.
const NO_STATUS_RECEIVED: u16 = 1005;

// ============================================================================
// Types
// ============================================================================

/// Client-side WebSocket stream.
pub(crate) type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write one text frame.
    Transmit {
        id: TransmissionId,
        payload: String,
        done_tx: oneshot::Sender<Result<()>>,
    },
    /// Write a close frame and wait for the remote close.
    Close {
        code: u16,
        reason: String,
        done_tx: oneshot::Sender<Result<()>>,
    },
}

// ============================================================================
// ConnectionHandle
// ============================================================================

/// Handle to one established socket connection.
///
/// Cheap to clone. A new handle is created on every reconnect; handles are
/// never repointed at another socket.
#[derive(Clone)]
pub struct ConnectionHandle {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Open attempt that produced this handle.
    epoch: u64,
}

impl ConnectionHandle {
    /// Wraps an established stream and spawns its event loop.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn new(ws_stream: SocketStream, listener: SocketEventListener) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let epoch = listener.epoch();

        tokio::spawn(Self::run_event_loop(ws_stream, command_rx, listener));

        Self { command_tx, epoch }
    }

    /// Open attempt that produced this handle.
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Returns `true` once the event loop has terminated.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Writes `payload` as a text frame.
    ///
    /// Resolves once the frame has been flushed to the socket.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the event loop has ended
    /// - [`Error::WebSocket`] if the write fails
    pub async fn transmit(&self, payload: String) -> Result<TransmissionId> {
        let id = TransmissionId::generate();
        let (done_tx, done_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Transmit {
                id,
                payload,
                done_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        done_rx.await.map_err(|_| Error::ConnectionClosed)??;
        Ok(id)
    }

    /// Writes a close frame with `code` and `reason`.
    ///
    /// Resolves once the frame is written; the connection is fully closed
    /// when the listener reports the remote close.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionClosed`] if the event loop has ended
    /// - [`Error::WebSocket`] if the write fails
    pub async fn close(&self, code: u16, reason: impl Into<String>) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();

        self.command_tx
            .send(ConnectionCommand::Close {
                code,
                reason: reason.into(),
                done_tx,
            })
            .map_err(|_| Error::ConnectionClosed)?;

        done_rx.await.map_err(|_| Error::ConnectionClosed)?
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: SocketStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        listener: SocketEventListener,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            listener.on_message(text.as_str());
                        }

                        Some(Ok(Message::Close(frame))) => {
                            // Push out the close reply queued by tungstenite.
                            let _ = ws_write.flush().await;

                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.as_str().to_owned()))
                                .unwrap_or((NO_STATUS_RECEIVED, String::new()));

                            listener.on_closed(code, &reason);
                            break;
                        }

                        Some(Err(e)) => {
                            listener.on_failure(&Error::from(e).to_string());
                            break;
                        }

                        None => {
                            listener.on_failure("connection reset without closing handshake");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Transmit { id, payload, done_tx }) => {
                            let bytes = payload.len();
                            let sent = ws_write.send(Message::Text(payload.into())).await;

                            if !Self::complete(sent, done_tx, &listener) {
                                break;
                            }
                            trace!(%id, bytes, "Payload transmitted");
                        }

                        Some(ConnectionCommand::Close { code, reason, done_tx }) => {
                            let frame = CloseFrame {
                                code: CloseCode::from(code),
                                reason: reason.into(),
                            };
                            let sent = ws_write.send(Message::Close(Some(frame))).await;

                            if !Self::complete(sent, done_tx, &listener) {
                                break;
                            }
                            debug!(code, epoch = listener.epoch(), "Close frame sent");
                        }

                        None => {
                            debug!(epoch = listener.epoch(), "Handle discarded");
                            break;
                        }
                    }
                }
            }
        }

        trace!(epoch = listener.epoch(), "Event loop terminated");
    }

    /// Reports a write outcome to its caller.
    ///
    /// A failed write also goes to the listener. Returns `false` if the loop
    /// must stop.
    fn complete(
        sent: std::result::Result<(), tokio_tungstenite::tungstenite::Error>,
        done_tx: oneshot::Sender<Result<()>>,
        listener: &SocketEventListener,
    ) -> bool {
        match sent {
            Ok(()) => {
                let _ = done_tx.send(Ok(()));
                true
            }
            Err(e) => {
                let err = Error::from(e);
                listener.on_failure(&err.to_string());
                let _ = done_tx.send(Err(err));
                false
            }
        }
    }
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("epoch", &self.epoch)
            .field("closed", &self.is_closed())
            .finish()
    }
}
