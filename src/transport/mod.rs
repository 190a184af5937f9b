//! Transport layer.
//!
//! Both transports implement [`TransportRepository`]: send a payload, get an
//! [`Ack`] or a [`Failure`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐   open/close/send   ┌─────────────────────┐
//! │     Caller       │────────────────────►│ TransportRepository │
//! └──────────────────┘                     └──────────┬──────────┘
//!                                     ┌───────────────┴──────────────┐
//!                                     ▼                              ▼
//!                           ┌──────────────────┐           ┌──────────────────┐
//!                           │ SocketTransport  │           │ RequestTransport │
//!                           │  state machine   │           │  POST per send   │
//!                           │  ConnectionHandle│           │  HttpClient      │
//!                           └──────────────────┘           └──────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `state` | Connection state machine |
//! | `event` | Diagnostic error events |
//! | `listener` | Socket callbacks to state transitions |
//! | `connection` | Live WebSocket connection and event loop |
//! | `socket` | Persistent WebSocket transport |
//! | `http` | HTTP client capability |
//! | `request` | Stateless HTTP transport |
//! | `outcome` | Send outcomes |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::config::{TransportConfig, TransportKind};
use crate::error::Result;

// ============================================================================
// Submodules
// ============================================================================

/// Live WebSocket connection and event loop.
pub mod connection;

/// Diagnostic error events.
pub mod event;

/// HTTP client capability.
pub mod http;

/// Socket callbacks to state transitions.
pub mod listener;

/// Send outcomes.
pub mod outcome;

/// Stateless HTTP transport.
pub mod request;

/// Persistent WebSocket transport.
pub mod socket;

/// Connection state machine.
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::ConnectionHandle;
pub use event::{Diagnostics, ErrorEvent};
pub use http::{HttpClient, HttpRequest, HttpResponse};
pub use listener::SocketEventListener;
pub use outcome::{Ack, Failure, SendResult, UNKNOWN_ERROR};
pub use request::RequestTransport;
pub use socket::{NORMAL_CLOSURE_CODE, NORMAL_CLOSURE_REASON, SocketTransport};
pub use state::{ConnectionState, Transition};

// ============================================================================
// TransportRepository
// ============================================================================

/// Uniform contract over every transport.
#[async_trait]
pub trait TransportRepository: Send + Sync {
    /// Configuration this repository was built from.
    fn config(&self) -> &TransportConfig;

    /// Requests transport-specific setup.
    ///
    /// Returns immediately; completion is not awaited.
    fn open_connection(&self);

    /// Terminates any live connection with a normal-closure signal.
    ///
    /// # Errors
    ///
    /// Returns an error if a close was required but could not be sent.
    async fn close_connection(&self) -> Result<()>;

    /// Sends one payload.
    ///
    /// May suspend on network I/O. Never panics or returns a raw error: every
    /// failure is a [`Failure`] with a readable reason.
    async fn send_data(&self, payload: &str) -> SendResult;

    /// Subscribes to diagnostic [`ErrorEvent`]s.
    fn subscribe(&self) -> broadcast::Receiver<ErrorEvent>;
}

// ============================================================================
// Factory
// ============================================================================

/// Builds the repository selected by `config.kind()`.
///
/// The request transport gets a default [`reqwest::Client`].
///
/// # Errors
///
/// - [`Error::Config`](crate::Error::Config) for a socket transport created
///   outside a tokio runtime
/// - [`Error::Http`](crate::Error::Http) if the HTTP client cannot be built
pub fn repository(config: TransportConfig) -> Result<Box<dyn TransportRepository>> {
    match config.kind() {
        TransportKind::Socket => Ok(Box::new(SocketTransport::new(config)?)),
        TransportKind::Request => Ok(Box::new(RequestTransport::with_reqwest(config)?)),
    }
}

/// Builds the repository selected by `config.kind()`, sending HTTP requests
/// through `client`.
///
/// # Errors
///
/// Returns [`Error::Config`](crate::Error::Config) for a socket transport
/// created outside a tokio runtime.
pub fn repository_with_client(
    config: TransportConfig,
    client: Arc<dyn HttpClient>,
) -> Result<Box<dyn TransportRepository>> {
    match config.kind() {
        TransportKind::Socket => Ok(Box::new(SocketTransport::new(config)?)),
        TransportKind::Request => Ok(Box::new(RequestTransport::new(config, client)?)),
    }
}

// ============================================================================
// Tests
// ============================================================================
