//! Live location transport - one send contract over two transports.
//!
//! A location-reporting client sends opaque string payloads and gets back
//! an [`Ack`] or a [`Failure`]. Which transport carries them is chosen at
//! configuration time:
//!
//! - **Socket**: one persistent WebSocket connection, opened on demand and
//!   reopened lazily when a send finds it closed
//! - **Request**: one independent HTTP `POST` per payload
//!
//! # Quick Start
//!
//! ```no_run
//! use live_location_transport::{Result, TransportConfig, repository};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = TransportConfig::builder("wss://tracker.example.com/live")
//!         .header("Authorization", "Bearer token")
//!         .build()?;
//!
//!     let transport = repository(config)?;
//!     let mut diagnostics = transport.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = diagnostics.recv().await {
//!             eprintln!("[{}] {}", event.timestamp_ms, event.message);
//!         }
//!     });
//!
//!     transport.open_connection();
//!     match transport.send_data(r#"{"lat":52.52,"lng":13.40}"#).await {
//!         Ok(ack) => println!("acknowledged: {}", ack.body),
//!         Err(failure) => println!("failed: {}", failure.reason),
//!     }
//!
//!     transport.close_connection().await
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | [`TransportConfig`] and its builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`transport`] | [`TransportRepository`] and both transports |

// ============================================================================
// Modules
// ============================================================================

/// Transport configuration.
pub mod config;

/// Error types and result aliases.
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Transport repository and implementations.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::{ReconnectPolicy, TransportConfig, TransportConfigBuilder, TransportKind};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::TransmissionId;

// Transport types
pub use transport::{
    Ack, ConnectionState, ErrorEvent, Failure, HttpClient, HttpRequest, HttpResponse,
    RequestTransport, SendResult, SocketTransport, TransportRepository, repository,
    repository_with_client,
};
