//! Transport configuration.
//!
//! A [`TransportConfig`] is immutable once built and selects which transport
//! strategy a repository uses.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TransportConfig`] | Endpoint, headers, strategy and reconnect policy |
//! | [`TransportConfigBuilder`] | Fluent configuration builder |
//! | [`TransportKind`] | Persistent socket or stateless request |
//! | [`ReconnectPolicy`] | Caller-driven or self-healing reconnection |
//!
//! # Example
//!
//! ```no_run
//! use live_location_transport::{Result, TransportConfig, TransportKind};
//!
//! # fn example() -> Result<()> {
//! let config = TransportConfig::builder("https://tracker.example.com/location")
//!     .kind(TransportKind::Request)
//!     .header("X-Device", "courier-17")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for transport configuration.
pub mod builder;

/// Configuration types and JSON loading.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::TransportConfigBuilder;
pub use options::{ReconnectPolicy, TransportConfig, TransportKind};
