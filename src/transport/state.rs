//! Socket connection state machine.
//!
//! ```text
//!                 open                 on_open
//! Disconnected ─────────► Connecting ─────────► Open
//!      ▲                      │                 │  │
//!      │   on_closed/failure  │                 │  │ close()
//!      ├──────────────────────┘                 │  ▼
//!      │          on_closed/failure             │ Closing
//!      ├────────────────────────────────────────┘  │
//!      │                 on_closed/failure          │
//!      └────────────────────────────────────────────┘
//! ```
//!
//! There is no terminal state. An explicit open is accepted from every
//! state and supersedes whatever connection existed.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of one socket transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No live connection.
    #[default]
    Disconnected,
    /// An open attempt is in flight.
    Connecting,
    /// Handshake confirmed, payloads may be transmitted.
    Open,
    /// A normal-closure frame was sent, waiting for the remote close.
    Closing,
}

// ============================================================================
// Transition
// ============================================================================

/// Inputs that move a [`ConnectionState`].
///
/// `OpenRequested` and `CloseRequested` come from explicit calls; the
/// remaining inputs come only from the socket event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// `open_connection()` was called.
    OpenRequested,
    /// Listener: handshake completed.
    Opened,
    /// `close_connection()` was called.
    CloseRequested,
    /// Listener: connection closed.
    Closed,
    /// Listener: I/O error or abnormal close.
    Failed,
}

impl ConnectionState {
    /// Returns the state after `transition`, or `None` if the transition is
    /// not allowed from this state.
    #[must_use]
    pub const fn next(self, transition: Transition) -> Option<Self> {
        match (self, transition) {
            (_, Transition::OpenRequested) => Some(Self::Connecting),
            (Self::Connecting, Transition::Opened) => Some(Self::Open),
            (Self::Open, Transition::CloseRequested) => Some(Self::Closing),
            (Self::Disconnected, Transition::Closed | Transition::Failed) => None,
            (_, Transition::Closed | Transition::Failed) => Some(Self::Disconnected),
            _ => None,
        }
    }

    /// Returns `true` if payloads may be transmitted.
    #[inline]
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if a send must (re)open the connection first.
    ///
    /// `Connecting` is excluded: callers join the in-flight attempt instead.
    #[inline]
    #[must_use]
    pub const fn needs_open(self) -> bool {
        matches!(self, Self::Disconnected | Self::Closing)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================
