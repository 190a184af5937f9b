//! Socket event listener.
//!
//! Translates socket callbacks into [`Transition`]s applied at the owning
//! transport's single update point. Each listener is bound to the open
//! attempt (epoch) that created it, so callbacks from a superseded
//! connection cannot disturb the current one.

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Weak};

use tracing::{debug, error};

use super::connection::ConnectionHandle;
use super::socket::SocketShared;
use super::state::Transition;

// ============================================================================
// SocketEventListener
// ============================================================================

/// Callback sink for one socket connection attempt.
///
/// Holds only a weak reference to its transport: a dropped transport turns
/// every callback into a no-op.
#[derive(Clone)]
pub struct SocketEventListener {
    /// Open attempt this listener belongs to.
    epoch: u64,
    /// Owning transport state.
    owner: Weak<SocketShared>,
}

impl SocketEventListener {
    /// Creates a listener for open attempt `epoch`.
    pub(crate) fn new(epoch: u64, owner: Weak<SocketShared>) -> Self {
        Self { epoch, owner }
    }

    /// Open attempt this listener belongs to.
    #[inline]
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Handshake completed: installs `handle` and moves to `Open`.
    ///
    /// Returns `false` if the attempt was superseded; the handle is then
    /// dropped, which releases its socket.
    pub(crate) fn on_open(&self, handle: ConnectionHandle) -> bool {
        let Some(owner) = self.owner() else {
            return false;
        };

        let installed = owner.apply(self.epoch, Transition::Opened, Some(handle), None);
        if installed {
            debug!(epoch = self.epoch, endpoint = %owner.config().endpoint(), "WebSocket opened");
        } else {
            debug!(epoch = self.epoch, "Superseded connection discarded");
        }
        installed
    }

    /// Text frame received.
    ///
    /// Inbound payloads are not delivered anywhere; they are only logged.
    pub fn on_message(&self, text: &str) {
        debug!(epoch = self.epoch, len = text.len(), message = %text, "WebSocket message");
    }

    /// I/O error or abnormal close.
    ///
    /// Moves to `Disconnected`, records `cause` as the last error, emits an
    /// [`ErrorEvent`](super::ErrorEvent) and applies the reconnect policy.
    pub fn on_failure(&self, cause: &str) {
        let Some(owner) = self.owner() else {
            return;
        };

        if !owner.apply(self.epoch, Transition::Failed, None, Some(cause)) {
            return;
        }

        error!(epoch = self.epoch, cause = %cause, "WebSocket failed");
        owner.report_failure(self.epoch, cause);
    }

    /// Connection closed with `code` and `reason`.
    pub fn on_closed(&self, code: u16, reason: &str) {
        let Some(owner) = self.owner() else {
            return;
        };

        if owner.apply(self.epoch, Transition::Closed, None, None) {
            debug!(epoch = self.epoch, code, reason = %reason, "WebSocket closed");
        }
    }

    fn owner(&self) -> Option<Arc<SocketShared>> {
        self.owner.upgrade()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orphaned_listener_is_noop() {
        let listener = SocketEventListener::new(7, Weak::new());
        assert_eq!(listener.epoch(), 7);

        listener.on_message("hello");
        listener.on_failure("boom");
        listener.on_closed(1000, "normal closure");
    }
}
