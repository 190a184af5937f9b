//! Diagnostic error events.
//!
//! Every connection failure is published as an [`ErrorEvent`] on a broadcast
//! channel. Consumption (logging, metrics, alerting) is left to subscribers;
//! events published while nobody is subscribed are dropped.

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

// ============================================================================
// Constants
// ============================================================================

/// Events buffered per subscriber before the oldest are overwritten.
const DIAGNOSTICS_CAPACITY: usize = 64;

// ============================================================================
// ErrorEvent
// ============================================================================

/// A recorded transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    /// Unix time in milliseconds when the failure was observed.
    pub timestamp_ms: u64,
    /// Most specific diagnostic available for the failure.
    pub message: String,
}

impl ErrorEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn now(message: impl Into<String>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        Self {
            timestamp_ms,
            message: message.into(),
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Publishing side of the diagnostic stream.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    tx: broadcast::Sender<ErrorEvent>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl Diagnostics {
    /// Creates a diagnostic channel with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(DIAGNOSTICS_CAPACITY);
        Self { tx }
    }

    /// Publishes an event to all current subscribers.
    pub fn emit(&self, event: ErrorEvent) {
        if self.tx.send(event).is_err() {
            trace!("Error event dropped, no subscribers");
        }
    }

    /// Subscribes to events published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ErrorEvent> {
        self.tx.subscribe()
    }

    /// Number of live subscribers.
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_now_is_stamped() {
        let event = ErrorEvent::now("refused");
        assert!(event.timestamp_ms > 0);
        assert_eq!(event.message, "refused");
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = ErrorEvent {
            timestamp_ms: 42,
            message: "boom".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"timestampMs":42,"message":"boom"}"#);
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let diagnostics = Diagnostics::new();
        let mut rx = diagnostics.subscribe();
        assert_eq!(diagnostics.subscriber_count(), 1);

        diagnostics.emit(ErrorEvent::now("first"));
        diagnostics.emit(ErrorEvent::now("second"));

        assert_eq!(rx.recv().await.unwrap().message, "first");
        assert_eq!(rx.recv().await.unwrap().message, "second");
    }

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let diagnostics = Diagnostics::new();
        diagnostics.emit(ErrorEvent::now("nobody listens"));
        assert_eq!(diagnostics.subscriber_count(), 0);
    }
}
