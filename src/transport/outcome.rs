//! Send outcomes.
//!
//! Every send resolves to a [`SendResult`]: an [`Ack`] carrying a
//! confirmation or response body, or a [`Failure`] carrying a human-readable
//! reason. Raw errors never reach the caller.

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Reason used when an error carries no usable message.
pub const UNKNOWN_ERROR: &str = "unknown error";

// ============================================================================
// Types
// ============================================================================

/// Outcome of a single send.
pub type SendResult = StdResult<Ack, Failure>;

// ============================================================================
// Ack
// ============================================================================

/// Successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// Transmission ID (socket) or response body (request).
    pub body: String,
}

impl Ack {
    /// Creates an acknowledgement.
    #[inline]
    #[must_use]
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }
}

// ============================================================================
// Failure
// ============================================================================

/// Failed send with the most specific diagnostic available.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Failure {
    /// Human-readable reason.
    pub reason: String,
}

impl Failure {
    /// Creates a failure with an explicit reason.
    #[inline]
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Extracts a reason from an error.
    ///
    /// Order: the error's own message, else its source's message, else
    /// [`UNKNOWN_ERROR`].
    #[must_use]
    pub fn from_error(err: &(dyn StdError + 'static)) -> Self {
        let message = err.to_string();
        if !message.trim().is_empty() {
            return Self::new(message);
        }

        if let Some(source) = err.source() {
            let message = source.to_string();
            if !message.trim().is_empty() {
                return Self::new(message);
            }
        }

        Self::new(UNKNOWN_ERROR)
    }
}

impl From<crate::Error> for Failure {
    fn from(err: crate::Error) -> Self {
        Self::from_error(&err)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::fmt;

    /// Error with a configurable message and optional source.
    #[derive(Debug)]
    struct Opaque {
        message: &'static str,
        source: Option<Box<Opaque>>,
    }

    impl fmt::Display for Opaque {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.message)
        }
    }

    impl StdError for Opaque {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.source.as_deref().map(|s| s as &(dyn StdError + 'static))
        }
    }

    #[test]
    fn test_prefers_own_message() {
        let err = Opaque {
            message: "socket reset",
            source: Some(Box::new(Opaque {
                message: "broken pipe",
                source: None,
            })),
        };
        assert_eq!(Failure::from_error(&err).reason, "socket reset");
    }

    #[test]
    fn test_falls_back_to_source_message() {
        let err = Opaque {
            message: "",
            source: Some(Box::new(Opaque {
                message: "broken pipe",
                source: None,
            })),
        };
        assert_eq!(Failure::from_error(&err).reason, "broken pipe");
    }

    #[test]
    fn test_falls_back_to_unknown() {
        let err = Opaque {
            message: " ",
            source: Some(Box::new(Opaque {
                message: "",
                source: None,
            })),
        };
        assert_eq!(Failure::from_error(&err).reason, UNKNOWN_ERROR);

        let bare = Opaque {
            message: "",
            source: None,
        };
        assert_eq!(Failure::from_error(&bare).reason, UNKNOWN_ERROR);
    }

    #[test]
    fn test_from_crate_error() {
        let failure: Failure = crate::Error::protocol(503, "Service Unavailable").into();
        assert_eq!(failure.reason, "Service Unavailable");
        assert_eq!(failure.to_string(), "Service Unavailable");
    }
}
