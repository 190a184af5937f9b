//! Type-safe identifiers.
//!
//! Newtype wrappers keep transport-minted IDs distinct from arbitrary strings.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// TransmissionId
// ============================================================================

/// Identifier minted for every payload accepted by a socket connection.
///
/// Its string form is the confirmation carried by a socket [`Ack`](crate::Ack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransmissionId(Uuid);

impl TransmissionId {
    /// Generates a new random transmission ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for TransmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(TransmissionId::generate(), TransmissionId::generate());
    }

    #[test]
    fn test_display_is_uuid() {
        let id = TransmissionId::generate();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
        assert!(Uuid::parse_str(&id.to_string()).is_ok());
    }
}
