//! Transport configuration types.
//!
//! # JSON Format
//!
//! ```json
//! {
//!   "endpoint": "wss://tracker.example.com/live",
//!   "headers": { "Authorization": "Bearer token" },
//!   "kind": "socket",
//!   "reconnectDelayMs": 1000
//! }
//! ```
//!
//! Only `endpoint` is required. `kind` defaults to `socket`; a present
//! `reconnectDelayMs` selects [`ReconnectPolicy::OnFailure`].

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

use super::builder::TransportConfigBuilder;

// ============================================================================
// Types
// ============================================================================

/// Header set sent with every connection request or HTTP request.
pub type Headers = FxHashMap<String, String>;

// ============================================================================
// TransportKind
// ============================================================================

/// Payload-delivery strategy, selected at configuration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Persistent bidirectional WebSocket connection.
    #[default]
    Socket,
    /// One independent HTTP `POST` per payload.
    Request,
}

impl TransportKind {
    /// URL schemes accepted for this transport.
    #[inline]
    #[must_use]
    pub const fn schemes(self) -> &'static [&'static str] {
        match self {
            Self::Socket => &["ws", "wss"],
            Self::Request => &["http", "https"],
        }
    }

    /// Returns `true` if `scheme` is valid for this transport.
    #[inline]
    #[must_use]
    pub fn accepts_scheme(self, scheme: &str) -> bool {
        self.schemes().contains(&scheme)
    }
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// What a socket transport does after its connection fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Stay disconnected until the next send observes it.
    #[default]
    Manual,
    /// Reopen in the background `delay` after each failure.
    OnFailure {
        /// Pause before the reopen attempt.
        delay: Duration,
    },
}

// ============================================================================
// TransportConfig
// ============================================================================

/// Immutable configuration of one transport repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    endpoint: Url,
    headers: Headers,
    kind: TransportKind,
    reconnect: ReconnectPolicy,
}

/// On-disk representation, validated into [`TransportConfig`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawConfig {
    endpoint: String,
    #[serde(default)]
    headers: Headers,
    #[serde(default)]
    kind: TransportKind,
    #[serde(default)]
    reconnect_delay_ms: Option<u64>,
}

impl TransportConfig {
    /// Starts a builder for the given endpoint.
    #[inline]
    #[must_use]
    pub fn builder(endpoint: impl Into<String>) -> TransportConfigBuilder {
        TransportConfigBuilder::new(endpoint)
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the document is malformed
    /// - [`Error::Url`] or [`Error::Config`] if validation fails
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;

        let reconnect = match raw.reconnect_delay_ms {
            Some(ms) => ReconnectPolicy::OnFailure {
                delay: Duration::from_millis(ms),
            },
            None => ReconnectPolicy::Manual,
        };

        Self::validated(&raw.endpoint, raw.headers, raw.kind, reconnect)
    }

    /// Validates all parts and assembles the configuration.
    pub(crate) fn validated(
        endpoint: &str,
        headers: Headers,
        kind: TransportKind,
        reconnect: ReconnectPolicy,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;

        if !kind.accepts_scheme(endpoint.scheme()) {
            return Err(Error::config(format!(
                "{kind:?} transport requires one of {:?}, got '{}'",
                kind.schemes(),
                endpoint.scheme()
            )));
        }

        for (name, value) in &headers {
            HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::config(format!("Invalid header name: {name}")))?;
            HeaderValue::from_str(value)
                .map_err(|_| Error::config(format!("Invalid value for header {name}")))?;
        }

        Ok(Self {
            endpoint,
            headers,
            kind,
            reconnect,
        })
    }

    /// Target endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Headers attached to every request.
    #[inline]
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Selected transport strategy.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Reconnection policy for the socket transport.
    #[inline]
    #[must_use]
    pub const fn reconnect(&self) -> ReconnectPolicy {
        self.reconnect
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_schemes() {
        assert!(TransportKind::Socket.accepts_scheme("wss"));
        assert!(!TransportKind::Socket.accepts_scheme("https"));
        assert!(TransportKind::Request.accepts_scheme("http"));
        assert!(!TransportKind::Request.accepts_scheme("ws"));
    }

    #[test]
    fn test_from_json_minimal() {
        let config = TransportConfig::from_json(r#"{"endpoint": "ws://127.0.0.1:9000/live"}"#)
            .expect("valid config");

        assert_eq!(config.kind(), TransportKind::Socket);
        assert_eq!(config.reconnect(), ReconnectPolicy::Manual);
        assert!(config.headers().is_empty());
        assert_eq!(config.endpoint().port(), Some(9000));
    }

    #[test]
    fn test_from_json_full() {
        let json = r#"{
            "endpoint": "https://tracker.example.com/location",
            "headers": { "Authorization": "Bearer abc" },
            "kind": "request",
            "reconnectDelayMs": 250
        }"#;

        let config = TransportConfig::from_json(json).expect("valid config");

        assert_eq!(config.kind(), TransportKind::Request);
        assert_eq!(
            config.headers().get("Authorization").map(String::as_str),
            Some("Bearer abc")
        );
        assert_eq!(
            config.reconnect(),
            ReconnectPolicy::OnFailure {
                delay: Duration::from_millis(250)
            }
        );
    }

    #[test]
    fn test_from_json_rejects_unknown_fields() {
        let result = TransportConfig::from_json(r#"{"endpoint": "ws://a", "retries": 3}"#);
        assert!(matches!(result, Err(Error::Json(_))));
    }

    #[test]
    fn test_from_json_rejects_scheme_mismatch() {
        let result =
            TransportConfig::from_json(r#"{"endpoint": "https://a.example", "kind": "socket"}"#);
        let err = result.unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("https"));
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let mut headers = Headers::default();
        headers.insert("bad header".into(), "v".into());

        let result = TransportConfig::validated(
            "ws://127.0.0.1:1",
            headers,
            TransportKind::Socket,
            ReconnectPolicy::Manual,
        );

        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
