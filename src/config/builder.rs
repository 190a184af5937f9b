//! Builder pattern for transport configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use live_location_transport::{ReconnectPolicy, TransportConfig};
//!
//! # fn example() -> live_location_transport::Result<()> {
//! let config = TransportConfig::builder("wss://tracker.example.com/live")
//!     .header("Authorization", "Bearer token")
//!     .reconnect(ReconnectPolicy::OnFailure {
//!         delay: Duration::from_secs(2),
//!     })
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use crate::error::Result;

use super::options::{Headers, ReconnectPolicy, TransportConfig, TransportKind};

// ============================================================================
// TransportConfigBuilder
// ============================================================================

/// Builder for a [`TransportConfig`].
///
/// Use [`TransportConfig::builder()`] to create a new builder.
#[derive(Debug, Clone)]
pub struct TransportConfigBuilder {
    /// Raw endpoint, parsed on build.
    endpoint: String,
    /// Headers, validated on build.
    headers: Headers,
    /// Transport strategy.
    kind: TransportKind,
    /// Socket reconnection policy.
    reconnect: ReconnectPolicy,
}

// ============================================================================
// TransportConfigBuilder Implementation
// ============================================================================

impl TransportConfigBuilder {
    /// Creates a builder for `endpoint` with no headers, socket transport
    /// and manual reconnection.
    #[inline]
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            headers: Headers::default(),
            kind: TransportKind::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    /// Adds a header, replacing any previous value for the same name.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds every header from `headers`.
    #[must_use]
    pub fn headers<K, V>(mut self, headers: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Selects the transport strategy.
    #[inline]
    #[must_use]
    pub fn kind(mut self, kind: TransportKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the socket reconnection policy.
    #[inline]
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`](crate::Error::Url) if the endpoint does not parse
    /// - [`Error::Config`](crate::Error::Config) if the scheme does not match
    ///   the transport kind or a header is invalid
    pub fn build(self) -> Result<TransportConfig> {
        TransportConfig::validated(&self.endpoint, self.headers, self.kind, self.reconnect)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[test]
    fn test_new_has_defaults() {
        let builder = TransportConfigBuilder::new("ws://127.0.0.1:1");
        assert!(builder.headers.is_empty());
        assert_eq!(builder.kind, TransportKind::Socket);
        assert_eq!(builder.reconnect, ReconnectPolicy::Manual);
    }

    #[test]
    fn test_header_overrides_same_name() {
        let builder = TransportConfigBuilder::new("ws://127.0.0.1:1")
            .header("X-Device", "a")
            .header("X-Device", "b");
        assert_eq!(builder.headers.len(), 1);
        assert_eq!(builder.headers["X-Device"], "b");
    }

    #[test]
    fn test_headers_extends() {
        let builder = TransportConfigBuilder::new("ws://127.0.0.1:1")
            .headers([("A", "1"), ("B", "2")])
            .header("C", "3");
        assert_eq!(builder.headers.len(), 3);
    }

    #[test]
    fn test_build_request_kind() {
        let config = TransportConfigBuilder::new("http://127.0.0.1:8080/loc")
            .kind(TransportKind::Request)
            .reconnect(ReconnectPolicy::OnFailure {
                delay: Duration::from_millis(10),
            })
            .build()
            .expect("valid config");

        assert_eq!(config.kind(), TransportKind::Request);
        assert_eq!(config.endpoint().path(), "/loc");
    }

    #[test]
    fn test_build_fails_on_bad_url() {
        let result = TransportConfigBuilder::new("not a url").build();
        assert!(result.unwrap_err().is_config_error());
    }

    #[test]
    fn test_build_fails_on_scheme_mismatch() {
        let result = TransportConfigBuilder::new("ws://127.0.0.1:1")
            .kind(TransportKind::Request)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_fails_on_bad_header_value() {
        let result = TransportConfigBuilder::new("ws://127.0.0.1:1")
            .header("X-Device", "line\nbreak")
            .build();
        assert!(result.is_err());
    }
}
