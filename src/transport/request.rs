//! Stateless request/response transport.
//!
//! Each send is one independent `POST` with a `text/plain` body. There is
//! no connection to manage: open and close do nothing.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tokio::sync::broadcast;
use tracing::{debug, error, trace, warn};

use crate::config::{TransportConfig, TransportKind};
use crate::error::{Error, Result};

use super::event::{Diagnostics, ErrorEvent};
use super::http::{HttpClient, HttpRequest, TEXT_PLAIN};
use super::outcome::{Ack, Failure, SendResult};
use super::TransportRepository;

// ============================================================================
// Constants
// ============================================================================

/// Ack body used when a successful response has no body.
///
/// A zero-length body counts as no body: an empty 2xx response yields this
/// text rather than an empty [`Ack`](super::Ack).
pub const EMPTY_BODY_PLACEHOLDER: &str = "nothing to show";

// ============================================================================
// RequestTransport
// ============================================================================

/// Transport issuing one HTTP request per payload.
pub struct RequestTransport {
    config: TransportConfig,
    client: Arc<dyn HttpClient>,
    diagnostics: Diagnostics,
}

impl RequestTransport {
    /// Creates a transport that sends through `client`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` is not a request configuration.
    pub fn new(config: TransportConfig, client: Arc<dyn HttpClient>) -> Result<Self> {
        if config.kind() != TransportKind::Request {
            return Err(Error::config(format!(
                "RequestTransport requires a request configuration, got {:?}",
                config.kind()
            )));
        }

        Ok(Self {
            config,
            client,
            diagnostics: Diagnostics::new(),
        })
    }

    /// Creates a transport backed by a default [`reqwest::Client`].
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if `config` is not a request configuration
    /// - [`Error::Http`] if the client cannot be built
    pub fn with_reqwest(config: TransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Self::new(config, Arc::new(client))
    }

    /// Builds the request carrying `payload` and every configured header.
    fn build_request(&self, payload: &str) -> HttpRequest {
        HttpRequest {
            method: Method::POST,
            url: self.config.endpoint().clone(),
            headers: self
                .config
                .headers()
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            content_type: TEXT_PLAIN,
            body: payload.to_owned(),
        }
    }
}

#[async_trait]
impl TransportRepository for RequestTransport {
    fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// No-op: there is no connection to open.
    fn open_connection(&self) {
        trace!("open_connection is a no-op for the request transport");
    }

    /// No-op: there is no connection to close.
    async fn close_connection(&self) -> Result<()> {
        trace!("close_connection is a no-op for the request transport");
        Ok(())
    }

    async fn send_data(&self, payload: &str) -> SendResult {
        let request = self.build_request(payload);
        debug!(endpoint = %request.url, bytes = payload.len(), "Posting payload");

        match self.client.execute(request).await {
            Ok(response) if response.is_success() => {
                let body = if response.body.is_empty() {
                    EMPTY_BODY_PLACEHOLDER.to_owned()
                } else {
                    response.body
                };
                Ok(Ack::new(body))
            }
            Ok(response) => {
                warn!(status = response.status, message = %response.status_message, "Request rejected");
                Err(Error::protocol(response.status, response.status_message).into())
            }
            Err(e) => {
                let failure = Failure::from_error(&e);
                error!(reason = %failure, "Request failed");
                self.diagnostics.emit(ErrorEvent::now(failure.reason.clone()));
                Err(failure)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<ErrorEvent> {
        self.diagnostics.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================
