//! HTTP client capability.
//!
//! The stateless transport does not construct its own client; it is handed
//! an [`HttpClient`]. [`reqwest::Client`] implements the trait, and tests
//! substitute scripted clients.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use tracing::trace;
use url::Url;

use crate::error::Result;

// ============================================================================
// Constants
// ============================================================================

/// Content type of every payload body.
pub const TEXT_PLAIN: &str = "text/plain";

// ============================================================================
// HttpRequest / HttpResponse
// ============================================================================

/// A fully built request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Target URL.
    pub url: Url,
    /// Headers in the order they are applied.
    pub headers: Vec<(String, String)>,
    /// Value of the `Content-Type` header.
    pub content_type: &'static str,
    /// Request body.
    pub body: String,
}

/// A received response with its body read to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Numeric status code.
    pub status: u16,
    /// Reason phrase for `status`.
    pub status_message: String,
    /// Response body read as text.
    pub body: String,
}

impl HttpResponse {
    /// Returns `true` for 2xx responses.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// ============================================================================
// HttpClient
// ============================================================================

/// Executes one HTTP request.
///
/// Implementations own timeouts, TLS and interceptors. A non-2xx status is
/// not an error at this level.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends `request` and reads the full response.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport-level failures.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[async_trait]
impl HttpClient for reqwest::Client {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .request(request.method, request.url)
            .header(CONTENT_TYPE, request.content_type);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.body(request.body).send().await?;
        let status = response.status();
        let status_message = status
            .canonical_reason()
            .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_owned);
        let body = response.text().await?;

        trace!(status = status.as_u16(), bytes = body.len(), "HTTP response received");

        Ok(HttpResponse {
            status: status.as_u16(),
            status_message,
            body,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serves exactly one raw HTTP response and returns the raw request.
    async fn serve_once(response: &'static str, expected_body: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/location", listener.local_addr().unwrap())).unwrap();

        let task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];

            loop {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&raw);
                if text.contains("\r\n\r\n") && text.ends_with(expected_body) {
                    break;
                }
            }

            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
            String::from_utf8_lossy(&raw).into_owned()
        });

        (url, task)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    fn post(url: Url, body: &str) -> HttpRequest {
        HttpRequest {
            method: Method::POST,
            url,
            headers: vec![("X-Device".into(), "courier-17".into())],
            content_type: TEXT_PLAIN,
            body: body.into(),
        }
    }

    #[test]
    fn test_is_success() {
        let mut response = HttpResponse {
            status: 204,
            status_message: "No Content".into(),
            body: String::new(),
        };
        assert!(response.is_success());

        response.status = 302;
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_reqwest_success_roundtrip() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\naccepted",
            "lat=1;lng=2",
        )
        .await;

        let response = HttpClient::execute(&client(), post(url, "lat=1;lng=2")).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.status_message, "OK");
        assert_eq!(response.body, "accepted");

        let raw = server.await.unwrap().to_ascii_lowercase();
        assert!(raw.starts_with("post /location"));
        assert!(raw.contains("content-type: text/plain"));
        assert!(raw.contains("x-device: courier-17"));
        assert!(raw.ends_with("lat=1;lng=2"));
    }

    #[tokio::test]
    async fn test_reqwest_error_status_is_not_an_error() {
        let (url, server) = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            "ping",
        )
        .await;

        let response = HttpClient::execute(&client(), post(url, "ping")).await.unwrap();

        assert_eq!(response.status, 503);
        assert_eq!(response.status_message, "Service Unavailable");
        assert!(!response.is_success());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_reqwest_unreachable_is_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let result = HttpClient::execute(&client(), post(url, "ping")).await;
        assert!(matches!(result, Err(crate::Error::Http(_))));
    }
}
