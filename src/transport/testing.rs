//! Local WebSocket server for transport tests.
//!
//! Binds to `127.0.0.1:0`, accepts any number of clients and records what
//! they send.

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

// ============================================================================
// Types
// ============================================================================

/// How the server treats each accepted connection.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Behavior {
    /// Record every frame until the client goes away.
    Record,
    /// Close normally after receiving this many text frames.
    CloseAfter(usize),
    /// Drop the TCP stream right after the handshake.
    Reset,
    /// Keep the connection open but never read from it, so a close frame
    /// is never answered.
    Stall,
}

/// Observations shared with the test body.
#[derive(Default)]
pub(crate) struct ServerStats {
    /// Handshakes started (counted before the response is written).
    pub accepted: AtomicUsize,
    /// Connections currently alive.
    pub live: AtomicUsize,
    /// Text frames received, across all connections.
    pub messages: Mutex<Vec<String>>,
    /// Close frames received as (code, reason).
    pub close_frames: Mutex<Vec<(u16, String)>>,
    /// Headers of the most recent handshake, names lowercased.
    pub headers: Mutex<Vec<(String, String)>>,
}

// ============================================================================
// TestServer
// ============================================================================

pub(crate) struct TestServer {
    addr: SocketAddr,
    pub stats: Arc<ServerStats>,
    accept_task: JoinHandle<()>,
}

impl TestServer {
    pub async fn bind(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind should succeed");
        let addr = listener.local_addr().expect("bound address");
        let stats = Arc::new(ServerStats::default());

        let accept_stats = Arc::clone(&stats);
        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, behavior, Arc::clone(&accept_stats)));
            }
        });

        Self {
            addr,
            stats,
            accept_task,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/live", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn serve(stream: TcpStream, behavior: Behavior, stats: Arc<ServerStats>) {
    let handshake_stats = Arc::clone(&stats);
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let headers = request
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    value.to_str().unwrap_or_default().to_owned(),
                )
            })
            .collect();
        *handshake_stats.headers.lock() = headers;
        handshake_stats.accepted.fetch_add(1, Ordering::SeqCst);
        Ok(response)
    };

    let Ok(mut ws) = accept_hdr_async(stream, callback).await else {
        return;
    };

    if let Behavior::Reset = behavior {
        drop(ws);
        return;
    }

    stats.live.fetch_add(1, Ordering::SeqCst);

    if let Behavior::Stall = behavior {
        let _held = ws;
        std::future::pending::<()>().await;
        return;
    }

    let mut received = 0;

    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => {
                stats.messages.lock().push(text.as_str().to_owned());
                received += 1;

                if let Behavior::CloseAfter(limit) = behavior
                    && received == limit
                {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: String::from("bye").into(),
                    };
                    let _ = ws.close(Some(frame)).await;
                }
            }
            Ok(Message::Close(frame)) => {
                if let Some(frame) = frame {
                    stats
                        .close_frames
                        .lock()
                        .push((u16::from(frame.code), frame.reason.as_str().to_owned()));
                }
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }

    stats.live.fetch_sub(1, Ordering::SeqCst);
}

/// Polls `condition` until it holds, panicking after five seconds.
pub(crate) async fn eventually(condition: impl Fn() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}
