//! Sends one location payload and prints the outcome.
//!
//! Usage:
//!
//! ```text
//! cargo run --example send_location -- <endpoint> [payload] [--debug] [-H Name:Value]...
//! ```
//!
//! `ws://` and `wss://` endpoints use the socket transport, `http://` and
//! `https://` use the request transport.

// ============================================================================
// Imports
// ============================================================================

use live_location_transport::{Result, TransportConfig, TransportKind, repository};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    endpoint: String,
    payload: String,
    headers: Vec<(String, String)>,
    debug: bool,
}

impl Args {
    fn parse() -> Option<Self> {
        let mut args = std::env::args().skip(1);
        let mut positional = Vec::new();
        let mut headers = Vec::new();
        let mut debug = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--debug" => debug = true,
                "-H" => {
                    let header = args.next()?;
                    let (name, value) = header.split_once(':')?;
                    headers.push((name.trim().to_owned(), value.trim().to_owned()));
                }
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        Some(Self {
            endpoint: positional.next()?,
            payload: positional
                .next()
                .unwrap_or_else(|| r#"{"lat":52.5200,"lng":13.4050}"#.to_owned()),
            headers,
            debug,
        })
    }
}

// ============================================================================
// Functions
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "live_location_transport=debug"
    } else {
        "live_location_transport=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let Some(args) = Args::parse() else {
        eprintln!("usage: send_location <endpoint> [payload] [--debug] [-H Name:Value]...");
        std::process::exit(2);
    };

    init_logging(args.debug);

    let kind = if args.endpoint.starts_with("ws") {
        TransportKind::Socket
    } else {
        TransportKind::Request
    };

    let config = TransportConfig::builder(&args.endpoint)
        .kind(kind)
        .headers(args.headers)
        .build()?;

    let transport = repository(config)?;

    let mut diagnostics = transport.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = diagnostics.recv().await {
            eprintln!("diagnostic @{}: {}", event.timestamp_ms, event.message);
        }
    });

    transport.open_connection();

    match transport.send_data(&args.payload).await {
        Ok(ack) => println!("ack: {}", ack.body),
        Err(failure) => println!("failure: {}", failure.reason),
    }

    if let Err(e) = transport.close_connection().await {
        eprintln!("close: {e}");
    }

    Ok(())
}
