//! Multi-user TCP Chat Server - Entry Point
//!
//! Parses the optional port argument, binds the listener and hands it to
//! the connection handler.

use std::env;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tcp_chat::{config, handler, parse_args};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=tcp_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tcp_chat=info")),
        )
        .init();

    let parsed = parse_args(env::args().skip(1))?;
    if parsed.usage_hint {
        println!("{}", config::USAGE);
    }
    let config = parsed.config;

    let addr = config.bind_addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", addr, e);
            return Err(e.into());
        }
    };
    info!("Listening on the port :{}", config.port);

    handler::run(listener, &config).await?;
    Ok(())
}
