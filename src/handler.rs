//! TCP connection handling
//!
//! Accept loop with admission control, per-connection writer task, and the
//! bootstrap that wires registry, funnel, transcript and hub together.

use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::client::Peer;
use crate::config::ServerConfig;
use crate::error::AppError;
use crate::funnel;
use crate::message;
use crate::registry::{Admission, Registry};
use crate::server::ChatServer;
use crate::session::{Session, SessionContext};
use crate::transcript::Transcript;
use crate::types::ClientId;

/// Start the hub and serve connections from `listener` forever
///
/// Fails only if the transcript cannot be created.
pub async fn run(listener: TcpListener, config: &ServerConfig) -> Result<(), AppError> {
    let transcript = Transcript::create(&config.transcript_path).await?;
    let welcome = config.load_welcome().await;

    let registry = Arc::new(Registry::new(config.capacity));
    let (funnel, inbox) = funnel::channel(config.channel_buffer);
    tokio::spawn(ChatServer::new(registry.clone(), transcript, inbox).run());

    let ctx = SessionContext {
        registry,
        funnel,
        welcome: Arc::from(welcome),
        read_timeout: config.read_timeout,
    };
    serve(listener, ctx).await;
    Ok(())
}

/// Connection accept loop
///
/// Admission is decided here, once per accepted socket, before any
/// per-connection work starts.
pub async fn serve(listener: TcpListener, ctx: SessionContext) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => match ctx.registry.admit() {
                Some(admission) => {
                    info!("New connection from {}", addr);
                    let ctx = ctx.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, admission, ctx).await {
                            error!("Connection handler error: {}", e);
                        }
                    });
                }
                None => {
                    warn!("Rejecting {}: chat is full", addr);
                    tokio::spawn(reject_full(stream));
                }
            },
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle an admitted TCP connection
///
/// Splits the socket, spawns the writer task and runs the session worker
/// on the read half. Returns once the connection is fully closed.
pub async fn handle_connection(
    stream: TcpStream,
    admission: Admission,
    ctx: SessionContext,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let client_id = ClientId::new();
    debug!("Client {} connected from {}", client_id, peer_addr);

    let (reader, writer) = stream.into_split();
    let (peer, outbox) = Peer::channel(client_id);
    let write_task = tokio::spawn(write_outbox(outbox, writer));

    let result = Session::new(BufReader::new(reader), peer, admission, ctx)
        .run()
        .await;

    // Ends once the hub has dropped this client's queue too
    if let Err(e) = write_task.await {
        warn!("Write task for client {} failed: {}", client_id, e);
    }
    info!("Client {} disconnected", client_id);

    result
}

/// Drain a client's outbound queue into its socket
///
/// Stops at the first write error; the reader side will notice the dead
/// connection on its own.
async fn write_outbox<W>(mut outbox: mpsc::UnboundedReceiver<String>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    while let Some(text) = outbox.recv().await {
        if let Err(e) = writer.write_all(text.as_bytes()).await {
            debug!("Socket write failed, ending write task: {}", e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}

async fn reject_full(mut stream: TcpStream) {
    if let Err(e) = stream.write_all(message::CHAT_FULL.as_bytes()).await {
        debug!("Failed to send capacity notice: {}", e);
    }
    let _ = stream.shutdown().await;
}
