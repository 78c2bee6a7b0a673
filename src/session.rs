//! Per-connection session state machine
//!
//! `Connecting → Negotiating (repeated) → Active → Closed`. A worker reads
//! one line at a time; any read failure counts as a disconnect. Everything
//! the worker writes goes through its `Peer` queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::client::Peer;
use crate::error::AppError;
use crate::event::Event;
use crate::funnel::Funnel;
use crate::message;
use crate::registry::{Admission, Registry};
use crate::types::{ClientId, Timestamp};

/// Shared collaborators handed to every session worker
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub registry: Arc<Registry>,
    pub funnel: Funnel,
    /// Banner sent before every name prompt
    pub welcome: Arc<str>,
    /// `None` waits forever for the next line
    pub read_timeout: Option<Duration>,
}

/// Lifecycle of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Negotiating,
    Active { name: String },
    Closed,
}

/// Worker driving one connection from accept to teardown
pub struct Session<R> {
    id: ClientId,
    reader: R,
    peer: Peer,
    admission: Admission,
    ctx: SessionContext,
}

impl<R> Session<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R, peer: Peer, admission: Admission, ctx: SessionContext) -> Self {
        Self {
            id: peer.id,
            reader,
            peer,
            admission,
            ctx,
        }
    }

    /// Drive the state machine until the connection closes
    ///
    /// Only fails if the broadcast hub has gone away.
    pub async fn run(mut self) -> Result<(), AppError> {
        let mut state = SessionState::Connecting;
        loop {
            state = match state {
                SessionState::Connecting => {
                    debug!("Client {} negotiating a name", self.id);
                    SessionState::Negotiating
                }
                SessionState::Negotiating => self.negotiate().await?,
                SessionState::Active { name } => self.relay(name).await?,
                SessionState::Closed => break,
            };
        }
        debug!("Client {} session closed", self.id);
        Ok(())
    }

    /// One banner + read cycle
    async fn negotiate(&mut self) -> Result<SessionState, AppError> {
        self.send(self.ctx.welcome.to_string());

        let Some(name) = self.read_line().await else {
            debug!("Client {} disconnected while negotiating", self.id);
            return Ok(SessionState::Closed);
        };

        // A previous rejection gave the slot back; count us again
        self.admission.readmit();

        match self.ctx.registry.try_register(self.id, &name) {
            Ok(()) => {
                self.join(&name).await?;
                info!("Client {} joined as '{}'", self.id, name);
                Ok(SessionState::Active { name })
            }
            Err(reason) => {
                info!("Client {} name rejected: {}", self.id, reason);
                self.send(message::rejection(&reason));
                self.admission.release();
                Ok(SessionState::Negotiating)
            }
        }
    }

    /// Announce the join and wait until history has been replayed to us
    async fn join(&mut self, name: &str) -> Result<(), AppError> {
        let (event, replayed) = Event::join(self.peer.clone(), name);
        let submitted = match self.ctx.funnel.submit(event).await {
            Ok(()) => replayed.await.map_err(|_| AppError::FunnelClosed),
            Err(e) => Err(e),
        };
        if submitted.is_err() {
            self.ctx.registry.unregister(self.id);
        }
        submitted
    }

    /// Relay chat lines until the connection drops, then tear down
    async fn relay(&mut self, name: String) -> Result<SessionState, AppError> {
        loop {
            self.send(message::prompt(&Timestamp::now(), &name));

            let Some(line) = self.read_line().await else {
                break;
            };
            if line.is_empty() {
                continue;
            }

            if let Err(e) = self.ctx.funnel.submit(Event::chat(self.id, &name, &line)).await {
                self.teardown(&name).await;
                return Err(e);
            }
        }

        self.teardown(&name).await;
        Ok(SessionState::Closed)
    }

    /// Release the slot, leave the registry and announce the leave
    async fn teardown(&mut self, name: &str) {
        self.admission.depart(self.id);
        info!("Client {} ('{}') left", self.id, name);

        if self.ctx.funnel.submit(Event::leave(self.id, name)).await.is_err() {
            debug!("Hub gone, leave of {} not broadcast", self.id);
        }
    }

    /// Next line with surrounding whitespace trimmed
    ///
    /// Invalid UTF-8 is replaced, not rejected. `None` on EOF, I/O error,
    /// timeout, or a final chunk that never got its newline.
    async fn read_line(&mut self) -> Option<String> {
        let mut buf = Vec::new();
        let timeout = self.ctx.read_timeout;
        let read = self.reader.read_until(b'\n', &mut buf);

        let result = match timeout {
            Some(limit) => match tokio::time::timeout(limit, read).await {
                Ok(result) => result,
                Err(_) => {
                    debug!("Client {} read timed out after {:?}", self.id, limit);
                    return None;
                }
            },
            None => read.await,
        };

        match result {
            Ok(0) => None,
            Ok(_) if buf.last() != Some(&b'\n') => None,
            Ok(_) => Some(String::from_utf8_lossy(&buf).trim().to_string()),
            Err(e) => {
                debug!("Client {} read failed: {}", self.id, e);
                None
            }
        }
    }

    fn send(&self, text: impl Into<String>) {
        if self.peer.send(text).is_err() {
            debug!("Client {} writer closed", self.id);
        }
    }
}
