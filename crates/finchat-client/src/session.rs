//! The session event loop.
//!
//! One task owns the reconciler and consumes two streams: connection events
//! from the socket task and commands from the presentation layer. Because
//! both are handled on the same task, a reconnect flush always completes
//! before the next compose command is processed.

use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use finchat_core::Message;

use crate::connection::{Connection, ConnectionEvent};
use crate::reconciler::{ComposeOutcome, Reconciler};

/// User intent forwarded by the presentation layer.
#[derive(Debug)]
pub enum SessionCommand {
    /// Compose and deliver (or queue) a message.
    Send(String),
    /// Wipe the visible history.
    ClearHistory,
    /// Stop the session loop.
    Shutdown,
}

/// State pushed to the presentation layer.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// Full history snapshot after any change.
    History(Vec<Message>),
    /// Connectivity indicator.
    Connected(bool),
    /// A compose call was ignored because a reply is still outstanding.
    ReplyOutstanding,
    /// A connection attempt failed (non-fatal, the task retries).
    ConnectError(String),
}

/// Runs the reconciler against a connection until shutdown.
pub struct ChatSession {
    reconciler: Reconciler<Connection>,
    events: broadcast::Receiver<ConnectionEvent>,
}

impl ChatSession {
    /// Pair a reconciler with the event stream of its connection.
    pub fn new(
        reconciler: Reconciler<Connection>,
        events: broadcast::Receiver<ConnectionEvent>,
    ) -> Self {
        Self { reconciler, events }
    }

    /// Run the loop. Returns when a `Shutdown` command arrives or both
    /// input channels close.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        updates: mpsc::Sender<SessionUpdate>,
    ) {
        self.reconciler.load();
        let _ = updates
            .send(SessionUpdate::History(self.reconciler.history().to_vec()))
            .await;

        loop {
            tokio::select! {
                event = self.events.recv() => match event {
                    Ok(ConnectionEvent::Connected) => {
                        self.reconciler.on_connected();
                        let _ = updates.send(SessionUpdate::Connected(true)).await;
                        self.push_history(&updates).await;
                    }
                    Ok(ConnectionEvent::Disconnected) => {
                        let _ = updates.send(SessionUpdate::Connected(false)).await;
                    }
                    Ok(ConnectionEvent::Inbound(message)) => {
                        self.reconciler.on_bot_message(message);
                        self.push_history(&updates).await;
                    }
                    Ok(ConnectionEvent::HistoryCleared) => {
                        info!("server requested history clear");
                        self.reconciler.clear_history();
                        self.push_history(&updates).await;
                    }
                    Ok(ConnectionEvent::ConnectError(reason)) => {
                        warn!(reason = %reason, "connection attempt failed");
                        let _ = updates.send(SessionUpdate::ConnectError(reason)).await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "connection event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                command = commands.recv() => match command {
                    Some(SessionCommand::Send(text)) => {
                        match self.reconciler.compose_and_send(&text) {
                            ComposeOutcome::Ignored => {
                                if self.reconciler.is_awaiting_reply() {
                                    let _ = updates.send(SessionUpdate::ReplyOutstanding).await;
                                }
                            }
                            ComposeOutcome::Sent | ComposeOutcome::Queued => {
                                self.push_history(&updates).await;
                            }
                        }
                    }
                    Some(SessionCommand::ClearHistory) => {
                        self.reconciler.clear_history();
                        self.push_history(&updates).await;
                    }
                    Some(SessionCommand::Shutdown) | None => break,
                },
            }
        }
        info!("session loop stopped");
    }

    async fn push_history(&self, updates: &mpsc::Sender<SessionUpdate>) {
        let _ = updates
            .send(SessionUpdate::History(self.reconciler.history().to_vec()))
            .await;
    }
}
