//! WebSocket connection management.
//!
//! One [`Connection`] owns the single logical connection to the backend.
//! The socket task reconnects with a fixed delay and a bounded number of
//! consecutive failed attempts, then gives up silently until `connect` is
//! called again. Lifecycle transitions and inbound application events are
//! published on a broadcast channel; dropping a receiver detaches that
//! subscription.

use std::sync::{Arc, Mutex};

use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsFrame;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use finchat_core::{ClientEvent, Message, ServerEvent};

use crate::config::Config;
use crate::error::ClientError;
use crate::reconciler::Transport;

/// Connection lifecycle and inbound application events.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// The socket is live and authenticated.
    Connected,
    /// A live socket dropped.
    Disconnected,
    /// The bot sent a message.
    Inbound(Message),
    /// Server-pushed instruction to wipe the local history.
    HistoryCleared,
    /// A connection attempt failed; the task keeps retrying until the
    /// attempt budget runs out.
    ConnectError(String),
}

/// How a socket session ended.
enum SocketEnd {
    /// `disconnect` was called.
    Shutdown,
    /// The live socket dropped; the caller decides whether to reconnect.
    Dropped,
}

/// State shared between the handle and the socket task.
struct Shared {
    events: broadcast::Sender<ConnectionEvent>,
    live_tx: watch::Sender<bool>,
    live_rx: watch::Receiver<bool>,
    outbound: Mutex<Option<mpsc::UnboundedSender<ClientEvent>>>,
    task: Mutex<Option<TaskGuard>>,
}

struct TaskGuard {
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

/// Handle to the single logical backend connection. Cheap to clone; all
/// clones share the same socket task.
#[derive(Clone)]
pub struct Connection {
    config: Arc<Config>,
    shared: Arc<Shared>,
}

impl Connection {
    /// Create the connection manager. No I/O happens until
    /// [`connect`](Self::connect).
    pub fn new(config: Config) -> Self {
        let (events, _) = broadcast::channel(64);
        let (live_tx, live_rx) = watch::channel(false);
        Self {
            config: Arc::new(config),
            shared: Arc::new(Shared {
                events,
                live_tx,
                live_rx,
                outbound: Mutex::new(None),
                task: Mutex::new(None),
            }),
        }
    }

    /// Start the socket task, authenticating with `token`.
    ///
    /// Idempotent: a no-op while a socket task is already running, live or
    /// retrying. After the task has given up (attempt budget exhausted) or
    /// been torn down, calling `connect` again starts a fresh task.
    pub fn connect(&self, token: &str) {
        let mut task = self.shared.task.lock().unwrap();
        if let Some(guard) = task.as_ref() {
            if !guard.handle.is_finished() {
                debug!("connection task already running");
                return;
            }
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_connection(
            self.config.clone(),
            self.shared.clone(),
            self.config.ws_url(token),
            cancel.clone(),
        ));
        *task = Some(TaskGuard { cancel, handle });
    }

    /// Tear down the socket task and close the socket, if any.
    pub fn disconnect(&self) {
        if let Some(guard) = self.shared.task.lock().unwrap().take() {
            guard.cancel.cancel();
        }
        self.shared.outbound.lock().unwrap().take();
        let _ = self.shared.live_tx.send(false);
        info!("disconnect requested");
    }

    /// True only while a socket is connected (not merely retrying).
    pub fn is_live(&self) -> bool {
        *self.shared.live_rx.borrow()
    }

    /// Fire-and-forget send over the live connection.
    pub fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.send_event(event)
    }

    /// Subscribe to connection events. Dropping the receiver detaches the
    /// subscription.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    fn send_event(&self, event: ClientEvent) -> Result<(), ClientError> {
        let guard = self.shared.outbound.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.send(event).map_err(|_| ClientError::NotConnected),
            None => Err(ClientError::NotConnected),
        }
    }
}

impl Transport for Connection {
    fn is_live(&self) -> bool {
        *self.shared.live_rx.borrow()
    }

    fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.send_event(event)
    }
}

/// Outer retry loop: one iteration per socket session or failed attempt.
async fn run_connection(
    config: Arc<Config>,
    shared: Arc<Shared>,
    url: String,
    cancel: CancellationToken,
) {
    let mut failures = 0u32;
    loop {
        match run_socket(&shared, &url, &cancel).await {
            Ok(SocketEnd::Shutdown) => break,
            Ok(SocketEnd::Dropped) => {
                // A session was live; the failure budget starts over.
                failures = 0;
            }
            Err(e) => {
                failures += 1;
                warn!(error = %e, attempt = failures, "connection attempt failed");
                let _ = shared
                    .events
                    .send(ConnectionEvent::ConnectError(e.to_string()));
                if failures >= config.max_reconnect_attempts {
                    info!(attempts = failures, "giving up on reconnection");
                    break;
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(config.reconnect_delay) => {}
        }
    }
    let _ = shared.live_tx.send(false);
    debug!("connection task stopped");
}

/// One socket session: handshake, then pump frames both ways until the
/// socket drops or teardown is requested.
async fn run_socket(
    shared: &Shared,
    url: &str,
    cancel: &CancellationToken,
) -> Result<SocketEnd, ClientError> {
    debug!(url = %url, "connecting");
    let (stream, _) = tokio::select! {
        _ = cancel.cancelled() => return Ok(SocketEnd::Shutdown),
        result = connect_async(url) => result?,
    };
    let (mut write, mut read) = stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<ClientEvent>();
    *shared.outbound.lock().unwrap() = Some(tx);
    let _ = shared.live_tx.send(true);
    let _ = shared.events.send(ConnectionEvent::Connected);
    info!("connected");

    let end = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = write.send(WsFrame::Close(None)).await;
                break SocketEnd::Shutdown;
            }
            outbound = rx.recv() => {
                let Some(event) = outbound else {
                    break SocketEnd::Dropped;
                };
                let frame = match serde_json::to_string(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(error = %e, "failed to encode outbound event");
                        continue;
                    }
                };
                if let Err(e) = write.send(WsFrame::Text(frame.into())).await {
                    warn!(error = %e, "send failed");
                    break SocketEnd::Dropped;
                }
            }
            inbound = read.next() => {
                match inbound {
                    Some(Ok(WsFrame::Text(text))) => handle_frame(shared, &text),
                    Some(Ok(WsFrame::Close(_))) | None => {
                        debug!("server closed the connection");
                        break SocketEnd::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "read error");
                        break SocketEnd::Dropped;
                    }
                }
            }
        }
    };

    shared.outbound.lock().unwrap().take();
    let _ = shared.live_tx.send(false);
    let _ = shared.events.send(ConnectionEvent::Disconnected);
    info!("disconnected");
    Ok(end)
}

fn handle_frame(shared: &Shared, text: &str) {
    match serde_json::from_str::<ServerEvent>(text) {
        Ok(ServerEvent::BotMessage(message)) => {
            let _ = shared.events.send(ConnectionEvent::Inbound(message));
        }
        Ok(ServerEvent::ClearChat) => {
            let _ = shared.events.send(ConnectionEvent::HistoryCleared);
        }
        Err(e) => debug!(error = %e, "unrecognized frame"),
    }
}
