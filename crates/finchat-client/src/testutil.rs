//! In-process WebSocket server used by connection and session tests.

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use futures::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};
use tokio_tungstenite::tungstenite::Message as WsFrame;

use finchat_core::{ClientEvent, ServerEvent};

/// Actions a test drives into the server side of the socket.
pub enum ServerAction {
    /// Push an event to the connected client.
    Send(ServerEvent),
    /// Close the current socket; the server keeps accepting.
    Close,
}

/// Handle to the in-process server.
pub struct TestServer {
    /// Base URL in the form the client config expects.
    pub url: String,
    /// Client events decoded from inbound frames.
    pub received: mpsc::UnboundedReceiver<ClientEvent>,
    /// Request URIs seen during handshakes, one per accepted socket.
    pub handshakes: mpsc::UnboundedReceiver<String>,
    /// Driver for [`ServerAction`]s.
    pub actions: mpsc::UnboundedSender<ServerAction>,
}

/// Spawn a server that accepts one socket at a time and keeps accepting
/// across reconnects.
pub async fn spawn_server() -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (received_tx, received) = mpsc::unbounded_channel();
    let (handshake_tx, handshakes) = mpsc::unbounded_channel();
    let (actions, mut action_rx) = mpsc::unbounded_channel::<ServerAction>();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };

            let handshake_tx = handshake_tx.clone();
            let callback = move |req: &Request, resp: Response| {
                let _ = handshake_tx.send(req.uri().to_string());
                Ok(resp)
            };
            let Ok(socket) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                continue;
            };
            let (mut write, mut read) = socket.split();

            loop {
                tokio::select! {
                    action = action_rx.recv() => match action {
                        Some(ServerAction::Send(event)) => {
                            let frame = serde_json::to_string(&event).unwrap();
                            if write.send(WsFrame::Text(frame.into())).await.is_err() {
                                break;
                            }
                        }
                        Some(ServerAction::Close) => {
                            let _ = write.send(WsFrame::Close(None)).await;
                            break;
                        }
                        None => return,
                    },
                    frame = read.next() => match frame {
                        Some(Ok(WsFrame::Text(text))) => {
                            if let Ok(event) = serde_json::from_str::<ClientEvent>(&text) {
                                let _ = received_tx.send(event);
                            }
                        }
                        Some(Ok(WsFrame::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(_)) => break,
                    },
                }
            }
        }
    });

    TestServer {
        url: format!("http://{addr}"),
        received,
        handshakes,
        actions,
    }
}
