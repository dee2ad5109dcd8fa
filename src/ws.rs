//! WebSocket endpoint for change notifications
//!
//! ## Protocol
//!
//! ### Client → Server
//! ```json
//! {"type": "new_registration"}
//! {"type": "ping"}
//! ```
//!
//! ### Server → Client
//! ```json
//! {"type": "data_updated"}
//! {"type": "pong"}
//! ```
//!
//! Neither direction carries registrant data.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Request, Response};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::hub::{BroadcastHub, ClientMessage, ServerMessage};
use crate::response;

type HyperWebSocket =
    hyper_tungstenite::WebSocketStream<hyper_util::rt::TokioIo<hyper::upgrade::Upgraded>>;

/// Upgrade the request and hand the socket to a connection task
pub fn handle_upgrade(
    mut req: Request<Incoming>,
    hub: Arc<BroadcastHub>,
    remote_addr: SocketAddr,
) -> Response<Full<Bytes>> {
    let (response, websocket) = match hyper_tungstenite::upgrade(&mut req, None) {
        Ok(upgrade) => upgrade,
        Err(e) => {
            warn!(addr = %remote_addr, error = %e, "WebSocket upgrade failed");
            return response::bad_request(&format!("WebSocket upgrade failed: {}", e));
        }
    };

    tokio::spawn(async move {
        match websocket.await {
            Ok(ws) => handle_connection(ws, hub, remote_addr).await,
            Err(e) => warn!(addr = %remote_addr, error = %e, "WebSocket handshake failed"),
        }
    });

    response.map(|_| Full::new(Bytes::new()))
}

async fn send_json(
    sink: &mut futures_util::stream::SplitSink<HyperWebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    // ServerMessage has no fields that can fail to serialize
    let json = serde_json::to_string(message).unwrap_or_default();
    sink.send(Message::Text(json.into())).await
}

/// Serve one subscriber until it disconnects
async fn handle_connection(ws: HyperWebSocket, hub: Arc<BroadcastHub>, remote_addr: SocketAddr) {
    let (mut sink, mut stream) = ws.split();
    let mut updates = hub.subscribe();

    let mut heartbeat = tokio::time::interval(hub.heartbeat_interval());
    // First tick completes immediately
    heartbeat.tick().await;

    info!(addr = %remote_addr, subscribers = hub.subscriber_count(), "Subscriber connected");

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::NewRegistration { data }) => {
                                info!(addr = %remote_addr, data = ?data, "Client reported a new registration");
                                hub.notify_data_updated("new_registration");
                            }
                            Ok(ClientMessage::Ping) => {
                                if send_json(&mut sink, &ServerMessage::Pong).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(addr = %remote_addr, error = %e, "Ignoring malformed client message");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(addr = %remote_addr, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }

            result = updates.recv() => {
                let message = match result {
                    Ok(message) => message,
                    // Missed signals carry no data, one refresh covers them all
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(addr = %remote_addr, skipped = skipped, "Subscriber lagged");
                        ServerMessage::DataUpdated
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                if let Err(e) = send_json(&mut sink, &message).await {
                    debug!(addr = %remote_addr, error = %e, "Failed to deliver signal");
                    break;
                }
            }

            _ = heartbeat.tick() => {
                if sink.send(Message::Ping(Default::default())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(updates);
    info!(addr = %remote_addr, subscribers = hub.subscriber_count(), "Subscriber disconnected");
}
