//! Websocket transport
//!
//! Accepts subscribers and pumps their queue into the socket. Text payloads go
//! out as text messages, binary frames as binary messages. Anything a client
//! sends is ignored apart from ping and close.

use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::BroadcastError;
use super::subscribers::SubscriberSet;
use crate::codec::Payload;

pub async fn bind(addr: SocketAddr) -> Result<TcpListener, BroadcastError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| BroadcastError::Bind { addr, source })?;
    info!("Websocket server listening on ws://{}", addr);
    Ok(listener)
}

/// Accept loop; every connection becomes a subscriber until it closes
pub async fn serve(listener: TcpListener, subscribers: SubscriberSet, cancel: CancellationToken) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(v) => v,
                Err(e) => {
                    error!("Accept error: {}", e);
                    continue;
                }
            },
        };

        tokio::spawn(handle_socket(
            peer,
            stream,
            subscribers.clone(),
            cancel.clone(),
        ));
    }
    info!("Websocket server stopped");
}

fn to_message(payload: Payload) -> Message {
    match payload {
        Payload::Text(text) => Message::Text(text),
        Payload::Binary(bytes) => Message::Binary(bytes),
    }
}

async fn handle_socket(
    peer: SocketAddr,
    stream: TcpStream,
    subscribers: SubscriberSet,
    cancel: CancellationToken,
) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Websocket handshake with {} failed: {}", peer, e);
            return;
        }
    };

    let mut subscription = match subscribers.join(peer.to_string()) {
        Ok(subscription) => subscription,
        Err(e) => {
            error!("Could not register {}: {}", peer, e);
            return;
        }
    };

    let (mut ws_sink, mut ws_stream) = ws.split();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let _ = ws_sink.send(Message::Close(None)).await;
                break;
            }

            // Broadcast loop -> client
            payload = subscription.recv() => {
                match payload {
                    Some(payload) => {
                        if ws_sink.send(to_message(payload)).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        warn!("Client {} fell behind and was dropped", peer);
                        break;
                    }
                }
            }

            // Client -> server
            message = ws_stream.next() => {
                match message {
                    Some(Ok(Message::Ping(data))) => {
                        let _ = ws_sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => debug!("Ignoring message from {}", peer),
                    Some(Err(e)) => {
                        warn!("Client {} websocket error: {}", peer, e);
                        break;
                    }
                }
            }
        }
    }

    info!("Client disconnected: {}", peer);
}
