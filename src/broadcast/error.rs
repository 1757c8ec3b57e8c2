//! Error definitions for the broadcast module

use std::net::SocketAddr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The websocket listener could not be opened
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// A frame or handshake could not be encoded
    #[error("Failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}
