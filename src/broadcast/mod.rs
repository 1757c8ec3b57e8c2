//! Fan-out of controller frames to websocket subscribers
//!
//! ```text
//! Streamer (owns device) ──tick──► SubscriberSet ──queue──► server task ──► socket
//!                                        ▲
//!                      accept loop ──join┘
//! ```

pub mod error;
pub mod server;
pub mod streamer;
pub mod subscribers;

pub use error::BroadcastError;
pub use streamer::{StreamSettings, Streamer, TickOutcome};
pub use subscribers::{BroadcastReport, SubscriberId, SubscriberSet, Subscription};
