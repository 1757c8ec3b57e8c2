//! Live subscriber set shared by the accept loop and the broadcast tick
//!
//! Every subscriber owns a bounded queue. The tick only ever `try_send`s into
//! it, so a stalled connection can never hold up the loop; a subscriber whose
//! queue is full or closed is dropped from the set instead.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::error::BroadcastError;
use crate::codec::Payload;
use crate::controller::device::DeviceInfo;

pub type SubscriberId = u64;

/// Queue depth used when none is configured
pub const DEFAULT_QUEUE: usize = 64;

struct Entry {
    peer: String,
    sender: mpsc::Sender<Payload>,
}

#[derive(Default)]
struct Registry {
    entries: HashMap<SubscriberId, Entry>,
    device_info: DeviceInfo,
}

struct Inner {
    next_id: AtomicU64,
    queue: usize,
    registry: Mutex<Registry>,
}

/// Result of one fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Clone)]
pub struct SubscriberSet {
    inner: Arc<Inner>,
}

impl SubscriberSet {
    pub fn new(queue: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                queue: queue.max(1),
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a subscriber; its first payload is the current device info
    pub fn join(&self, peer: impl Into<String>) -> Result<Subscription, BroadcastError> {
        let peer = peer.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.queue);

        let mut registry = self.registry();
        let handshake = serde_json::to_string(&registry.device_info)?;
        // Fresh queue with capacity >= 1, cannot be full
        let _ = sender.try_send(Payload::Text(handshake));
        registry.entries.insert(
            id,
            Entry {
                peer: peer.clone(),
                sender,
            },
        );
        info!(
            "Subscriber {} joined from {} ({} live)",
            id,
            peer,
            registry.entries.len()
        );
        drop(registry);

        Ok(Subscription {
            id,
            receiver,
            set: self.clone(),
        })
    }

    /// Removes a subscriber; unknown ids are ignored
    pub fn leave(&self, id: SubscriberId) {
        let mut registry = self.registry();
        if let Some(entry) = registry.entries.remove(&id) {
            info!(
                "Subscriber {} ({}) left ({} live)",
                id,
                entry.peer,
                registry.entries.len()
            );
        }
    }

    pub fn len(&self) -> usize {
        self.registry().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.registry().device_info.clone()
    }

    /// Replaces the device info handed to future subscribers
    pub fn publish_device_info(&self, info: DeviceInfo) {
        debug!("Device info now {:?}", info);
        self.registry().device_info = info;
    }

    /// Delivers one payload to everyone who was live when the call started
    pub fn broadcast(&self, payload: &Payload) -> BroadcastReport {
        let snapshot: Vec<(SubscriberId, mpsc::Sender<Payload>)> = self
            .registry()
            .entries
            .iter()
            .map(|(id, entry)| (*id, entry.sender.clone()))
            .collect();

        let mut report = BroadcastReport::default();
        let mut stale = Vec::new();
        for (id, sender) in snapshot {
            match sender.try_send(payload.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("Subscriber {} is not keeping up, dropping it", id);
                    stale.push(id);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Subscriber {} already closed", id);
                    stale.push(id);
                }
            }
        }

        if !stale.is_empty() {
            let mut registry = self.registry();
            for id in &stale {
                registry.entries.remove(id);
            }
            report.dropped = stale.len();
        }
        report
    }
}

impl Default for SubscriberSet {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE)
    }
}

/// Receiving end of one subscriber; leaves the set when dropped
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Payload>,
    set: SubscriberSet,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Next payload, `None` once the set has dropped this subscriber
    pub async fn recv(&mut self) -> Option<Payload> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Payload> {
        self.receiver.try_recv().ok()
    }

    /// Closes the queue so further broadcasts drop this subscriber
    pub fn close(&mut self) {
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.set.leave(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(text: &str) -> Payload {
        Payload::Text(text.to_string())
    }

    #[test]
    fn handshake_comes_first() {
        let set = SubscriberSet::new(4);
        let mut sub = set.join("peer-a").unwrap();
        set.broadcast(&frame("tick"));

        let handshake = sub.try_recv().unwrap();
        assert_eq!(
            handshake,
            Payload::Text(r#"{"connected":false,"name":"No Device","guid":null,"index":-1}"#.to_string())
        );
        assert_eq!(sub.try_recv(), Some(frame("tick")));
        assert_eq!(sub.try_recv(), None);
    }

    #[test]
    fn handshake_reflects_published_info() {
        let set = SubscriberSet::default();
        set.publish_device_info(DeviceInfo {
            connected: true,
            name: "Pad".to_string(),
            guid: Some("00ff".to_string()),
            index: 0,
        });
        let mut sub = set.join("peer").unwrap();

        let Some(Payload::Text(text)) = sub.try_recv() else {
            panic!("expected a text handshake");
        };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["connected"], serde_json::json!(true));
        assert_eq!(value["guid"], serde_json::json!("00ff"));
    }

    #[test]
    fn drop_leaves_the_set() {
        let set = SubscriberSet::new(4);
        let a = set.join("a").unwrap();
        let _b = set.join("b").unwrap();
        assert_eq!(set.len(), 2);

        drop(a);
        assert_eq!(set.len(), 1);
        assert_eq!(set.broadcast(&frame("x")).delivered, 1);
    }

    #[test]
    fn full_queue_drops_subscriber() {
        let set = SubscriberSet::new(2);
        let _slow = set.join("slow").unwrap();

        // Handshake occupies one slot, the first frame the other
        assert_eq!(set.broadcast(&frame("1")).delivered, 1);
        let report = set.broadcast(&frame("2"));
        assert_eq!(report, BroadcastReport { delivered: 0, dropped: 1 });
        assert!(set.is_empty());
    }

    #[test]
    fn closed_subscriber_is_skipped() {
        let set = SubscriberSet::new(8);
        let mut gone = set.join("gone").unwrap();
        let mut live = set.join("live").unwrap();
        gone.close();

        let report = set.broadcast(&frame("f"));
        assert_eq!(report, BroadcastReport { delivered: 1, dropped: 1 });
        assert_eq!(set.len(), 1);

        live.try_recv();
        assert_eq!(live.try_recv(), Some(frame("f")));
    }

    #[tokio::test]
    async fn dropped_subscriber_drains_then_ends() {
        let set = SubscriberSet::new(1);
        let mut sub = set.join("peer").unwrap();
        set.broadcast(&frame("overflow"));

        assert!(matches!(sub.recv().await, Some(Payload::Text(_))));
        assert_eq!(sub.recv().await, None);
    }
}
