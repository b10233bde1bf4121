//! Process-local message bus between the popup and the background context.
//!
//! Mirrors the extension runtime messaging model: a request goes to the first
//! listener that claims it and is answered at most once; broadcasts fan out to
//! every subscriber.

use std::sync::{Arc, RwLock};

use futures::future::BoxFuture;
use serde_json::Value;
use tokio::sync::{broadcast, oneshot};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SkyauthError};
use crate::protocol::{Action, Reply, Request};

const BROADCAST_CAPACITY: usize = 16;

/// Reply that will be produced asynchronously.
pub type PendingReply = BoxFuture<'static, Value>;

/// Receives every message sent on the bus.
pub trait MessageListener: Send + Sync {
    /// Claim `message` by returning the pending reply, or pass with `None`
    /// so other listeners can see it.
    fn on_message(&self, message: &Value) -> Option<PendingReply>;
}

/// Request/response and broadcast channel shared by both contexts.
pub struct MessageBus {
    listeners: RwLock<Vec<Arc<dyn MessageListener>>>,
    broadcast_tx: broadcast::Sender<Value>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            listeners: RwLock::new(Vec::new()),
            broadcast_tx,
        }
    }

    pub fn add_listener(&self, listener: Arc<dyn MessageListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(listener);
    }

    /// Sender half for listeners that push messages (e.g. status broadcasts).
    pub fn broadcaster(&self) -> broadcast::Sender<Value> {
        self.broadcast_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.broadcast_tx.subscribe()
    }

    /// Push `message` to every subscriber. Returns how many received it.
    pub fn broadcast(&self, message: Value) -> usize {
        self.broadcast_tx.send(message).unwrap_or(0)
    }

    /// Send a request and wait for its reply.
    ///
    /// `Ok(None)` when no listener claimed the message. The reply future runs
    /// on its own task, so the operation completes even if this call is
    /// dropped.
    pub async fn send_message(&self, message: Value) -> Result<Option<Value>> {
        let request_id = Uuid::new_v4();
        let pending = {
            let listeners = self
                .listeners
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            listeners
                .iter()
                .find_map(|listener| listener.on_message(&message))
        };

        let Some(pending) = pending else {
            debug!(%request_id, "no listener claimed message");
            return Ok(None);
        };

        debug!(%request_id, "message claimed, awaiting reply");
        let (reply_tx, reply_rx) = oneshot::channel();
        tokio::spawn(async move {
            let _ = reply_tx.send(pending.await);
        });
        let reply = reply_rx.await.map_err(|_| SkyauthError::ChannelClosed)?;
        debug!(%request_id, "reply received");
        Ok(Some(reply))
    }

    /// Typed wrapper over [`MessageBus::send_message`].
    pub async fn request(&self, action: Action) -> Result<Option<Reply>> {
        match self.send_message(Request::new(action).to_value()).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::FutureExt;
    use serde_json::json;

    use super::*;

    struct Echo {
        tag: &'static str,
        seen: AtomicUsize,
    }

    impl Echo {
        fn new(tag: &'static str) -> Arc<Self> {
            Arc::new(Self {
                tag,
                seen: AtomicUsize::new(0),
            })
        }
    }

    impl MessageListener for Echo {
        fn on_message(&self, message: &Value) -> Option<PendingReply> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            if message["action"] != self.tag {
                return None;
            }
            let tag = self.tag;
            Some(async move { json!({ "echo": tag }) }.boxed())
        }
    }

    struct Dropper;

    async fn crash() -> Value {
        panic!("listener crashed")
    }

    impl MessageListener for Dropper {
        fn on_message(&self, _message: &Value) -> Option<PendingReply> {
            Some(crash().boxed())
        }
    }

    #[tokio::test]
    async fn unclaimed_message_yields_no_reply() {
        let bus = MessageBus::new();
        bus.add_listener(Echo::new("ping"));
        let reply = bus.send_message(json!({ "action": "other" })).await.unwrap();
        assert!(reply.is_none());
    }

    #[tokio::test]
    async fn first_claiming_listener_answers() {
        let bus = MessageBus::new();
        let first = Echo::new("a");
        let second = Echo::new("b");
        bus.add_listener(first.clone());
        bus.add_listener(second.clone());

        let reply = bus.send_message(json!({ "action": "b" })).await.unwrap();
        assert_eq!(reply, Some(json!({ "echo": "b" })));
        assert_eq!(first.seen.load(Ordering::SeqCst), 1);
        assert_eq!(second.seen.load(Ordering::SeqCst), 1);

        let reply = bus.send_message(json!({ "action": "a" })).await.unwrap();
        assert_eq!(reply, Some(json!({ "echo": "a" })));
        assert_eq!(second.seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn crashed_reply_task_surfaces_channel_closed() {
        let bus = MessageBus::new();
        bus.add_listener(Arc::new(Dropper));
        let err = bus.send_message(json!({ "action": "x" })).await.unwrap_err();
        assert!(matches!(err, SkyauthError::ChannelClosed));
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let bus = MessageBus::new();
        assert_eq!(bus.broadcast(json!({ "n": 0 })), 0);

        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.broadcast(json!({ "n": 1 })), 2);
        assert_eq!(a.recv().await.unwrap(), json!({ "n": 1 }));
        assert_eq!(b.recv().await.unwrap(), json!({ "n": 1 }));
    }
}
