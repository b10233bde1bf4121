//! Message router: dispatches inbound messages to orchestrator operations.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, error};

use crate::bus::{MessageBus, MessageListener, PendingReply};
use crate::orchestrator::SessionOrchestrator;
use crate::protocol::{Action, AuthenticateReply, Reply, SessionStatus};

const INTERNAL_ERROR: &str = "internal error while handling request";

/// Routes `authenticate`, `logout` and `get-session-status` to the
/// orchestrator. Anything else is left for other listeners.
#[derive(Clone)]
pub struct MessageRouter {
    orchestrator: Arc<SessionOrchestrator>,
    status_tx: Option<broadcast::Sender<Value>>,
}

impl MessageRouter {
    pub fn new(orchestrator: Arc<SessionOrchestrator>) -> Self {
        Self {
            orchestrator,
            status_tx: None,
        }
    }

    /// Also push a `session-status` message when an authenticate settles.
    pub fn with_status_broadcast(mut self, status_tx: broadcast::Sender<Value>) -> Self {
        self.status_tx = Some(status_tx);
        self
    }

    /// Build a router wired to `bus` for both replies and broadcasts, and
    /// register it as a listener.
    pub fn install(orchestrator: Arc<SessionOrchestrator>, bus: &MessageBus) -> Arc<Self> {
        let router = Arc::new(Self::new(orchestrator).with_status_broadcast(bus.broadcaster()));
        bus.add_listener(router.clone());
        router
    }

    /// Pending reply for a known action, `None` for everything else.
    pub fn route(&self, message: &Value) -> Option<PendingReply> {
        let action = Action::of(message)?;
        debug!(%action, "routing message");

        let orchestrator = self.orchestrator.clone();
        let status_tx = self.status_tx.clone();
        let operation = run(orchestrator.clone(), status_tx.clone(), action);

        Some(
            async move {
                match AssertUnwindSafe(operation).catch_unwind().await {
                    Ok(reply) => reply.to_value(),
                    Err(_) => {
                        error!(%action, "operation panicked, replying with failure");
                        orchestrator.abandon(action);
                        let reply = fallback_reply(action);
                        if let Reply::Authenticate(reply) = &reply {
                            publish_status(status_tx.as_ref(), reply);
                        }
                        reply.to_value()
                    }
                }
            }
            .boxed(),
        )
    }
}

impl MessageListener for MessageRouter {
    fn on_message(&self, message: &Value) -> Option<PendingReply> {
        self.route(message)
    }
}

async fn run(
    orchestrator: Arc<SessionOrchestrator>,
    status_tx: Option<broadcast::Sender<Value>>,
    action: Action,
) -> Reply {
    match action {
        Action::Authenticate => {
            let reply = orchestrator.authenticate().await;
            publish_status(status_tx.as_ref(), &reply);
            Reply::from(reply)
        }
        Action::Logout => Reply::from(orchestrator.logout().await),
        Action::GetSessionStatus => Reply::from(orchestrator.session_status().await),
    }
}

/// Mirror a settled authenticate as a `session-status` broadcast.
fn publish_status(status_tx: Option<&broadcast::Sender<Value>>, reply: &AuthenticateReply) {
    if let Some(status_tx) = status_tx {
        let status = Reply::from(SessionStatus::from(reply));
        let _ = status_tx.send(status.to_value());
    }
}

fn fallback_reply(action: Action) -> Reply {
    match action {
        Action::Authenticate => AuthenticateReply::failed(INTERNAL_ERROR).into(),
        Action::Logout | Action::GetSessionStatus => {
            SessionStatus::signed_out_with_error(INTERNAL_ERROR).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_reply_matches_action_shape() {
        assert!(matches!(
            fallback_reply(Action::Authenticate),
            Reply::Authenticate(AuthenticateReply { success: false, .. })
        ));
        match fallback_reply(Action::GetSessionStatus) {
            Reply::SessionStatus(status) => {
                assert!(!status.authenticated);
                assert_eq!(status.error.as_deref(), Some(INTERNAL_ERROR));
            }
            other => panic!("expected SessionStatus, got {other:?}"),
        }
    }
}
