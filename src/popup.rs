//! Popup controller: the short-lived UI side of the protocol.
//!
//! Holds no state of its own across activations. Every reply or pushed
//! status goes through [`ViewState::reduce`] and lands in a `watch` channel
//! the renderer observes.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::bus::MessageBus;
use crate::error::Result;
use crate::profile::Profile;
use crate::protocol::{Action, AuthenticateReply, Reply, Request, SessionStatus};

/// The two message kinds the popup renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupEvent {
    /// Direct reply to `authenticate`.
    AuthenticateResult(AuthenticateReply),
    /// Reply to `logout` / `get-session-status`, or a pushed broadcast.
    SessionStatus(SessionStatus),
}

impl PopupEvent {
    pub fn from_message(message: &Value) -> Option<Self> {
        match serde_json::from_value::<Reply>(message.clone()).ok()? {
            Reply::Authenticate(reply) => Some(Self::AuthenticateResult(reply)),
            Reply::SessionStatus(status) => Some(Self::SessionStatus(status)),
        }
    }
}

/// What the popup shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub profile: Option<Profile>,
    pub error_message: String,
}

impl ViewState {
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// Normalize either event kind. A profile means signed in; without one
    /// the popup is signed out and shows the error text, if any.
    pub fn reduce(event: &PopupEvent) -> Self {
        let (profile, error) = match event {
            PopupEvent::AuthenticateResult(reply) => (
                reply.profile.clone().filter(|_| reply.success),
                reply.error.clone(),
            ),
            PopupEvent::SessionStatus(status) => (
                status.profile.clone().filter(|_| status.authenticated),
                status.error.clone(),
            ),
        };
        match profile {
            Some(profile) => Self {
                profile: Some(profile),
                error_message: String::new(),
            },
            None => Self {
                profile: None,
                error_message: error.unwrap_or_default(),
            },
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.profile.is_some()
    }

    pub fn login_visible(&self) -> bool {
        !self.is_signed_in()
    }

    pub fn logout_visible(&self) -> bool {
        self.is_signed_in()
    }
}

/// Drives one popup instance over the bus.
pub struct PopupController {
    bus: Arc<MessageBus>,
    view_tx: watch::Sender<ViewState>,
}

impl PopupController {
    pub fn new(bus: Arc<MessageBus>) -> Self {
        let (view_tx, _) = watch::channel(ViewState::signed_out());
        Self { bus, view_tx }
    }

    pub fn view(&self) -> ViewState {
        self.view_tx.borrow().clone()
    }

    pub fn watch_view(&self) -> watch::Receiver<ViewState> {
        self.view_tx.subscribe()
    }

    /// Query the background for the current session; called on every open.
    pub async fn activate(&self) -> Result<()> {
        self.request(Action::GetSessionStatus).await
    }

    /// Start the OAuth flow and render its outcome.
    pub async fn login(&self) -> Result<()> {
        self.request(Action::Authenticate).await
    }

    /// Render signed-out immediately, then ask the background to sign out.
    pub async fn logout(&self) -> Result<()> {
        self.render(ViewState::signed_out());
        self.request(Action::Logout).await
    }

    /// Render a pushed message. Only `session-status` messages are taken;
    /// returns whether the message was rendered.
    pub fn handle_message(&self, message: &Value) -> bool {
        match PopupEvent::from_message(message) {
            Some(event @ PopupEvent::SessionStatus(_)) => {
                self.apply(&event);
                true
            }
            _ => false,
        }
    }

    pub fn apply(&self, event: &PopupEvent) {
        self.render(ViewState::reduce(event));
    }

    /// Render broadcasts from the bus until it shuts down.
    ///
    /// Subscribes before returning, so a broadcast sent after this call is
    /// never missed.
    pub fn listen(self: &Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => {
                        controller.handle_message(&message);
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "popup lagged behind broadcasts");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    async fn request(&self, action: Action) -> Result<()> {
        let reply = self.bus.send_message(Request::new(action).to_value()).await?;
        match reply.as_ref().and_then(PopupEvent::from_message) {
            Some(event) => self.apply(&event),
            None => debug!(%action, "no renderable reply"),
        }
        Ok(())
    }

    fn render(&self, view: ViewState) {
        self.view_tx.send_replace(view);
    }
}
