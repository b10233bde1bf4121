//! Convenience re-exports for common use.

pub use crate::auth::{
    CallbackOutcome, CallbackParams, OAuthClient, OAuthState, Session, WebAuthFlow,
    WebAuthFlowRequest,
};
pub use crate::bus::{MessageBus, MessageListener};
pub use crate::config::SkyauthConfig;
pub use crate::error::{Result, SkyauthError};
pub use crate::orchestrator::SessionOrchestrator;
pub use crate::popup::{PopupController, ViewState};
pub use crate::profile::{Profile, ProfileFetcher, XrpcProfileFetcher};
pub use crate::protocol::{Action, AuthenticateReply, Reply, SessionStatus};
pub use crate::router::MessageRouter;
