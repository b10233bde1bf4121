//! OAuth capabilities consumed by the orchestrator and the fragment callback parser.

pub mod callback;
pub mod client;
pub mod flow;
pub mod session;

pub use callback::{complete_callback, parse_redirect, CallbackParams};
pub use client::{AuthorizeOptions, CallbackOutcome, OAuthClient, OAuthState, ResponseMode};
pub use flow::{WebAuthFlow, WebAuthFlowRequest};
pub use session::Session;
