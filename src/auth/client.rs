use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use super::callback::CallbackParams;
use super::session::Session;
use crate::error::Result;

/// How the authorization server delivers its response to the redirect URI.
///
/// Fragment delivery keeps the code client-side; it is the only mode this
/// crate drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Fragment,
}

/// Options passed to [`OAuthClient::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizeOptions {
    pub scope: String,
    pub response_mode: ResponseMode,
}

impl AuthorizeOptions {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            response_mode: ResponseMode::Fragment,
        }
    }
}

/// Opaque application state correlating an authorization request with its
/// callback. Never inspected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OAuthState(String);

impl OAuthState {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Result of a successful callback: the new session and the echoed state.
#[derive(Clone)]
pub struct CallbackOutcome {
    pub session: Arc<dyn Session>,
    pub state: Option<OAuthState>,
}

impl fmt::Debug for CallbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackOutcome")
            .field("did", &self.session.did())
            .field("state", &self.state)
            .finish()
    }
}

/// OAuth client capability (PKCE, DPoP, token exchange and persistence).
///
/// Implementations own the single persisted session; [`OAuthClient::init`]
/// reads it fresh on every call.
#[async_trait]
pub trait OAuthClient: Send + Sync {
    /// Build the authorization URL for `input` (handle, DID or service URL).
    async fn authorize(&self, input: &str, options: &AuthorizeOptions) -> Result<Url>;

    /// Validate state, exchange the code and persist the resulting session.
    async fn callback(&self, params: CallbackParams) -> Result<CallbackOutcome>;

    /// Resume the persisted session, if any.
    async fn init(&self) -> Result<Option<Arc<dyn Session>>>;
}
