use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// Request for the host's interactive web authentication flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAuthFlowRequest {
    pub url: Url,
    pub interactive: bool,
}

impl WebAuthFlowRequest {
    pub fn interactive(url: Url) -> Self {
        Self {
            url,
            interactive: true,
        }
    }
}

/// Host capability that opens the provider's authorization page and waits
/// for the redirect back to the client.
#[async_trait]
pub trait WebAuthFlow: Send + Sync {
    /// Returns the final redirect URL, or `None` if the host finished without
    /// one. Must fail with
    /// [`HostFlowCancelled`](crate::error::SkyauthError::HostFlowCancelled)
    /// when the user closes the window.
    async fn launch(&self, request: WebAuthFlowRequest) -> Result<Option<String>>;
}
