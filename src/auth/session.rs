use async_trait::async_trait;
use url::Url;

use crate::error::Result;

/// Credential-bearing handle produced by an [`OAuthClient`](super::OAuthClient).
///
/// Tokens, DPoP keys and refresh live behind this trait; callers only ever
/// see the account DID, the service it is bound to, and ready-made request
/// headers.
#[async_trait]
pub trait Session: Send + Sync {
    /// DID of the authenticated account.
    fn did(&self) -> &str;

    /// Service (PDS) the session's tokens are valid for.
    fn service_url(&self) -> &Url;

    /// Headers authorizing a single request (`Authorization`, `DPoP`, ...).
    async fn request_headers(&self, method: &str, url: &Url) -> Result<Vec<(String, String)>>;

    /// Revoke the session's tokens and drop them from persistent storage.
    async fn sign_out(&self) -> Result<()>;
}
