//! Profile value object and the profile-fetch capability.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::Session;
use crate::error::{Result, SkyauthError};

/// Service DID of the Bluesky app view, used for `atproto-proxy`.
pub const DEFAULT_APPVIEW_PROXY: &str = "did:web:api.bsky.app#bsky_appview";

const GET_PROFILE_PATH: &str = "/xrpc/app.bsky.actor.getProfile";

/// Profile fields rendered by the popup.
///
/// Produced fresh for every authenticated reply; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl Profile {
    pub fn new(handle: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            did: String::new(),
            handle: handle.into(),
            display_name: display_name.into(),
            avatar: None,
        }
    }

    pub fn with_did(mut self, did: impl Into<String>) -> Self {
        self.did = did.into();
        self
    }

    pub fn with_avatar(mut self, avatar: impl Into<String>) -> Self {
        self.avatar = Some(avatar.into());
        self
    }
}

/// Authenticated profile lookup for the session's own account.
#[async_trait]
pub trait ProfileFetcher: Send + Sync {
    async fn get_profile(&self, session: &dyn Session) -> Result<Profile>;
}

/// [`ProfileFetcher`] calling `app.bsky.actor.getProfile` through the
/// session's PDS.
///
/// # Example
/// ```no_run
/// use skyauth::profile::XrpcProfileFetcher;
///
/// let fetcher = XrpcProfileFetcher::new().with_proxy(None);
/// ```
#[derive(Debug, Clone)]
pub struct XrpcProfileFetcher {
    http: reqwest::Client,
    service_url: Option<Url>,
    proxy: Option<String>,
}

impl Default for XrpcProfileFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl XrpcProfileFetcher {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            service_url: None,
            proxy: Some(DEFAULT_APPVIEW_PROXY.to_string()),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or testing).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http = client;
        self
    }

    /// Send requests here instead of the session's own service.
    pub fn with_service_url(mut self, url: Url) -> Self {
        self.service_url = Some(url);
        self
    }

    /// Override (or, with `None`, drop) the `atproto-proxy` header.
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy;
        self
    }

    fn endpoint(&self, session: &dyn Session) -> Result<Url> {
        let base = self
            .service_url
            .clone()
            .unwrap_or_else(|| session.service_url().clone());
        let mut url = base
            .join(GET_PROFILE_PATH)
            .map_err(|err| SkyauthError::ProfileFetch(format!("bad service url: {err}")))?;
        url.query_pairs_mut().clear().append_pair("actor", session.did());
        Ok(url)
    }
}

#[async_trait]
impl ProfileFetcher for XrpcProfileFetcher {
    async fn get_profile(&self, session: &dyn Session) -> Result<Profile> {
        let url = self.endpoint(session)?;
        let headers = session.request_headers("GET", &url).await?;

        let mut request = self.http.get(url.clone());
        for (name, value) in headers {
            request = request.header(name, value);
        }
        if let Some(proxy) = &self.proxy {
            request = request.header("atproto-proxy", proxy);
        }

        debug!(did = session.did(), url = %url, "fetching profile");
        let response = request
            .send()
            .await
            .map_err(|err| SkyauthError::ProfileFetch(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SkyauthError::ProfileFetch(format!(
                "HTTP {}: {}",
                status.as_u16(),
                xrpc_error_message(&body)
            )));
        }
        response
            .json::<Profile>()
            .await
            .map_err(|err| SkyauthError::ProfileFetch(format!("invalid profile response: {err}")))
    }
}

/// Prefer the XRPC `message` (or `error`) field over the raw body.
fn xrpc_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .or_else(|| value.get("error"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}
