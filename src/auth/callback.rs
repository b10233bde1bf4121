//! Fragment callback parsing.

use tracing::debug;
use url::form_urlencoded;
use url::Url;

use super::client::{CallbackOutcome, OAuthClient};
use crate::error::{Result, SkyauthError};

/// Decoded OAuth response parameters, in the order they appeared.
///
/// Only built by [`parse_redirect`], so it always holds at least one pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackParams(Vec<(String, String)>);

impl CallbackParams {
    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.0
    }

    /// JSON object view (later duplicates win).
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// Extract the OAuth response parameters from a redirect URL's fragment.
pub fn parse_redirect(redirect: Option<&str>) -> Result<CallbackParams> {
    let raw = redirect
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(SkyauthError::MissingRedirect)?;

    let url = Url::parse(raw)
        .map_err(|err| SkyauthError::InvalidCallbackParams(format!("unparseable redirect url: {err}")))?;
    let fragment = url.fragment().ok_or_else(|| {
        SkyauthError::InvalidCallbackParams("redirect url has no fragment".to_string())
    })?;

    let pairs: Vec<(String, String)> = form_urlencoded::parse(fragment.as_bytes())
        .into_owned()
        .filter(|(key, _)| !key.is_empty())
        .collect();
    if pairs.is_empty() {
        return Err(SkyauthError::InvalidCallbackParams(
            "fragment carries no parameters".to_string(),
        ));
    }
    Ok(CallbackParams(pairs))
}

/// Parse `redirect` and hand the parameters to `client.callback` verbatim.
///
/// The client is not called when parsing fails.
pub async fn complete_callback(
    client: &dyn OAuthClient,
    redirect: Option<&str>,
) -> Result<CallbackOutcome> {
    let params = parse_redirect(redirect)?;
    debug!(keys = ?params.keys().collect::<Vec<_>>(), "handing callback params to oauth client");
    client.callback(params).await
}
