//! OAuth client metadata document.

use serde::{Deserialize, Serialize};

use super::SkyauthConfig;

/// Client metadata published at the `client_id` URL.
///
/// The authorization server fetches this document to learn the redirect URIs,
/// grant types and DPoP binding the client uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMetadata {
    pub client_id: String,
    pub client_name: String,
    pub client_uri: String,
    pub redirect_uris: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub application_type: String,
    pub scope: String,
    pub dpop_bound_access_tokens: bool,
}

impl ClientMetadata {
    /// Build the metadata for a public native client.
    pub fn for_config(config: &SkyauthConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_name: config.client_name.clone(),
            client_uri: config.server_url.to_string(),
            redirect_uris: vec![config.redirect_uri.to_string()],
            grant_types: vec!["authorization_code".to_string(), "refresh_token".to_string()],
            response_types: vec!["code".to_string()],
            token_endpoint_auth_method: "none".to_string(),
            application_type: "native".to_string(),
            scope: config.scope.clone(),
            dpop_bound_access_tokens: true,
        }
    }

    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
