//! CLI command handlers. Each returns the text to print.

use std::path::Path;

use crate::auth::parse_redirect;
use crate::config::SkyauthConfig;
use crate::error::Result;

/// `skyauth metadata`
pub fn render_metadata(config_path: Option<&Path>) -> Result<String> {
    let config = SkyauthConfig::load(config_path)?;
    config.client_metadata().to_json_pretty()
}

/// `skyauth parse-callback <url>`
pub fn render_callback(url: &str) -> Result<String> {
    let params = parse_redirect(Some(url))?;
    Ok(serde_json::to_string_pretty(&params.to_json())?)
}

/// `skyauth config`
pub fn render_config(config_path: Option<&Path>) -> Result<String> {
    let config = SkyauthConfig::load(config_path)?;
    Ok(serde_json::to_string_pretty(&config)?)
}
