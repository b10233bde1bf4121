//! Configuration system (layered: env > config file > defaults).

pub mod metadata;

pub use metadata::ClientMetadata;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, SkyauthError};

/// Scope requested when none is configured.
pub const DEFAULT_SCOPE: &str = "atproto transition:generic";

/// Client name advertised in the client metadata when none is configured.
pub const DEFAULT_CLIENT_NAME: &str = "OAuth Example";

const ENV_CLIENT_ID: &str = "CLIENT_ID";
const ENV_REDIRECT_URI: &str = "REDIRECT_URI";
const ENV_HANDLE_RESOLVER: &str = "HANDLE_RESOLVER";
const ENV_SERVER_URL: &str = "SERVER_URL";
const ENV_SCOPE: &str = "OAUTH_SCOPE";
const ENV_CLIENT_NAME: &str = "OAUTH_CLIENT_NAME";

/// Static configuration for the session orchestrator.
///
/// Read once at startup and never changed at runtime.
///
/// # Example
/// ```
/// use skyauth::config::SkyauthConfig;
///
/// let config = SkyauthConfig::new(
///     "https://example.com/client-metadata.json",
///     "https://abc.chromiumapp.org/".parse()?,
///     "https://bsky.social",
///     "https://example.com".parse()?,
/// )
/// .with_exclusive_authenticate(true);
/// assert_eq!(config.scope, "atproto transition:generic");
/// # Ok::<(), url::ParseError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkyauthConfig {
    pub client_id: String,
    pub redirect_uri: Url,
    /// Passed to the OAuth client exactly as configured.
    pub handle_resolver: String,
    pub server_url: Url,
    pub scope: String,
    pub client_name: String,
    /// Reject a second authenticate while one is still pending.
    pub exclusive_authenticate: bool,
}

impl SkyauthConfig {
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: Url,
        handle_resolver: impl Into<String>,
        server_url: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            redirect_uri,
            handle_resolver: handle_resolver.into(),
            server_url,
            scope: DEFAULT_SCOPE.to_string(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            exclusive_authenticate: false,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_exclusive_authenticate(mut self, exclusive: bool) -> Self {
        self.exclusive_authenticate = exclusive;
        self
    }

    /// Default config file path (~/.skyauth/config.toml).
    pub fn default_path() -> PathBuf {
        directories::UserDirs::new()
            .map(|dirs| dirs.home_dir().join(".skyauth"))
            .unwrap_or_else(|| PathBuf::from(".skyauth"))
            .join("config.toml")
    }

    /// Load from environment variables only (`.env` is honored).
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_layers(ConfigFile::default(), |key| std::env::var(key).ok())
    }

    /// Load the config file (if present) and apply environment overrides.
    ///
    /// `path` defaults to [`SkyauthConfig::default_path`]. A missing file is
    /// not an error; a missing required value after layering is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);
        let file = ConfigFile::read(&path)?;
        Self::from_layers(file, |key| std::env::var(key).ok())
    }

    /// Resolve a config from a file layer and an environment lookup.
    pub fn from_layers(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pick = |key: &str, fallback: Option<String>| {
            env(key)
                .filter(|value| !value.trim().is_empty())
                .or(fallback)
        };

        let client_id = pick(ENV_CLIENT_ID, file.client_id).ok_or_else(|| missing(ENV_CLIENT_ID))?;
        let redirect_uri = parse_url(
            ENV_REDIRECT_URI,
            pick(ENV_REDIRECT_URI, file.redirect_uri),
        )?;
        let handle_resolver = pick(ENV_HANDLE_RESOLVER, file.handle_resolver)
            .map(|raw| raw.trim().to_string())
            .ok_or_else(|| missing(ENV_HANDLE_RESOLVER))?;
        validate_url(ENV_HANDLE_RESOLVER, &handle_resolver)?;
        let server_url = parse_url(ENV_SERVER_URL, pick(ENV_SERVER_URL, file.server_url))?;

        let mut config = Self::new(client_id, redirect_uri, handle_resolver, server_url)
            .with_exclusive_authenticate(file.exclusive_authenticate.unwrap_or(false));
        if let Some(scope) = pick(ENV_SCOPE, file.scope) {
            config.scope = scope;
        }
        if let Some(name) = pick(ENV_CLIENT_NAME, file.client_name) {
            config.client_name = name;
        }
        Ok(config)
    }

    /// OAuth client metadata document for this client.
    pub fn client_metadata(&self) -> ClientMetadata {
        ClientMetadata::for_config(self)
    }
}

/// On-disk representation of the config file. Every field is optional so the
/// environment can fill the gaps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub handle_resolver: Option<String>,
    pub server_url: Option<String>,
    pub scope: Option<String>,
    pub client_name: Option<String>,
    pub exclusive_authenticate: Option<bool>,
}

impl ConfigFile {
    /// Read a config file, returning an empty layer when it does not exist.
    pub fn read(path: &Path) -> Result<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(SkyauthError::Io(err)),
        };
        toml::from_str(&raw).map_err(|err| {
            SkyauthError::Configuration(format!("{}: {err}", path.display()))
        })
    }
}

fn missing(key: &str) -> SkyauthError {
    SkyauthError::Configuration(format!("{key} is not set"))
}

fn parse_url(key: &str, value: Option<String>) -> Result<Url> {
    let raw = value.ok_or_else(|| missing(key))?;
    validate_url(key, raw.trim())
}

fn validate_url(key: &str, raw: &str) -> Result<Url> {
    Url::parse(raw)
        .map_err(|err| SkyauthError::Configuration(format!("{key} is not a valid URL: {err}")))
}
