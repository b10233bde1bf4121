//! Error types for skyauth.

use thiserror::Error;

/// Primary error type for all skyauth operations.
#[derive(Error, Debug)]
pub enum SkyauthError {
    #[error("no redirect url present")]
    MissingRedirect,

    #[error("invalid URL search params: {0}")]
    InvalidCallbackParams(String),

    #[error("authorization failed: {0}")]
    ProviderAuth(String),

    #[error("profile fetch failed: {0}")]
    ProfileFetch(String),

    #[error("authorization flow cancelled: {0}")]
    HostFlowCancelled(String),

    #[error("an authentication flow is already in progress")]
    AuthenticationInProgress,

    #[error("message channel closed before a reply was sent")]
    ChannelClosed,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broad error kind, used as a structured logging field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingRedirect,
    InvalidCallbackParams,
    ProviderAuth,
    ProfileFetch,
    HostFlowCancelled,
    Busy,
    Transport,
    Configuration,
}

impl SkyauthError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingRedirect => ErrorKind::MissingRedirect,
            Self::InvalidCallbackParams(_) => ErrorKind::InvalidCallbackParams,
            Self::ProviderAuth(_) => ErrorKind::ProviderAuth,
            Self::ProfileFetch(_) => ErrorKind::ProfileFetch,
            Self::HostFlowCancelled(_) => ErrorKind::HostFlowCancelled,
            Self::AuthenticationInProgress => ErrorKind::Busy,
            Self::ChannelClosed | Self::Serialization(_) | Self::Io(_) => ErrorKind::Transport,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Whether the failure came from the user backing out of the flow rather
    /// than from the provider or the network.
    pub fn is_user_cancellation(&self) -> bool {
        matches!(self, Self::HostFlowCancelled(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SkyauthError>;
