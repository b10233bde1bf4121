//! Message envelopes exchanged between the popup and the background context.
//!
//! Requests carry a string `action` tag. Replies are JSON-compatible and come
//! in two shapes: the authenticate result (`success`) and the session status
//! (`action: "session-status"`), which is also broadcast.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::profile::Profile;

/// Tag carried by session-status replies and broadcasts.
pub const SESSION_STATUS_ACTION: &str = "session-status";

/// Request actions understood by the router.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Authenticate,
    Logout,
    GetSessionStatus,
}

impl Action {
    /// Read the action tag of an inbound message. `None` for anything that is
    /// not an object with a known string `action`.
    pub fn of(message: &serde_json::Value) -> Option<Self> {
        message.get("action")?.as_str()?.parse().ok()
    }
}

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub action: Action,
}

impl Request {
    pub fn new(action: Action) -> Self {
        Self { action }
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({ "action": <&'static str>::from(self.action) })
    }
}

/// Reply to `authenticate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticateReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthenticateReply {
    pub fn succeeded(profile: Profile) -> Self {
        Self {
            success: true,
            profile: Some(profile),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            profile: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusTag {
    #[default]
    #[serde(rename = "session-status")]
    SessionStatus,
}

/// Reply to `logout` / `get-session-status`, also pushed as a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub action: StatusTag,
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionStatus {
    pub fn authenticated(profile: Profile) -> Self {
        Self {
            action: StatusTag::SessionStatus,
            authenticated: true,
            profile: Some(profile),
            error: None,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            action: StatusTag::SessionStatus,
            authenticated: false,
            profile: None,
            error: None,
        }
    }

    pub fn signed_out_with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::signed_out()
        }
    }
}

impl From<&AuthenticateReply> for SessionStatus {
    fn from(reply: &AuthenticateReply) -> Self {
        match (&reply.profile, reply.success) {
            (Some(profile), true) => Self::authenticated(profile.clone()),
            _ => Self {
                error: reply.error.clone(),
                ..Self::signed_out()
            },
        }
    }
}

/// Any reply the background context sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply {
    SessionStatus(SessionStatus),
    Authenticate(AuthenticateReply),
}

impl Reply {
    pub fn to_value(&self) -> serde_json::Value {
        // Plain structs of strings and bools always serialize.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl From<AuthenticateReply> for Reply {
    fn from(reply: AuthenticateReply) -> Self {
        Self::Authenticate(reply)
    }
}

impl From<SessionStatus> for Reply {
    fn from(status: SessionStatus) -> Self {
        Self::SessionStatus(status)
    }
}
