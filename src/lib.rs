//! skyauth: OAuth session orchestration for browser-extension style hosts.
//!
//! A long-lived background context owns the OAuth client and answers
//! `authenticate`, `logout` and `get-session-status` requests from a
//! short-lived popup over an asynchronous message bus.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use skyauth::prelude::*;
//!
//! let config = SkyauthConfig::from_env()?;
//! let orchestrator = Arc::new(SessionOrchestrator::new(config, client, profiles, host));
//! let bus = Arc::new(MessageBus::new());
//! MessageRouter::install(orchestrator, &bus);
//!
//! let popup = Arc::new(PopupController::new(bus.clone()));
//! popup.listen();
//! popup.activate().await?;
//! ```

pub mod auth;
pub mod bus;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod popup;
pub mod prelude;
pub mod profile;
pub mod protocol;
pub mod router;

#[cfg(feature = "cli")]
pub mod cli;
