//! Session orchestrator: drives authenticate / logout / status against the
//! injected OAuth, profile and host capabilities.
//!
//! Every operation settles into a reply value. Failures are logged and folded
//! into the reply so a waiting popup is always answered.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::auth::{
    complete_callback, AuthorizeOptions, OAuthClient, Session, WebAuthFlow, WebAuthFlowRequest,
};
use crate::config::SkyauthConfig;
use crate::error::{Result, SkyauthError};
use crate::profile::{Profile, ProfileFetcher};
use crate::protocol::{Action, AuthenticateReply, SessionStatus};

/// Lifecycle of a single operation invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OperationPhase {
    #[default]
    Idle,
    Pending,
    Resolved,
    Rejected,
}

/// Point-in-time view of the orchestrator. Subscribe via
/// [`SessionOrchestrator::watch_snapshot`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorSnapshot {
    /// Phase of the most recent invocation of each operation.
    pub authenticate: OperationPhase,
    pub logout: OperationPhase,
    pub session_status: OperationPhase,
    pub authenticate_in_flight: usize,
    pub has_active_session: bool,
}

impl OrchestratorSnapshot {
    fn phase_mut(&mut self, action: Action) -> &mut OperationPhase {
        match action {
            Action::Authenticate => &mut self.authenticate,
            Action::Logout => &mut self.logout,
            Action::GetSessionStatus => &mut self.session_status,
        }
    }
}

/// Owns the OAuth client capability and the active session slot.
///
/// # Example
/// ```ignore
/// let orchestrator = SessionOrchestrator::new(config, client, profiles, host);
/// let status = orchestrator.session_status().await;
/// ```
pub struct SessionOrchestrator {
    config: SkyauthConfig,
    client: Arc<dyn OAuthClient>,
    profiles: Arc<dyn ProfileFetcher>,
    host: Arc<dyn WebAuthFlow>,
    active: Mutex<Option<Arc<dyn Session>>>,
    auth_gate: tokio::sync::Mutex<()>,
    snapshot_tx: watch::Sender<OrchestratorSnapshot>,
}

impl SessionOrchestrator {
    pub fn new(
        config: SkyauthConfig,
        client: Arc<dyn OAuthClient>,
        profiles: Arc<dyn ProfileFetcher>,
        host: Arc<dyn WebAuthFlow>,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(OrchestratorSnapshot::default());
        Self {
            config,
            client,
            profiles,
            host,
            active: Mutex::new(None),
            auth_gate: tokio::sync::Mutex::new(()),
            snapshot_tx,
        }
    }

    pub fn config(&self) -> &SkyauthConfig {
        &self.config
    }

    pub fn snapshot(&self) -> OrchestratorSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn watch_snapshot(&self) -> watch::Receiver<OrchestratorSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Session stored by the last successful authenticate, if not logged out since.
    pub fn active_session(&self) -> Option<Arc<dyn Session>> {
        self.lock_active().clone()
    }

    /// Run the full OAuth flow and fetch the signed-in profile.
    pub async fn authenticate(&self) -> AuthenticateReply {
        let _in_flight = InFlight::enter(&self.snapshot_tx);
        self.set_phase(Action::Authenticate, OperationPhase::Pending);

        match self.run_authenticate().await {
            Ok(profile) => {
                self.set_phase(Action::Authenticate, OperationPhase::Resolved);
                info!(handle = %profile.handle, "authentication succeeded");
                AuthenticateReply::succeeded(profile)
            }
            Err(err) => {
                self.set_phase(Action::Authenticate, OperationPhase::Rejected);
                if err.is_user_cancellation() {
                    warn!(error = %err, "authentication cancelled by user");
                } else {
                    error!(error = %err, kind = ?err.kind(), "authentication failed");
                }
                AuthenticateReply::failed(err.to_string())
            }
        }
    }

    async fn run_authenticate(&self) -> Result<Profile> {
        let _exclusive = if self.config.exclusive_authenticate {
            Some(
                self.auth_gate
                    .try_lock()
                    .map_err(|_| SkyauthError::AuthenticationInProgress)?,
            )
        } else {
            None
        };

        let options = AuthorizeOptions::new(self.config.scope.clone());
        let authorize_url = self
            .client
            .authorize(&self.config.handle_resolver, &options)
            .await?;

        debug!(url = %authorize_url, "launching interactive auth flow");
        let redirect = self
            .host
            .launch(WebAuthFlowRequest::interactive(authorize_url))
            .await?;

        let outcome = complete_callback(self.client.as_ref(), redirect.as_deref()).await?;
        debug!(
            did = outcome.session.did(),
            has_state = outcome.state.is_some(),
            "oauth callback completed"
        );
        self.store_session(outcome.session.clone());

        // A profile failure past this point leaves the new session stored.
        self.profiles.get_profile(outcome.session.as_ref()).await
    }

    /// Sign out whatever session the client persists. Always replies
    /// unauthenticated.
    pub async fn logout(&self) -> SessionStatus {
        self.set_phase(Action::Logout, OperationPhase::Pending);
        let result = self.run_logout().await;
        self.clear_session();

        match result {
            Ok(signed_out) => {
                self.set_phase(Action::Logout, OperationPhase::Resolved);
                debug!(signed_out, "logout completed");
                SessionStatus::signed_out()
            }
            Err(err) => {
                self.set_phase(Action::Logout, OperationPhase::Rejected);
                warn!(error = %err, kind = ?err.kind(), "logout failed");
                SessionStatus::signed_out_with_error(err.to_string())
            }
        }
    }

    async fn run_logout(&self) -> Result<bool> {
        match self.client.init().await? {
            Some(session) => {
                session.sign_out().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Resume the persisted session and report it with a freshly fetched profile.
    pub async fn session_status(&self) -> SessionStatus {
        self.set_phase(Action::GetSessionStatus, OperationPhase::Pending);

        match self.run_session_status().await {
            Ok(Some(profile)) => {
                self.set_phase(Action::GetSessionStatus, OperationPhase::Resolved);
                SessionStatus::authenticated(profile)
            }
            Ok(None) => {
                self.set_phase(Action::GetSessionStatus, OperationPhase::Resolved);
                debug!("no active session found");
                SessionStatus::signed_out()
            }
            Err(err) => {
                self.set_phase(Action::GetSessionStatus, OperationPhase::Rejected);
                warn!(error = %err, kind = ?err.kind(), "session status check failed");
                SessionStatus::signed_out_with_error(err.to_string())
            }
        }
    }

    async fn run_session_status(&self) -> Result<Option<Profile>> {
        let Some(session) = self.client.init().await? else {
            return Ok(None);
        };
        let profile = self.profiles.get_profile(session.as_ref()).await?;
        Ok(Some(profile))
    }

    /// Settle `action` as rejected after its future unwound, so the
    /// published phase never stays `Pending`.
    pub fn abandon(&self, action: Action) {
        self.set_phase(action, OperationPhase::Rejected);
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<Arc<dyn Session>>> {
        self.active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn store_session(&self, session: Arc<dyn Session>) {
        *self.lock_active() = Some(session);
        self.snapshot_tx
            .send_modify(|snapshot| snapshot.has_active_session = true);
    }

    fn clear_session(&self) {
        self.lock_active().take();
        self.snapshot_tx
            .send_modify(|snapshot| snapshot.has_active_session = false);
    }

    fn set_phase(&self, action: Action, phase: OperationPhase) {
        self.snapshot_tx
            .send_modify(|snapshot| *snapshot.phase_mut(action) = phase);
    }
}

/// Counts an authenticate as in flight until dropped, including when the
/// caller drops the future mid-flow.
struct InFlight<'a> {
    snapshot_tx: &'a watch::Sender<OrchestratorSnapshot>,
}

impl<'a> InFlight<'a> {
    fn enter(snapshot_tx: &'a watch::Sender<OrchestratorSnapshot>) -> Self {
        snapshot_tx.send_modify(|snapshot| snapshot.authenticate_in_flight += 1);
        Self { snapshot_tx }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.snapshot_tx.send_modify(|snapshot| {
            snapshot.authenticate_in_flight = snapshot.authenticate_in_flight.saturating_sub(1);
        });
    }
}
