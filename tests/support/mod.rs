#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use url::Url;

use skyauth::auth::{
    AuthorizeOptions, CallbackOutcome, CallbackParams, OAuthClient, OAuthState, Session,
    WebAuthFlow, WebAuthFlowRequest,
};
use skyauth::config::SkyauthConfig;
use skyauth::error::{Result, SkyauthError};
use skyauth::orchestrator::SessionOrchestrator;
use skyauth::profile::{Profile, ProfileFetcher};

pub const ALICE_DID: &str = "did:plc:alice";
pub const AUTHORIZE_URL: &str = "https://bsky.social/oauth/authorize?request_uri=urn:req:1";
pub const GOOD_REDIRECT: &str = "https://abc.chromiumapp.org/#state=abc&code=123&iss=https%3A%2F%2Fbsky.social";

pub fn test_config() -> SkyauthConfig {
    SkyauthConfig::new(
        "https://example.com/client-metadata.json",
        "https://abc.chromiumapp.org/".parse().unwrap(),
        "https://bsky.social",
        "https://example.com".parse().unwrap(),
    )
}

pub fn alice() -> Profile {
    Profile::new("alice.test", "Alice")
        .with_did(ALICE_DID)
        .with_avatar("https://cdn.example/alice.jpg")
}

type SessionSlot = Arc<Mutex<Option<Arc<FakeSession>>>>;

/// Session whose sign-out drops it from the owning client's storage.
pub struct FakeSession {
    did: String,
    service_url: Url,
    storage: SessionSlot,
    pub sign_outs: AtomicUsize,
    fail_sign_out: bool,
}

impl FakeSession {
    pub fn sign_out_count(&self) -> usize {
        self.sign_outs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for FakeSession {
    fn did(&self) -> &str {
        &self.did
    }

    fn service_url(&self) -> &Url {
        &self.service_url
    }

    async fn request_headers(&self, _method: &str, _url: &Url) -> Result<Vec<(String, String)>> {
        Ok(vec![
            ("authorization".to_string(), "DPoP access-token".to_string()),
            ("dpop".to_string(), "proof-jwt".to_string()),
        ])
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        if self.fail_sign_out {
            return Err(SkyauthError::ProviderAuth("revocation endpoint unreachable".into()));
        }
        self.storage.lock().unwrap().take();
        Ok(())
    }
}

/// OAuth client that persists one session in memory.
pub struct FakeOAuthClient {
    storage: SessionSlot,
    service_url: Url,
    pub authorize_calls: Mutex<Vec<(String, AuthorizeOptions)>>,
    pub callbacks: Mutex<Vec<Vec<(String, String)>>>,
    pub init_calls: AtomicUsize,
    callback_error: Mutex<Option<String>>,
    init_error: Mutex<Option<String>>,
    fail_sign_out: Mutex<bool>,
}

impl FakeOAuthClient {
    pub fn new() -> Self {
        Self::with_service_url("https://pds.example".parse().unwrap())
    }

    pub fn with_service_url(service_url: Url) -> Self {
        Self {
            storage: Arc::new(Mutex::new(None)),
            service_url,
            authorize_calls: Mutex::new(Vec::new()),
            callbacks: Mutex::new(Vec::new()),
            init_calls: AtomicUsize::new(0),
            callback_error: Mutex::new(None),
            init_error: Mutex::new(None),
            fail_sign_out: Mutex::new(false),
        }
    }

    fn new_session(&self) -> Arc<FakeSession> {
        Arc::new(FakeSession {
            did: ALICE_DID.to_string(),
            service_url: self.service_url.clone(),
            storage: self.storage.clone(),
            sign_outs: AtomicUsize::new(0),
            fail_sign_out: *self.fail_sign_out.lock().unwrap(),
        })
    }

    /// Pretend a previous run already stored a session.
    pub fn seed_session(&self) -> Arc<FakeSession> {
        let session = self.new_session();
        *self.storage.lock().unwrap() = Some(session.clone());
        session
    }

    pub fn persisted(&self) -> Option<Arc<FakeSession>> {
        self.storage.lock().unwrap().clone()
    }

    pub fn fail_callback(&self, message: &str) {
        *self.callback_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_init(&self, message: &str) {
        *self.init_error.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_sign_out(&self) {
        *self.fail_sign_out.lock().unwrap() = true;
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.lock().unwrap().len()
    }
}

#[async_trait]
impl OAuthClient for FakeOAuthClient {
    async fn authorize(&self, input: &str, options: &AuthorizeOptions) -> Result<Url> {
        self.authorize_calls
            .lock()
            .unwrap()
            .push((input.to_string(), options.clone()));
        Ok(AUTHORIZE_URL.parse().unwrap())
    }

    async fn callback(&self, params: CallbackParams) -> Result<CallbackOutcome> {
        let state = params.get("state").map(OAuthState::new);
        self.callbacks.lock().unwrap().push(params.into_pairs());
        if let Some(message) = self.callback_error.lock().unwrap().clone() {
            return Err(SkyauthError::ProviderAuth(message));
        }
        let session = self.new_session();
        *self.storage.lock().unwrap() = Some(session.clone());
        Ok(CallbackOutcome { session, state })
    }

    async fn init(&self) -> Result<Option<Arc<dyn Session>>> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.init_error.lock().unwrap().clone() {
            return Err(SkyauthError::ProviderAuth(message));
        }
        Ok(self
            .storage
            .lock()
            .unwrap()
            .clone()
            .map(|session| session as Arc<dyn Session>))
    }
}

/// Profile fetcher returning a fixed profile and counting calls.
pub struct FakeProfileFetcher {
    pub calls: AtomicUsize,
    error: Mutex<Option<String>>,
    panic: Mutex<bool>,
}

impl FakeProfileFetcher {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            error: Mutex::new(None),
            panic: Mutex::new(false),
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.error.lock().unwrap() = Some(message.to_string());
    }

    pub fn panic_on_fetch(&self) {
        *self.panic.lock().unwrap() = true;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileFetcher for FakeProfileFetcher {
    async fn get_profile(&self, session: &dyn Session) -> Result<Profile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let should_panic = *self.panic.lock().unwrap();
        if should_panic {
            panic!("profile fetcher exploded");
        }
        if let Some(message) = self.error.lock().unwrap().clone() {
            return Err(SkyauthError::ProfileFetch(message));
        }
        Ok(alice().with_did(session.did()))
    }
}

/// Scripted host web-auth flow.
#[derive(Clone)]
pub enum FlowOutcome {
    Redirect(String),
    NoRedirect,
    Cancel(String),
}

pub struct FakeAuthFlow {
    outcome: Mutex<FlowOutcome>,
    pub requests: Mutex<Vec<WebAuthFlowRequest>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeAuthFlow {
    pub fn new(outcome: FlowOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            requests: Mutex::new(Vec::new()),
            gate: Mutex::new(None),
        }
    }

    pub fn set_outcome(&self, outcome: FlowOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    /// Block every launch until a permit is added to the returned semaphore.
    pub fn hold(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn launch_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl WebAuthFlow for FakeAuthFlow {
    async fn launch(&self, request: WebAuthFlowRequest) -> Result<Option<String>> {
        self.requests.lock().unwrap().push(request);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        match self.outcome.lock().unwrap().clone() {
            FlowOutcome::Redirect(url) => Ok(Some(url)),
            FlowOutcome::NoRedirect => Ok(None),
            FlowOutcome::Cancel(message) => Err(SkyauthError::HostFlowCancelled(message)),
        }
    }
}

pub struct Harness {
    pub client: Arc<FakeOAuthClient>,
    pub profiles: Arc<FakeProfileFetcher>,
    pub flow: Arc<FakeAuthFlow>,
    pub orchestrator: Arc<SessionOrchestrator>,
}

pub fn harness() -> Harness {
    harness_with(test_config())
}

pub fn harness_with(config: SkyauthConfig) -> Harness {
    let client = Arc::new(FakeOAuthClient::new());
    let profiles = Arc::new(FakeProfileFetcher::new());
    let flow = Arc::new(FakeAuthFlow::new(FlowOutcome::Redirect(GOOD_REDIRECT.to_string())));
    let orchestrator = Arc::new(SessionOrchestrator::new(
        config,
        client.clone(),
        profiles.clone(),
        flow.clone(),
    ));
    Harness {
        client,
        profiles,
        flow,
        orchestrator,
    }
}
