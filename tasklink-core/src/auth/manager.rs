//! OAuth2 token lifecycle: PKCE authorization, refresh, invalidation.
//!
//! # States
//!
//! ```text
//! Unauthenticated ──authorize()──▶ Authorizing ──▶ Authenticated
//!                                                   │      ▲
//!                                     refresh()     ▼      │
//!                                                 Refreshing
//!                                                   │
//!                                   invalid_grant   ▼
//!                                             Unauthenticated
//! ```
//!
//! The token set is written only here. Refresh is single-flight: callers that
//! arrive while a refresh is running await the same shared future.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use chrono::Utc;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Deserialize;

use super::callback::CallbackListener;
use super::pkce;
use super::store::{AuthSession, TokenSet, TokenStore};
use crate::error::AuthError;
use crate::flight::FlightGuard;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const TASKS_SCOPE: &str = "https://www.googleapis.com/auth/tasks";

/// Tokens expiring within this window are treated as expired.
pub const EXPIRY_BUFFER_SECS: i64 = 5 * 60;

pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(300);

/// OAuth client settings.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    /// Desktop clients of some providers still require the secret alongside PKCE.
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
    /// Local port for the redirect listener; 0 picks a free port.
    pub callback_port: u16,
    /// Upper bound on the browser interaction.
    pub auth_timeout: Duration,
}

impl OAuthConfig {
    /// Google endpoints with the Tasks scope.
    pub fn google(client_id: impl Into<String>, callback_port: u16) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            scopes: vec![TASKS_SCOPE.to_string()],
            callback_port,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }
}

/// Opens the authorization URL for the user.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> Result<(), AuthError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authorizing,
    Authenticated,
    Refreshing,
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthState::Unauthenticated => write!(f, "unauthenticated"),
            AuthState::Authorizing => write!(f, "authorizing"),
            AuthState::Authenticated => write!(f, "authenticated"),
            AuthState::Refreshing => write!(f, "refreshing"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizeOutcome {
    Authorized,
    /// Another authorization was already running; this call did nothing.
    AlreadyInProgress,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

type RefreshFlight = Shared<BoxFuture<'static, Result<TokenSet, AuthError>>>;

/// Owns the OAuth token set.
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: OAuthConfig,
    http: reqwest::Client,
    store: Arc<dyn TokenStore>,
    browser: Arc<dyn BrowserLauncher>,
    tokens: RwLock<Option<TokenSet>>,
    authorizing: AtomicBool,
    refreshing: AtomicBool,
    refresh: Mutex<Option<RefreshFlight>>,
}

fn expiry_buffer() -> chrono::Duration {
    chrono::Duration::seconds(EXPIRY_BUFFER_SECS)
}

impl TokenManager {
    pub fn new(
        config: OAuthConfig,
        store: Arc<dyn TokenStore>,
        browser: Arc<dyn BrowserLauncher>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                http: reqwest::Client::new(),
                store,
                browser,
                tokens: RwLock::new(None),
                authorizing: AtomicBool::new(false),
                refreshing: AtomicBool::new(false),
                refresh: Mutex::new(None),
            }),
        }
    }

    /// Loads persisted tokens, refreshing them if they are about to expire.
    ///
    /// A failed refresh leaves the manager unauthenticated for this session
    /// instead of retrying; the persisted refresh token is only removed when
    /// the server rejects it.
    pub async fn initialize(&self) -> Result<AuthState, AuthError> {
        let Some(tokens) = self.inner.store.load_tokens()? else {
            return Ok(AuthState::Unauthenticated);
        };
        let needs_refresh = tokens.expires_within(expiry_buffer(), Utc::now());
        self.inner.set_tokens(Some(tokens));

        if needs_refresh {
            tracing::debug!("Stored access token expires soon; refreshing");
            if let Err(e) = self.refresh_access_token().await {
                tracing::warn!("Discarding stored credentials after failed refresh: {}", e);
                self.inner.set_tokens(None);
                return Ok(AuthState::Unauthenticated);
            }
        }
        Ok(self.state())
    }

    pub fn state(&self) -> AuthState {
        if self.inner.authorizing.load(Ordering::SeqCst) {
            AuthState::Authorizing
        } else if self.inner.refreshing.load(Ordering::SeqCst) {
            AuthState::Refreshing
        } else if self.is_authenticated() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    /// True iff a token set exists and has not entered the expiry buffer.
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .current()
            .is_some_and(|tokens| !tokens.expires_within(expiry_buffer(), Utc::now()))
    }

    /// Snapshot of the current token set.
    pub fn tokens(&self) -> Option<TokenSet> {
        self.inner.current()
    }

    /// Returns a usable access token, refreshing first if it is about to expire.
    pub async fn access_token(&self) -> Result<String, AuthError> {
        let tokens = self.inner.current().ok_or(AuthError::NotAuthenticated)?;
        if tokens.expires_within(expiry_buffer(), Utc::now()) {
            return Ok(self.refresh_access_token().await?.access_token);
        }
        Ok(tokens.access_token)
    }

    /// Runs the PKCE authorization code flow in the user's browser.
    pub async fn authorize(&self) -> Result<AuthorizeOutcome, AuthError> {
        let Some(_flight) = FlightGuard::acquire(&self.inner.authorizing) else {
            tracing::debug!("Authorization already in progress; ignoring request");
            return Ok(AuthorizeOutcome::AlreadyInProgress);
        };

        let result = self.run_authorization().await;
        if let Err(e) = self.inner.store.clear_session() {
            tracing::warn!("Failed to clear PKCE session: {}", e);
        }
        result.map(|_| AuthorizeOutcome::Authorized)
    }

    async fn run_authorization(&self) -> Result<(), AuthError> {
        let mut listener = CallbackListener::bind(self.inner.config.callback_port).await?;
        let result = self.authorize_with(&mut listener).await;
        listener.close().await;
        result
    }

    async fn authorize_with(&self, listener: &mut CallbackListener) -> Result<(), AuthError> {
        let session = AuthSession {
            code_verifier: pkce::generate_verifier(),
            redirect_uri: listener.redirect_uri(),
            state: pkce::generate_state(),
        };
        self.inner.store.save_session(&session)?;

        let url = self.authorization_url(&session)?;
        tracing::info!("Opening browser for authorization");
        self.inner.browser.open(&url)?;

        let callback = listener
            .wait_for_code(self.inner.config.auth_timeout)
            .await?;
        if callback.state.as_deref() != Some(session.state.as_str()) {
            return Err(AuthError::StateMismatch);
        }

        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", callback.code.as_str()),
            ("redirect_uri", session.redirect_uri.as_str()),
            ("client_id", self.inner.config.client_id.as_str()),
            ("code_verifier", session.code_verifier.as_str()),
        ];
        if let Some(secret) = &self.inner.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        let tokens = self.inner.request_tokens(&form, None).await?;
        self.inner.persist(tokens)?;
        tracing::info!("Authorization complete");
        Ok(())
    }

    /// Builds the authorization URL for `session`.
    pub fn authorization_url(&self, session: &AuthSession) -> Result<String, AuthError> {
        let config = &self.inner.config;
        let scope = config.scopes.join(" ");
        let challenge = pkce::challenge_for(&session.code_verifier);
        reqwest::Url::parse_with_params(
            &config.auth_url,
            [
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", session.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", session.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map(String::from)
        .map_err(|e| AuthError::Browser(format!("invalid authorization URL: {}", e)))
    }

    /// Exchanges the refresh token for a new access token.
    ///
    /// Concurrent callers share one request. `invalid_grant` clears all
    /// credentials; other failures leave them untouched.
    pub async fn refresh_access_token(&self) -> Result<TokenSet, AuthError> {
        let flight = {
            let mut slot = self.inner.refresh_slot();
            match slot.as_ref() {
                Some(running) => running.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let flight = async move {
                        let result = inner.refresh_once().await;
                        inner.refresh_slot().take();
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = Some(flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    /// Wipes tokens and PKCE artifacts.
    pub fn clear(&self) -> Result<(), AuthError> {
        self.inner.wipe()
    }
}

impl Inner {
    fn current(&self) -> Option<TokenSet> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_tokens(&self, tokens: Option<TokenSet>) {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = tokens;
    }

    fn refresh_slot(&self) -> MutexGuard<'_, Option<RefreshFlight>> {
        self.refresh.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, tokens: TokenSet) -> Result<(), AuthError> {
        self.store.save_tokens(&tokens)?;
        self.set_tokens(Some(tokens));
        Ok(())
    }

    fn wipe(&self) -> Result<(), AuthError> {
        self.set_tokens(None);
        self.store.clear_tokens()?;
        self.store.clear_session()
    }

    async fn refresh_once(&self) -> Result<TokenSet, AuthError> {
        let refresh_token = self
            .current()
            .and_then(|tokens| tokens.refresh_token)
            .ok_or(AuthError::NotAuthenticated)?;

        let _flight = FlightGuard::acquire(&self.refreshing);
        let mut form = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
        ];
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        match self.request_tokens(&form, Some(&refresh_token)).await {
            Ok(tokens) => {
                self.persist(tokens.clone())?;
                tracing::info!("Access token refreshed");
                Ok(tokens)
            }
            Err(AuthError::InvalidGrant) => {
                tracing::warn!("Refresh token rejected; clearing stored credentials");
                self.wipe()?;
                Err(AuthError::InvalidGrant)
            }
            Err(e) => Err(e),
        }
    }

    async fn request_tokens(
        &self,
        form: &[(&str, &str)],
        previous_refresh: Option<&str>,
    ) -> Result<TokenSet, AuthError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) if err.error == "invalid_grant" => AuthError::InvalidGrant,
                Ok(err) => AuthError::TokenEndpoint {
                    error: err.error,
                    description: err.error_description.unwrap_or_default(),
                },
                Err(_) => AuthError::TokenEndpoint {
                    error: format!("HTTP {}", status.as_u16()),
                    description: body,
                },
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AuthError::Http(format!("invalid token response: {}", e)))?;
        Ok(TokenSet {
            access_token: token.access_token,
            refresh_token: token
                .refresh_token
                .or_else(|| previous_refresh.map(str::to_string)),
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        })
    }
}
