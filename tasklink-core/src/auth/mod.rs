//! OAuth2 authorization code flow with PKCE.

pub mod callback;
pub mod manager;
pub mod pkce;
pub mod store;

pub use callback::{CallbackListener, CallbackParams};
pub use manager::{
    AuthState, AuthorizeOutcome, BrowserLauncher, OAuthConfig, TokenManager, DEFAULT_AUTH_TIMEOUT,
};
pub use store::{AuthSession, FileTokenStore, MemoryTokenStore, TokenSet, TokenStore};
