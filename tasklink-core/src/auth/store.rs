//! Persistence for OAuth tokens and the transient PKCE session.
//!
//! The file store keeps two JSON records in the data directory:
//!
//! ```text
//! <data_dir>/
//! ├── tokens.json         # durable TokenSet
//! └── auth_session.json   # PKCE verifier + redirect URI, only while authorizing
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

const TOKENS_FILE: &str = "tokens.json";
const SESSION_FILE: &str = "auth_session.json";

/// Access and refresh tokens with the access token's expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// Returns true if the access token expires within `buffer` of `now`.
    pub fn expires_within(&self, buffer: Duration, now: DateTime<Utc>) -> bool {
        self.expires_at - buffer <= now
    }
}

/// Ephemeral state between authorization start and code exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub code_verifier: String,
    pub redirect_uri: String,
    pub state: String,
}

/// Storage backend for credentials.
pub trait TokenStore: Send + Sync {
    fn load_tokens(&self) -> Result<Option<TokenSet>, AuthError>;
    fn save_tokens(&self, tokens: &TokenSet) -> Result<(), AuthError>;
    fn clear_tokens(&self) -> Result<(), AuthError>;

    fn load_session(&self) -> Result<Option<AuthSession>, AuthError>;
    fn save_session(&self, session: &AuthSession) -> Result<(), AuthError>;
    fn clear_session(&self) -> Result<(), AuthError>;
}

/// JSON files in a data directory.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    data_dir: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, AuthError> {
        let path = self.data_dir.join(name);
        match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| storage_error(&path, e)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(&path, e)),
        }
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), AuthError> {
        fs::create_dir_all(&self.data_dir).map_err(|e| storage_error(&self.data_dir, e))?;

        let path = self.data_dir.join(name);
        let json = serde_json::to_string_pretty(value).map_err(|e| storage_error(&path, e))?;
        fs::write(&path, json).map_err(|e| storage_error(&path, e))
    }

    fn remove(&self, name: &str) -> Result<(), AuthError> {
        let path = self.data_dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&path, e)),
        }
    }
}

fn storage_error(path: &Path, e: impl std::fmt::Display) -> AuthError {
    AuthError::Storage(format!("{}: {}", path.display(), e))
}

impl TokenStore for FileTokenStore {
    fn load_tokens(&self) -> Result<Option<TokenSet>, AuthError> {
        self.read(TOKENS_FILE)
    }

    fn save_tokens(&self, tokens: &TokenSet) -> Result<(), AuthError> {
        self.write(TOKENS_FILE, tokens)
    }

    fn clear_tokens(&self) -> Result<(), AuthError> {
        self.remove(TOKENS_FILE)
    }

    fn load_session(&self) -> Result<Option<AuthSession>, AuthError> {
        self.read(SESSION_FILE)
    }

    fn save_session(&self, session: &AuthSession) -> Result<(), AuthError> {
        self.write(SESSION_FILE, session)
    }

    fn clear_session(&self) -> Result<(), AuthError> {
        self.remove(SESSION_FILE)
    }
}

/// In-process store, used when nothing should touch the disk.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<TokenSet>>,
    session: Mutex<Option<AuthSession>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenSet) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
            session: Mutex::new(None),
        }
    }
}

fn lock_slot<T>(slot: &Mutex<Option<T>>) -> Result<MutexGuard<'_, Option<T>>, AuthError> {
    slot.lock()
        .map_err(|_| AuthError::Storage("credential store lock poisoned".to_string()))
}

impl TokenStore for MemoryTokenStore {
    fn load_tokens(&self) -> Result<Option<TokenSet>, AuthError> {
        Ok(lock_slot(&self.tokens)?.clone())
    }

    fn save_tokens(&self, tokens: &TokenSet) -> Result<(), AuthError> {
        *lock_slot(&self.tokens)? = Some(tokens.clone());
        Ok(())
    }

    fn clear_tokens(&self) -> Result<(), AuthError> {
        *lock_slot(&self.tokens)? = None;
        Ok(())
    }

    fn load_session(&self) -> Result<Option<AuthSession>, AuthError> {
        Ok(lock_slot(&self.session)?.clone())
    }

    fn save_session(&self, session: &AuthSession) -> Result<(), AuthError> {
        *lock_slot(&self.session)? = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> Result<(), AuthError> {
        *lock_slot(&self.session)? = None;
        Ok(())
    }
}
