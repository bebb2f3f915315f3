//! PKCE (RFC 7636) verifier and challenge generation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of random bytes behind a code verifier (43 base64url characters).
const VERIFIER_BYTES: usize = 32;
const STATE_BYTES: usize = 16;

/// Generates a code verifier: 32 random bytes, base64url, no padding.
pub fn generate_verifier() -> String {
    random_token::<VERIFIER_BYTES>()
}

/// Derives the S256 code challenge for `verifier`.
pub fn challenge_for(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Generates the opaque `state` value echoed back by the authorization server.
pub fn generate_state() -> String {
    random_token::<STATE_BYTES>()
}

fn random_token<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
