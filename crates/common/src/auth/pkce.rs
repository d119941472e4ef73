//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for authorization without a client secret in the
//! browser. All randomness is drawn from an [`EntropySource`] so that a
//! failing random source surfaces as an error instead of degrading the
//! strength of `state` or `code_verifier`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::errors::EntropyError;
use super::traits::EntropySource;

/// Raw bytes drawn for the CSRF `state` parameter (43 chars encoded).
pub const STATE_BYTES: usize = 32;

/// Raw bytes drawn for the code verifier (128 chars encoded, the RFC 7636
/// upper bound).
pub const VERIFIER_BYTES: usize = 96;

/// Challenge method sent with every authorization request.
pub const CHALLENGE_METHOD: &str = "S256";

/// Entropy source backed by the operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill_bytes(&self, buf: &mut [u8]) -> Result<(), EntropyError> {
        OsRng.try_fill_bytes(buf).map_err(|e| EntropyError::Unavailable(e.to_string()))
    }
}

fn random_url_safe(entropy: &dyn EntropySource, len: usize) -> Result<String, EntropyError> {
    let mut bytes = vec![0u8; len];
    entropy.fill_bytes(&mut bytes)?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Generate a cryptographically secure code verifier
///
/// Returns 96 random bytes encoded as URL-safe base64 without padding
/// (128 characters).
///
/// # Errors
/// Returns [`EntropyError`] if the random source cannot produce bytes.
pub fn generate_code_verifier(entropy: &dyn EntropySource) -> Result<String, EntropyError> {
    random_url_safe(entropy, VERIFIER_BYTES)
}

/// Generate code challenge from verifier using SHA256
///
/// Per RFC 7636, the challenge is BASE64URL(SHA256(ASCII(code_verifier))).
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Generate a random state token for CSRF protection
///
/// # Errors
/// Returns [`EntropyError`] if the random source cannot produce bytes.
pub fn generate_state(entropy: &dyn EntropySource) -> Result<String, EntropyError> {
    random_url_safe(entropy, STATE_BYTES)
}

/// Validate that the state returned by the provider matches the stored one.
///
/// Exact byte comparison: no prefix matching, no case folding.
#[must_use]
pub fn validate_state(expected: &str, actual: &str) -> bool {
    expected.as_bytes() == actual.as_bytes()
}

/// PKCE challenge pair plus CSRF state for one authorization attempt
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// Random string kept in client storage until the token exchange
    pub code_verifier: String,

    /// SHA256 of `code_verifier`, sent with the authorization request
    pub code_challenge: String,

    /// Random CSRF token, must come back unchanged on the callback
    pub state: String,
}

impl PkceChallenge {
    /// Generate a fresh challenge from the given entropy source.
    ///
    /// # Errors
    /// Returns [`EntropyError`] if the random source fails.
    pub fn generate(entropy: &dyn EntropySource) -> Result<Self, EntropyError> {
        let state = generate_state(entropy)?;
        let code_verifier = generate_code_verifier(entropy)?;
        let code_challenge = generate_code_challenge(&code_verifier);

        Ok(Self { code_verifier, code_challenge, state })
    }

    /// Get the challenge method (always "S256")
    #[must_use]
    pub fn challenge_method(&self) -> &str {
        CHALLENGE_METHOD
    }
}
