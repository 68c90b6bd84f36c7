//! Signed access tokens.
//!
//! A token is `base64url(claims json) "." base64url(ed25519 signature)`.
//! The server holds the only signing key, derived from a configured secret,
//! so verification needs no database round trip beyond resolving the user.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::constants::KDF_CONTEXT_ACCESS_TOKEN;
use crate::error::SharedError;
use crate::types::UserId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessClaims {
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    pub valid_until: DateTime<Utc>,
}

impl AccessClaims {
    pub fn new(user_id: UserId, email: &str, name: &str, ttl: Duration) -> Self {
        Self {
            user_id,
            email: email.to_string(),
            name: name.to_string(),
            valid_until: Utc::now() + ttl,
        }
    }
}

#[derive(Clone)]
pub struct TokenSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl TokenSigner {
    /// Deterministic signer: the same secret always yields the same key, so
    /// tokens survive restarts.
    pub fn from_secret(secret: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new_derive_key(KDF_CONTEXT_ACCESS_TOKEN);
        hasher.update(secret);
        let seed: [u8; 32] = *hasher.finalize().as_bytes();
        Self::from_signing_key(SigningKey::from_bytes(&seed))
    }

    /// Throwaway signer; tokens die with the process.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    pub fn issue(&self, claims: &AccessClaims) -> Result<String, SharedError> {
        let payload = serde_json::to_vec(claims)?;
        let signature = self.signing_key.sign(&payload);
        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }

    pub fn verify(&self, token: &str) -> Result<AccessClaims, SharedError> {
        let (payload_b64, signature_b64) =
            token.split_once('.').ok_or(SharedError::TokenMalformed)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| SharedError::TokenMalformed)?;
        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SharedError::TokenMalformed)?;
        let signature =
            Signature::from_slice(&signature_bytes).map_err(|_| SharedError::TokenMalformed)?;

        self.verifying_key
            .verify(&payload, &signature)
            .map_err(|_| SharedError::TokenSignature)?;

        let claims: AccessClaims = serde_json::from_slice(&payload)?;
        if Utc::now() > claims.valid_until {
            return Err(SharedError::TokenExpired);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("verifying_key", &hex::encode(self.verifying_key.to_bytes()))
            .finish_non_exhaustive()
    }
}
