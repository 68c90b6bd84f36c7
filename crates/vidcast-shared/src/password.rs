//! Salted Argon2id password hashing.
//!
//! Stored form: `argon2id$<salt hex>$<hash hex>`. Verification recomputes
//! the hash with the stored salt and compares in constant time.

use argon2::Argon2;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::constants::{PASSWORD_HASH_SIZE, PASSWORD_SALT_SIZE};
use crate::error::SharedError;

const SCHEME: &str = "argon2id";

pub fn hash_password(password: &str) -> Result<String, SharedError> {
    let mut salt = [0u8; PASSWORD_SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let hash = derive(password.as_bytes(), &salt)?;
    Ok(format!("{SCHEME}${}${}", hex::encode(salt), hex::encode(hash)))
}

/// Returns `Ok(false)` for a wrong password, `Err` only when `stored` is not
/// a hash this module produced.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, SharedError> {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(salt_hex), Some(hash_hex), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(SharedError::MalformedPasswordHash);
    };

    let salt = hex::decode(salt_hex).map_err(|_| SharedError::MalformedPasswordHash)?;
    let expected = hex::decode(hash_hex).map_err(|_| SharedError::MalformedPasswordHash)?;
    if expected.len() != PASSWORD_HASH_SIZE {
        return Err(SharedError::MalformedPasswordHash);
    }

    let actual = derive(password.as_bytes(), &salt)?;
    Ok(actual.as_slice().ct_eq(expected.as_slice()).unwrap_u8() == 1)
}

fn derive(password: &[u8], salt: &[u8]) -> Result<[u8; PASSWORD_HASH_SIZE], SharedError> {
    let mut output = [0u8; PASSWORD_HASH_SIZE];
    Argon2::default()
        .hash_password_into(password, salt, &mut output)
        .map_err(|e| SharedError::PasswordHash(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correct_password_verifies() {
        let stored = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &stored).unwrap());
    }

    #[test]
    fn test_wrong_password_rejected() {
        let stored = hash_password("hunter2").unwrap();
        assert!(!verify_password("hunter3", &stored).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("argon2id$"));
    }

    #[test]
    fn test_plaintext_is_not_a_hash() {
        assert!(matches!(
            verify_password("secret", "secret"),
            Err(SharedError::MalformedPasswordHash)
        ));
    }
}
