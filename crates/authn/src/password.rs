//! Password hashing with Argon2id.
//!
//! Hashes are PHC strings (`$argon2id$v=19$m=...`) carrying their own salt
//! and parameters, so verification needs nothing but the stored string.
//! Both operations are CPU-bound; async callers should run them on the
//! blocking pool.

use std::sync::LazyLock;

use argon2::Argon2;
use password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use rand_core::OsRng;
use zeroize::Zeroizing;

use crate::error::{AuthError, Result};

/// Hash verified when the account does not exist, so that a failed login
/// costs the same whether or not the email is registered.
static DUMMY_HASH: LazyLock<Option<Zeroizing<String>>> =
    LazyLock::new(|| hash_password("tokengate-timing-equalizer").ok());

/// Hashes `password` with Argon2id and a fresh random salt.
///
/// # Errors
///
/// Returns [`AuthError::Hashing`] if the hasher rejects the input.
pub fn hash_password(password: &str) -> Result<Zeroizing<String>> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| Zeroizing::new(hash.to_string()))
        .map_err(|e| AuthError::hashing(e.to_string()))
}

/// Checks `password` against a stored PHC hash.
///
/// The digest comparison is constant-time. An unparseable hash verifies
/// nothing and returns `false`.
#[must_use]
pub fn verify_password(hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

/// Computes the dummy hash now rather than on the first unknown-account
/// login, which would otherwise be measurably slower than the rest. Returns
/// whether the hash is available.
pub(crate) fn warm_up() -> bool {
    LazyLock::force(&DUMMY_HASH).is_some()
}

/// Performs a verification whose outcome is discarded. Used on the
/// unknown-account path of login.
pub fn verify_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_ref() {
        let _ = verify_password(hash, password);
    }
}
