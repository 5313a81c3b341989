//! Passphrase-based key derivation
//!
//! A journal key is PBKDF2-HMAC-SHA256 over the passphrase, salted with a
//! fixed namespace prefix followed by the user's identifier. The salt is not
//! secret; it exists so that the same passphrase yields unrelated keys for
//! different users. The key is never stored, so derivation must be fully
//! deterministic: every unlock re-derives it from the passphrase.

use crate::error::{JournalError, Result};
use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use std::fmt;
use zeroize::Zeroizing;

/// Namespace prefix of every per-user salt.
///
/// Changing this value makes every previously stored entry undecryptable.
pub const SALT_PREFIX: &str = "journalseal-journal-v1:";

/// PBKDF2 iteration count. This is the work factor against offline guessing
/// of a captured record and must not be reduced without a security review.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Length of derived key in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// A derived symmetric key.
///
/// Lives only in memory: it cannot be serialized, its bytes are not
/// reachable from outside this crate, and every copy is zeroed on drop.
#[derive(Clone)]
pub struct JournalKey {
    bytes: Zeroizing<[u8; KEY_LEN]>,
}

impl JournalKey {
    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self {
            bytes: Zeroizing::new(bytes),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl fmt::Debug for JournalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JournalKey(<redacted>)")
    }
}

/// Build the per-user salt.
pub fn user_salt(user_id: &str) -> Vec<u8> {
    let mut salt = Vec::with_capacity(SALT_PREFIX.len() + user_id.len());
    salt.extend_from_slice(SALT_PREFIX.as_bytes());
    salt.extend_from_slice(user_id.as_bytes());
    salt
}

/// Derive the journal key for `user_id` from `passphrase`.
///
/// No strength policy is applied to the passphrase; only emptiness is
/// rejected, as is an empty user identifier.
pub fn derive_key(passphrase: &str, user_id: &str) -> Result<JournalKey> {
    if passphrase.is_empty() {
        return Err(JournalError::invalid_input("passphrase must not be empty"));
    }
    if user_id.is_empty() {
        return Err(JournalError::invalid_input("user id must not be empty"));
    }

    tracing::debug!(
        user_id,
        iterations = PBKDF2_ITERATIONS,
        "deriving journal key"
    );

    let salt = user_salt(user_id);
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut *key);

    Ok(JournalKey { bytes: key })
}
