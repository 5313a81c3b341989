//! Authenticated encryption of journal entries using AES-256-GCM
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce from the operating
//! system RNG; a nonce is never reused under the same key. The 16-byte GCM
//! tag is appended to the ciphertext, and [`decrypt`] verifies it before any
//! plaintext is released. Both values are returned base64-encoded so they
//! can be stored in text columns.

use crate::encoding::{bytes_to_text, text_to_bytes};
use crate::error::{ErrorCategory, ErrorKind, JournalError, Result};
use crate::keyderive::JournalKey;
use crate::record::EncryptedRecord;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

/// Length of nonce in bytes
pub const NONCE_LEN: usize = 12;

/// Length of the GCM authentication tag in bytes
pub const TAG_LEN: usize = 16;

fn new_cipher(key: &JournalKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn random_nonce(rng: &mut impl RngCore) -> Result<[u8; NONCE_LEN]> {
    let mut nonce = [0u8; NONCE_LEN];
    rng.try_fill_bytes(&mut nonce).map_err(|e| {
        JournalError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::CryptoUnavailable,
            "secure random number generator is unavailable",
            e,
        )
    })?;
    Ok(nonce)
}

/// Encrypt `plaintext` under `key` with a freshly generated nonce.
pub fn encrypt(plaintext: &str, key: &JournalKey) -> Result<EncryptedRecord> {
    encrypt_with_rng(plaintext, key, &mut OsRng)
}

fn encrypt_with_rng(
    plaintext: &str,
    key: &JournalKey,
    rng: &mut impl RngCore,
) -> Result<EncryptedRecord> {
    let nonce = random_nonce(rng)?;
    encrypt_with_nonce(plaintext, key, &nonce)
}

/// Encrypt `plaintext` under `key` using the provided nonce.
///
/// This function is ONLY for testing purposes to generate deterministic output.
/// NEVER use this in production - always use `encrypt()` which generates a random nonce.
#[doc(hidden)]
pub fn encrypt_with_nonce(
    plaintext: &str,
    key: &JournalKey,
    nonce: &[u8; NONCE_LEN],
) -> Result<EncryptedRecord> {
    let sealed = new_cipher(key)
        .encrypt(Nonce::from_slice(nonce), plaintext.as_bytes())
        .map_err(|_| {
            JournalError::with_kind(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "encryption failed",
            )
        })?;

    tracing::trace!(plaintext_len = plaintext.len(), sealed_len = sealed.len(), "sealed entry");

    Ok(EncryptedRecord::new(bytes_to_text(&sealed), bytes_to_text(nonce)))
}

/// Decrypt a base64 `ciphertext`/`nonce` pair under `key`.
///
/// Any failure after the inputs are known to be present (bad encoding, a
/// nonce of the wrong size, truncation, a wrong key, tampering) is reported
/// as `DecryptionFailed` and no plaintext is returned.
pub fn decrypt(ciphertext: &str, nonce: &str, key: &JournalKey) -> Result<String> {
    if ciphertext.is_empty() {
        return Err(JournalError::invalid_input("ciphertext is missing"));
    }
    if nonce.is_empty() {
        return Err(JournalError::invalid_input("nonce is missing"));
    }

    let sealed = text_to_bytes(ciphertext).map_err(|_| JournalError::decryption_failed())?;
    let nonce = text_to_bytes(nonce).map_err(|_| JournalError::decryption_failed())?;

    if nonce.len() != NONCE_LEN {
        tracing::debug!(nonce_len = nonce.len(), "rejecting nonce of wrong size");
        return Err(JournalError::decryption_failed());
    }
    if sealed.len() < TAG_LEN {
        tracing::debug!(sealed_len = sealed.len(), "rejecting truncated ciphertext");
        return Err(JournalError::decryption_failed());
    }

    let plaintext = new_cipher(key)
        .decrypt(Nonce::from_slice(&nonce), sealed.as_slice())
        .map_err(|_| {
            tracing::debug!("authentication tag did not verify");
            JournalError::decryption_failed()
        })?;

    String::from_utf8(plaintext).map_err(|e| {
        // Authenticated, but not something encrypt() could have produced.
        drop(Zeroizing::new(e.into_bytes()));
        JournalError::decryption_failed()
    })
}

/// Decrypt a stored record under `key`.
pub fn decrypt_record(record: &EncryptedRecord, key: &JournalKey) -> Result<String> {
    decrypt(&record.ciphertext, &record.nonce, key)
}

/// Serialize `value` as JSON and encrypt it, for structured entries such
/// as assessment responses.
pub fn encrypt_json<T: Serialize>(value: &T, key: &JournalKey) -> Result<EncryptedRecord> {
    let json = Zeroizing::new(serde_json::to_string(value).map_err(|e| {
        JournalError::with_kind_and_source(
            ErrorCategory::Internal,
            ErrorKind::Serialization,
            "failed to serialize entry",
            e,
        )
    })?);
    encrypt(&json, key)
}

/// Decrypt a record and deserialize its JSON plaintext.
///
/// A record that authenticates but holds a different shape is a
/// `Serialization` error, not `DecryptionFailed`: the passphrase was right.
pub fn decrypt_json<T: DeserializeOwned>(record: &EncryptedRecord, key: &JournalKey) -> Result<T> {
    let json = Zeroizing::new(decrypt_record(record, key)?);
    serde_json::from_str(&json).map_err(|e| {
        JournalError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Serialization,
            "decrypted entry has an unexpected shape",
            e,
        )
    })
}
