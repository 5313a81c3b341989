//! Async front ends for use inside a tokio runtime.
//!
//! Work runs on tokio's blocking pool, never on an executor thread. Dropping
//! a returned future does not cancel the computation; it runs to completion
//! and its result is discarded.

use crate::cipher;
use crate::error::{ErrorCategory, ErrorKind, JournalError, Result};
use crate::keyderive::{self, JournalKey};
use crate::record::EncryptedRecord;
use tokio::task::{JoinError, spawn_blocking};

fn join_error(e: JoinError) -> JournalError {
    JournalError::with_kind_and_source(
        ErrorCategory::Internal,
        ErrorKind::InternalInvariant,
        "crypto worker did not complete",
        e,
    )
}

pub async fn derive_key(passphrase: String, user_id: String) -> Result<JournalKey> {
    let passphrase = zeroize::Zeroizing::new(passphrase);
    spawn_blocking(move || keyderive::derive_key(&passphrase, &user_id))
        .await
        .map_err(join_error)?
}

pub async fn encrypt(plaintext: String, key: JournalKey) -> Result<EncryptedRecord> {
    let plaintext = zeroize::Zeroizing::new(plaintext);
    spawn_blocking(move || cipher::encrypt(&plaintext, &key))
        .await
        .map_err(join_error)?
}

pub async fn decrypt(record: EncryptedRecord, key: JournalKey) -> Result<String> {
    spawn_blocking(move || cipher::decrypt_record(&record, &key))
        .await
        .map_err(join_error)?
}
