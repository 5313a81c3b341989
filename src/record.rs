//! The persisted unit of an encrypted journal entry.

use crate::error::{ErrorCategory, ErrorKind, JournalError, Result};
use serde::{Deserialize, Serialize};

/// Ciphertext and nonce of one entry, both base64.
///
/// The two fields must always be stored and retrieved together: without its
/// nonce a ciphertext can never be decrypted again. Older records name the
/// nonce `iv`, which is accepted when reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedRecord {
    pub ciphertext: String,
    #[serde(alias = "iv")]
    pub nonce: String,
}

impl EncryptedRecord {
    pub fn new(ciphertext: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            ciphertext: ciphertext.into(),
            nonce: nonce.into(),
        }
    }

    /// Serialize to the JSON object stored alongside the parent row.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            JournalError::with_kind_and_source(
                ErrorCategory::Internal,
                ErrorKind::InternalInvariant,
                "failed to serialize encrypted record",
                e,
            )
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            JournalError::with_kind_and_source(
                ErrorCategory::User,
                ErrorKind::RecordFormat,
                "not a valid encrypted record",
                e,
            )
        })
    }
}
