//! Text-safe encoding for binary ciphertext and nonces
//!
//! Encrypted records are stored in text columns and transmitted as JSON, so
//! every binary value crosses that boundary as standard base64 (RFC 4648,
//! with padding). Decoding is strict: characters outside the alphabet,
//! bad padding, and non-canonical trailing bits are all rejected.

use crate::error::{ErrorCategory, ErrorKind, JournalError, Result};
use base64::{Engine, engine::general_purpose::STANDARD};

/// Encode bytes as standard padded base64.
pub fn bytes_to_text(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard padded base64 back to bytes.
pub fn text_to_bytes(text: &str) -> Result<Vec<u8>> {
    STANDARD.decode(text).map_err(|e| {
        JournalError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::EncodingInvalid,
            "base64 decoding failed",
            e,
        )
    })
}
