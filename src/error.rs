use std::error::Error as StdError;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Use of Internal is never a guarantee the error is not, for example,
    /// due to a user error - merely that it cannot be confidently
    /// determined by the code.
    Internal,

    /// The user provided invalid input (including a wrong passphrase) or
    /// performed an action that is unsupported or impossible to complete.
    User,
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The platform cryptography primitives (including the OS random
    /// number generator) are not usable. Not retryable.
    CryptoUnavailable,
    /// Authentication failed because of a wrong passphrase, or the stored
    /// ciphertext or nonce is corrupt, truncated or tampered with.
    DecryptionFailed,
    /// A caller violated the input contract (empty passphrase, missing
    /// nonce, and the like).
    InvalidInput,
    /// Text could not be decoded as base64.
    EncodingInvalid,
    /// A stored record is not a well-formed encrypted record.
    RecordFormat,
    /// Structured plaintext could not be serialized or deserialized.
    Serialization,
    /// Passphrase could not be obtained from the configured reader.
    PassphraseUnavailable,
    /// The rate-limit window for a key is exhausted.
    RateLimited,
    /// Unexpected state reached within journalseal logic.
    InternalInvariant,
    /// Interaction with the filesystem, stdin/stdout, or other I/O failed.
    Io,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct JournalError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Optional specific condition tag for consumers that need to
    /// branch their behavior. Any code consuming errors MUST handle
    /// the absence of a defined kind.
    pub kind: Option<ErrorKind>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl JournalError {
    /// Creates a new error with a required category and display message.
    pub fn new(category: ErrorCategory, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: None,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that also tags the failure with a kind.
    pub fn with_kind(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: None,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Creates a new error that carries both a kind tag and the originating source error.
    pub fn with_kind_and_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind: Some(kind),
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Every cause of a failed decryption maps to this one error and message.
    pub(crate) fn decryption_failed() -> Self {
        Self::with_kind(
            ErrorCategory::User,
            ErrorKind::DecryptionFailed,
            "wrong passphrase or corrupted data",
        )
    }

    pub(crate) fn invalid_input(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorCategory::User, ErrorKind::InvalidInput, msg)
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }

    pub fn is_decryption_failed(&self) -> bool {
        self.kind == Some(ErrorKind::DecryptionFailed)
    }

    pub fn is_crypto_unavailable(&self) -> bool {
        self.kind == Some(ErrorKind::CryptoUnavailable)
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, JournalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_keeps_category_and_kind() {
        let err = JournalError::decryption_failed().with_context("failed to open entry");

        assert_eq!(err.category, ErrorCategory::User);
        assert_eq!(err.kind, Some(ErrorKind::DecryptionFailed));
        assert!(err.is_decryption_failed());
        assert_eq!(err.message(), "failed to open entry");
        assert_eq!(
            err.source_error().unwrap().to_string(),
            "wrong passphrase or corrupted data"
        );
    }

    #[test]
    fn test_kindless_error() {
        let err = JournalError::new(ErrorCategory::Internal, "something odd");
        assert_eq!(err.kind, None);
        assert!(!err.is_decryption_failed());
        assert!(!err.is_crypto_unavailable());
        assert!(err.source_error().is_none());
    }

    #[test]
    fn test_crypto_unavailable_predicate() {
        let err = JournalError::with_kind(
            ErrorCategory::Internal,
            ErrorKind::CryptoUnavailable,
            "secure random number generator is unavailable",
        )
        .with_context("encryption failed");

        assert!(err.is_crypto_unavailable());
        assert!(!err.is_decryption_failed());
    }

    #[test]
    fn test_source_is_preserved() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = JournalError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            "failed to read entry",
            io,
        );

        assert_eq!(err.kind, Some(ErrorKind::Io));
        assert_eq!(err.to_string(), "failed to read entry");
        assert_eq!(err.source_error().unwrap().to_string(), "gone");
    }
}
