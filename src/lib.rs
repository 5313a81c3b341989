//! journalseal - zero-knowledge encryption for private journal entries
//!
//! A passphrase and a stable user identifier derive an AES-256-GCM key
//! (PBKDF2-HMAC-SHA256, 100,000 iterations). Entries are sealed into
//! [`EncryptedRecord`]s of base64 ciphertext and nonce, which the storage
//! layer keeps as opaque text. The key and plaintext never leave the caller.
//!
//! ```no_run
//! use journalseal::{decrypt_record, derive_key, encrypt};
//!
//! let key = derive_key("correct horse battery staple", "user-123")?;
//! let record = encrypt("Today I felt anxious about the meeting.", &key)?;
//! assert_eq!(decrypt_record(&record, &key)?, "Today I felt anxious about the meeting.");
//! # Ok::<(), journalseal::JournalError>(())
//! ```

#![forbid(unsafe_code)]

pub mod cipher;
pub mod encoding;
pub mod error;
pub mod journal_file;
pub mod keyderive;
#[cfg(feature = "async")]
pub mod nonblocking;
pub mod passphrase;
pub mod rate_limit;
pub mod record;

pub use cipher::{decrypt, decrypt_json, decrypt_record, encrypt, encrypt_json};
pub use encoding::{bytes_to_text, text_to_bytes};
pub use error::{ErrorCategory, ErrorKind, JournalError, Result};
pub use keyderive::{JournalKey, derive_key};
pub use rate_limit::{CounterStore, MemoryCounterStore, RateLimitConfig, RateLimiter};
pub use record::EncryptedRecord;
