//! Journal entries on disk
//!
//! Each encrypted entry is a small JSON document holding an
//! [`EncryptedRecord`]. Files written here are created with mode 0o600 on
//! Unix systems, and updates replace the old record atomically.

use crate::cipher;
use crate::error::{ErrorCategory, ErrorKind, JournalError, Result};
use crate::keyderive::{JournalKey, derive_key};
use crate::passphrase::{PassphraseReader, passphrase_to_str};
use crate::record::EncryptedRecord;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use zeroize::Zeroizing;

/// Encrypt the UTF-8 text in `input_path` for `user_id` and write the
/// record JSON to `output_path`.
pub fn encrypt_file(
    input_path: &Path,
    output_path: &Path,
    user_id: &str,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let plaintext = read_plaintext(input_path)?;
    let key = unlock(user_id, passphrase_reader)?;
    let record = cipher::encrypt(&plaintext, &key).map_err(|e| e.with_context("encryption failed"))?;
    write_file_secure(output_path, record.to_json()?.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;

    tracing::debug!(output = %output_path.display(), "wrote encrypted entry");
    Ok(())
}

/// Decrypt the record in `input_path` for `user_id` and write the plaintext
/// to `output_path`. Nothing is written unless the record authenticates.
pub fn decrypt_file(
    input_path: &Path,
    output_path: &Path,
    user_id: &str,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let record = read_record(input_path)?;
    let key = unlock(user_id, passphrase_reader)?;
    let plaintext = Zeroizing::new(
        cipher::decrypt_record(&record, &key).map_err(|e| e.with_context("failed to decrypt"))?,
    );
    write_file_secure(output_path, plaintext.as_bytes())
        .map_err(|e| e.with_context(format!("failed to write to {}", output_path.display())))?;
    Ok(())
}

/// Replace the entry in `crypt_path` with a fresh encryption of `plain_path`.
///
/// The existing record is decrypted first, so a mistyped passphrase fails
/// here instead of silently re-keying the entry. The new record is written
/// to a temporary file in the same directory, synced, and renamed over the
/// old one, so either the old or the new record exists, never a partial one.
pub fn update_file(
    plain_path: &Path,
    crypt_path: &Path,
    user_id: &str,
    passphrase_reader: &mut dyn PassphraseReader,
) -> Result<()> {
    let existing = read_record(crypt_path)?;
    let key = unlock(user_id, passphrase_reader)?;

    // Validate passphrase by decrypting the existing entry (discard plaintext)
    drop(Zeroizing::new(
        cipher::decrypt_record(&existing, &key).map_err(|e| e.with_context("failed to decrypt"))?,
    ));

    let new_plaintext = read_plaintext(plain_path)?;
    let record =
        cipher::encrypt(&new_plaintext, &key).map_err(|e| e.with_context("failed to encrypt"))?;

    let crypt_dir = match crypt_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        Some(_) => Path::new("."),
        None => {
            return Err(JournalError::with_kind(
                ErrorCategory::User,
                ErrorKind::Io,
                "crypt_path has no parent directory",
            ));
        }
    };
    let mut temp_file = tempfile::NamedTempFile::new_in(crypt_dir)
        .map_err(|e| internal_io("failed to create tempfile", e))?;

    temp_file
        .write_all(record.to_json()?.as_bytes())
        .map_err(|e| internal_io("failed to write to tempfile", e))?;
    // Flush and fsync() such that the rename later, if it succeeds, will
    // always point to a valid file.
    temp_file
        .flush()
        .map_err(|e| internal_io("failed to flush tempfile", e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| internal_io("failed to sync file prior to rename", e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp_file
            .as_file()
            .set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| internal_io("failed to set tempfile permissions", e))?;
    }
    temp_file.persist(crypt_path).map_err(|e| {
        internal_io(
            format!("failed to rename to target file {}", crypt_path.display()),
            e.error,
        )
    })?;

    tracing::debug!(output = %crypt_path.display(), "replaced encrypted entry");
    Ok(())
}

fn unlock(user_id: &str, passphrase_reader: &mut dyn PassphraseReader) -> Result<JournalKey> {
    let passphrase = passphrase_reader.read_passphrase()?;
    derive_key(passphrase_to_str(&passphrase)?, user_id)
}

fn read_plaintext(path: &Path) -> Result<Zeroizing<String>> {
    let bytes = fs::read(path).map_err(|e| read_error(path, e))?;
    String::from_utf8(bytes).map(Zeroizing::new).map_err(|e| {
        JournalError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::InvalidInput,
            format!("{} is not valid UTF-8 text", path.display()),
            e,
        )
    })
}

fn read_record(path: &Path) -> Result<EncryptedRecord> {
    let json = fs::read_to_string(path).map_err(|e| read_error(path, e))?;
    EncryptedRecord::from_json(&json)
        .map_err(|e| e.with_context(format!("{} is not a journal entry", path.display())))
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    let file = {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
    };
    #[cfg(not(unix))]
    let file = fs::File::create(path);

    let mut file = file.map_err(|e| {
        JournalError::with_kind_and_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("failed to open {}", path.display()),
            e,
        )
    })?;
    file.write_all(contents)
        .map_err(|e| internal_io(format!("failed to write {}", path.display()), e))
}

fn internal_io(msg: impl Into<String>, err: io::Error) -> JournalError {
    JournalError::with_kind_and_source(ErrorCategory::Internal, ErrorKind::Io, msg, err)
}

fn read_error(path: &Path, err: io::Error) -> JournalError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    JournalError::with_kind_and_source(
        category,
        ErrorKind::Io,
        format!("failed to read from {}", path.display()),
        err,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passphrase::ConstantPassphraseReader;
    use tempfile::TempDir;

    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    const USER: &str = "user-123";

    fn reader(passphrase: &str) -> ConstantPassphraseReader {
        ConstantPassphraseReader::new(passphrase)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("entry.txt");
        let crypt_path = temp_dir.path().join("entry.json");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        let plaintext = "Today I felt anxious about the meeting.";
        fs::write(&plain_path, plaintext).unwrap();

        encrypt_file(&plain_path, &crypt_path, USER, &mut reader("test password")).unwrap();

        let stored = fs::read_to_string(&crypt_path).unwrap();
        assert!(!stored.contains("anxious"));
        let record = EncryptedRecord::from_json(&stored).unwrap();
        assert!(!record.nonce.is_empty());

        decrypt_file(&crypt_path, &decrypted_path, USER, &mut reader("test password")).unwrap();
        assert_eq!(fs::read_to_string(&decrypted_path).unwrap(), plaintext);
    }

    #[test]
    fn test_update_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain1_path = temp_dir.path().join("plain1.txt");
        let plain2_path = temp_dir.path().join("plain2.txt");
        let crypt_path = temp_dir.path().join("entry.json");

        fs::write(&plain1_path, "Initial content").unwrap();
        encrypt_file(&plain1_path, &crypt_path, USER, &mut reader("test password")).unwrap();
        let before = fs::read_to_string(&crypt_path).unwrap();

        fs::write(&plain2_path, "Updated content").unwrap();
        update_file(&plain2_path, &crypt_path, USER, &mut reader("test password")).unwrap();
        assert_ne!(fs::read_to_string(&crypt_path).unwrap(), before);

        let decrypted_path = temp_dir.path().join("decrypted.txt");
        decrypt_file(&crypt_path, &decrypted_path, USER, &mut reader("test password")).unwrap();
        assert_eq!(fs::read_to_string(&decrypted_path).unwrap(), "Updated content");
    }

    #[test]
    fn test_update_with_wrong_passphrase_fails() {
        let temp_dir = TempDir::new().unwrap();
        let plain1_path = temp_dir.path().join("plain1.txt");
        let plain2_path = temp_dir.path().join("plain2.txt");
        let crypt_path = temp_dir.path().join("entry.json");

        fs::write(&plain1_path, "Initial").unwrap();
        encrypt_file(&plain1_path, &crypt_path, USER, &mut reader("correct password")).unwrap();
        let before = fs::read_to_string(&crypt_path).unwrap();

        fs::write(&plain2_path, "Updated").unwrap();
        let err = update_file(&plain2_path, &crypt_path, USER, &mut reader("wrong password"))
            .expect_err("expected decryption failure");
        assert_eq!(err.kind, Some(ErrorKind::DecryptionFailed));

        // Untouched
        assert_eq!(fs::read_to_string(&crypt_path).unwrap(), before);
    }

    #[test]
    #[cfg(unix)]
    fn test_file_permissions() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("entry.txt");
        let crypt_path = temp_dir.path().join("entry.json");
        let plain2_path = temp_dir.path().join("entry2.txt");

        fs::write(&plain_path, "test").unwrap();
        encrypt_file(&plain_path, &crypt_path, USER, &mut reader("test")).unwrap();
        let mode = fs::metadata(&crypt_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        fs::write(&plain2_path, "test 2").unwrap();
        update_file(&plain2_path, &crypt_path, USER, &mut reader("test")).unwrap();
        let mode = fs::metadata(&crypt_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_decrypt_wrong_passphrase_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("entry.txt");
        let crypt_path = temp_dir.path().join("entry.json");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, "secret").unwrap();
        encrypt_file(&plain_path, &crypt_path, USER, &mut reader("correct")).unwrap();

        let err = decrypt_file(&crypt_path, &decrypted_path, USER, &mut reader("wrong"))
            .expect_err("expected decryption failure");
        assert!(err.is_decryption_failed());
        assert!(!decrypted_path.exists());
    }

    #[test]
    fn test_decrypt_other_user_fails() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("entry.txt");
        let crypt_path = temp_dir.path().join("entry.json");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, "secret").unwrap();
        encrypt_file(&plain_path, &crypt_path, "user-1", &mut reader("shared")).unwrap();

        let err = decrypt_file(&crypt_path, &decrypted_path, "user-2", &mut reader("shared"))
            .expect_err("expected decryption failure");
        assert!(err.is_decryption_failed());
    }

    #[test]
    fn test_empty_file() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("empty.txt");
        let crypt_path = temp_dir.path().join("empty.json");
        let decrypted_path = temp_dir.path().join("decrypted.txt");

        fs::write(&plain_path, "").unwrap();
        encrypt_file(&plain_path, &crypt_path, USER, &mut reader("test")).unwrap();
        decrypt_file(&crypt_path, &decrypted_path, USER, &mut reader("test")).unwrap();

        assert_eq!(fs::read(&decrypted_path).unwrap(), b"");
    }

    #[test]
    fn test_non_utf8_plaintext_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let plain_path = temp_dir.path().join("binary.bin");
        let crypt_path = temp_dir.path().join("binary.json");

        fs::write(&plain_path, [0xffu8, 0xfe, 0x00]).unwrap();
        let err = encrypt_file(&plain_path, &crypt_path, USER, &mut reader("test"))
            .expect_err("expected invalid input");
        assert_eq!(err.kind, Some(ErrorKind::InvalidInput));
        assert!(!crypt_path.exists());
    }

    #[test]
    fn test_missing_input() {
        let temp_dir = TempDir::new().unwrap();
        let err = encrypt_file(
            &temp_dir.path().join("missing.txt"),
            &temp_dir.path().join("out.json"),
            USER,
            &mut reader("test"),
        )
        .expect_err("expected io error");
        assert_eq!(err.kind, Some(ErrorKind::Io));
        assert_eq!(err.category, ErrorCategory::User);
    }

    #[test]
    fn test_decrypt_not_a_record() {
        let temp_dir = TempDir::new().unwrap();
        let crypt_path = temp_dir.path().join("entry.json");
        fs::write(&crypt_path, "plain words").unwrap();

        let err = decrypt_file(
            &crypt_path,
            &temp_dir.path().join("out.txt"),
            USER,
            &mut reader("test"),
        )
        .expect_err("expected record format error");
        assert_eq!(err.kind, Some(ErrorKind::RecordFormat));
    }
}
