//! journalseal CLI - encrypt and decrypt journal entries
//!
//! Plaintext entries are UTF-8 text files; encrypted entries are JSON
//! records holding base64 ciphertext and nonce. The key is derived from the
//! passphrase and the user id on every run and never written anywhere.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use journalseal::journal_file;
use journalseal::passphrase::{PassphraseReader, ReaderPassphraseReader, TerminalPassphraseReader};

#[derive(Parser)]
#[command(name = "journalseal")]
#[command(version)]
#[command(about = "Zero-knowledge journal entry encryption.", long_about = None)]
struct Cli {
    /// Read passphrase from stdin instead of from terminal
    #[arg(long, global = true)]
    passphrase_stdin: bool,

    /// Stable identifier of the account the entries belong to
    #[arg(long, env = "JOURNALSEAL_USER_ID", value_name = "ID")]
    user_id: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a plaintext entry into a record
    #[command(alias = "e")]
    Encrypt {
        /// Path to the UTF-8 text to encrypt
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the encrypted record to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Decrypt a record back to plaintext
    #[command(alias = "d")]
    Decrypt {
        /// Path to the encrypted record
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to write the plaintext to
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Replace a record with new content, while validating that the
    /// passphrase is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the UTF-8 text to encrypt
        #[arg(short, long, value_name = "FILE")]
        input: PathBuf,

        /// Path to the existing record to replace
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("journalseal=warn")),
        )
        .init();

    let cli = Cli::parse();
    let mut reader = get_passphrase_reader(cli.passphrase_stdin);

    let result = match cli.command {
        Commands::Encrypt { input, output } => {
            journal_file::encrypt_file(&input, &output, &cli.user_id, &mut *reader)
        }
        Commands::Decrypt { input, output } => {
            journal_file::decrypt_file(&input, &output, &cli.user_id, &mut *reader)
        }
        Commands::Update { input, output } => {
            journal_file::update_file(&input, &output, &cli.user_id, &mut *reader)
        }
    };

    if let Err(e) = result {
        if e.is_decryption_failed() {
            eprintln!("Error: wrong passphrase or corrupted data");
        } else {
            eprintln!("Error: {}", error_chain(&e));
        }
        process::exit(1);
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

fn get_passphrase_reader(use_stdin: bool) -> Box<dyn PassphraseReader> {
    if use_stdin {
        Box::new(ReaderPassphraseReader::new(Box::new(std::io::stdin())))
    } else {
        Box::new(TerminalPassphraseReader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_user_id_before_subcommand() {
        let cli = Cli::try_parse_from([
            "journalseal",
            "--user-id",
            "user-123",
            "decrypt",
            "-i",
            "entry.json",
            "-o",
            "entry.txt",
        ])
        .unwrap();
        assert_eq!(cli.user_id, "user-123");
        assert!(!cli.passphrase_stdin);
        assert!(matches!(cli.command, Commands::Decrypt { .. }));
    }

    #[test]
    fn test_passphrase_stdin_after_subcommand() {
        let cli = Cli::try_parse_from([
            "journalseal",
            "--user-id",
            "user-123",
            "encrypt",
            "--passphrase-stdin",
            "-i",
            "entry.txt",
            "-o",
            "entry.json",
        ])
        .unwrap();
        assert!(cli.passphrase_stdin);
    }
}
