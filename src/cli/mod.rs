//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::{resolve_password, Settings};
use crate::errors::{PilferError, Result};

/// pilfer: bulk open/close for Ansible Vault files.
#[derive(Parser)]
#[command(
    name = "pilfer",
    about = "Decrypt all Ansible Vault files in a project for search/editing, then re-encrypt them when done",
    version
)]
pub struct Cli {
    /// What to do with the project in the current directory
    #[arg(value_enum)]
    pub action: Action,

    /// Path to vault password file
    #[arg(short = 'p', long, env = "ANSIBLE_VAULT_PASSWORD_FILE")]
    pub vault_password_file: Option<PathBuf>,

    /// Prompt for the vault password instead of reading a file
    #[arg(long)]
    pub ask_vault_pass: bool,

    /// Print debug logging to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// The session transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Action {
    /// Decrypt all vault files in place
    Open,
    /// Re-encrypt modified files and restore the rest
    Close,
    /// Show the open session and which files changed
    Status,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Get the vault password, trying in order:
/// 1. Interactive prompt, when `--ask-vault-pass` is given
/// 2. The password file chain in `config::password`
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn vault_password(cli: &Cli, project_dir: &Path, settings: &Settings) -> Result<Zeroizing<String>> {
    if cli.ask_vault_pass {
        let pw = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Vault password")
                .interact()
                .map_err(|e| PilferError::CommandFailed(format!("password prompt: {e}")))?,
        );
        if pw.is_empty() {
            return Err(PilferError::SecretNotFound("empty password entered".into()));
        }
        return Ok(pw);
    }

    resolve_password(cli.vault_password_file.as_deref(), project_dir, settings)
}

/// The project directory every command operates on.
pub fn project_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_action_and_password_file() {
        let cli = Cli::try_parse_from(["pilfer", "close", "-p", "/tmp/pw"]).unwrap();
        assert_eq!(cli.action, Action::Close);
        assert_eq!(cli.vault_password_file, Some(PathBuf::from("/tmp/pw")));
        assert!(!cli.ask_vault_pass);
    }

    #[test]
    fn rejects_unknown_action() {
        assert!(Cli::try_parse_from(["pilfer", "reopen"]).is_err());
    }

    #[test]
    fn action_is_required() {
        assert!(Cli::try_parse_from(["pilfer"]).is_err());
    }
}
