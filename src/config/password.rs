//! Vault password resolution.
//!
//! The password always comes from a file whose whole (stripped) content
//! is the secret.  Which file is decided in this order:
//!
//! 1. `-p/--vault-password-file` (or `ANSIBLE_VAULT_PASSWORD_FILE`)
//! 2. `vault_password_file` under `[defaults]` in `./ansible.cfg`
//! 3. `vault_password_file` in `.pilfer.toml`
//! 4. the well-known fallback locations below
//!
//! Relative paths are resolved against the project directory.

use std::fs;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::Settings;
use crate::errors::{PilferError, Result};

/// Checked in order when nothing more specific is configured.
pub const FALLBACK_LOCATIONS: &[&str] = &[
    "../../vault_password_file",
    "~/.ansible-vault/.vault-file",
    ".vault_password",
    "vault_password_file",
];

/// Ansible's project config file.
const ANSIBLE_CFG: &str = "ansible.cfg";

/// Find the password file for this project.
pub fn locate_password_file(
    explicit: Option<&Path>,
    project_dir: &Path,
    settings: &Settings,
) -> Result<PathBuf> {
    locate_with_fallbacks(explicit, project_dir, settings, FALLBACK_LOCATIONS)
}

/// Same as `locate_password_file` with a caller-chosen fallback list.
pub fn locate_with_fallbacks(
    explicit: Option<&Path>,
    project_dir: &Path,
    settings: &Settings,
    fallbacks: &[&str],
) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let resolved = resolve(project_dir, path);
        if resolved.is_file() {
            return Ok(resolved);
        }
        return Err(PilferError::SecretNotFound(format!(
            "{} does not exist",
            resolved.display()
        )));
    }

    let configured = ansible_cfg_password_file(project_dir)
        .into_iter()
        .chain(settings.vault_password_file.clone());

    for candidate in configured {
        let resolved = resolve(project_dir, &expand_tilde(&candidate));
        if resolved.is_file() {
            return Ok(resolved);
        }
        tracing::debug!(path = %resolved.display(), "configured password file missing");
    }

    for location in fallbacks {
        let resolved = resolve(project_dir, &expand_tilde(location));
        if resolved.is_file() {
            return Ok(resolved);
        }
    }

    Err(PilferError::SecretNotFound(
        "no configured or fallback location exists".into(),
    ))
}

/// Read a password file; the secret is its content with surrounding
/// whitespace stripped.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn read_password_file(path: &Path) -> Result<Zeroizing<String>> {
    let raw = Zeroizing::new(
        fs::read_to_string(path).map_err(|e| PilferError::file_access(path, e))?,
    );
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PilferError::SecretNotFound(format!(
            "{} is empty",
            path.display()
        )));
    }
    Ok(Zeroizing::new(trimmed.to_string()))
}

/// Locate and read the vault password.
pub fn resolve_password(
    explicit: Option<&Path>,
    project_dir: &Path,
    settings: &Settings,
) -> Result<Zeroizing<String>> {
    let path = locate_password_file(explicit, project_dir, settings)?;
    tracing::debug!(path = %path.display(), "using vault password file");
    read_password_file(&path)
}

/// Look up `[defaults] vault_password_file` in `<project_dir>/ansible.cfg`.
///
/// A missing or unreadable file simply yields `None`.
pub fn ansible_cfg_password_file(project_dir: &Path) -> Option<String> {
    let contents = fs::read_to_string(project_dir.join(ANSIBLE_CFG)).ok()?;
    ini_value(&contents, "defaults", "vault_password_file")
}

/// Minimal INI lookup matching Python's `configparser` for simple files:
/// `[section]` headers, `key = value` or `key: value`, `#`/`;` comments.
fn ini_value(contents: &str, section: &str, key: &str) -> Option<String> {
    let mut in_section = false;

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            in_section = name.trim() == section;
            continue;
        }

        if !in_section {
            continue;
        }

        let Some(split) = line.find(['=', ':']) else {
            continue;
        };
        let (k, v) = line.split_at(split);
        if k.trim() == key {
            let value = v[1..].trim();
            return (!value.is_empty()).then(|| value.to_string());
        }
    }

    None
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn resolve(project_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_dir.join(path)
    }
}
