//! The shadow mirror: per-file originals kept while a session is open.
//!
//! Every tracked absolute path gets a directory under the shadow root
//! that mirrors the path itself:
//!
//! ```text
//! <project>/.vault/srv/site/group_vars/all/vault.yml/encrypted
//! <project>/.vault/srv/site/group_vars/all/vault.yml/hash
//! ```
//!
//! `encrypted` is the original ciphertext byte-for-byte, `hash` is the
//! hex SHA-256 of the plaintext bytes written to the live path.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::atomic::write_atomic;
use crate::errors::{PilferError, Result};

const CIPHERTEXT_FILE: &str = "encrypted";
const HASH_FILE: &str = "hash";

/// What was stored for one file at OPEN time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShadowRecord {
    pub ciphertext: Vec<u8>,
    pub plaintext_hash: String,
}

/// Handle on the shadow mirror tree.
#[derive(Debug, Clone)]
pub struct ShadowStore {
    root: PathBuf,
}

impl ShadowStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the record for `path`.
    ///
    /// `path` must be absolute and free of `.`/`..` components so the
    /// record can never land outside the shadow root.
    pub fn mirror_dir(&self, path: &Path) -> Result<PathBuf> {
        if !path.is_absolute() {
            return Err(PilferError::shadow(path, "tracked path is not absolute"));
        }

        let mut dir = self.root.clone();
        for component in path.components() {
            match component {
                Component::Prefix(prefix) => {
                    let name = prefix.as_os_str().to_string_lossy().replace([':', '\\', '?'], "");
                    if !name.is_empty() {
                        dir.push(name);
                    }
                }
                Component::RootDir => {}
                Component::Normal(part) => dir.push(part),
                Component::CurDir | Component::ParentDir => {
                    return Err(PilferError::shadow(path, "tracked path is not normalized"));
                }
            }
        }
        Ok(dir)
    }

    /// `true` if a complete record exists for `path`.
    pub fn contains(&self, path: &Path) -> bool {
        match self.mirror_dir(path) {
            Ok(dir) => dir.join(CIPHERTEXT_FILE).is_file() && dir.join(HASH_FILE).is_file(),
            Err(_) => false,
        }
    }

    /// Store the original `ciphertext` of `path` and the hash of the
    /// plaintext about to replace it.
    pub fn save(&self, path: &Path, ciphertext: &[u8], plaintext_hash: &str) -> Result<()> {
        let dir = self.mirror_dir(path)?;
        fs::create_dir_all(&dir).map_err(|e| PilferError::file_access(&dir, e))?;

        let ciphertext_path = dir.join(CIPHERTEXT_FILE);
        write_atomic(&ciphertext_path, ciphertext)
            .map_err(|e| PilferError::file_access(&ciphertext_path, e))?;

        let hash_path = dir.join(HASH_FILE);
        write_atomic(&hash_path, plaintext_hash.as_bytes())
            .map_err(|e| PilferError::file_access(&hash_path, e))?;

        Ok(())
    }

    /// Load the record for `path`.
    ///
    /// Missing or empty artifacts are a `ShadowInconsistency`.
    pub fn load(&self, path: &Path) -> Result<ShadowRecord> {
        let dir = self.mirror_dir(path)?;

        let ciphertext = read_artifact(path, &dir.join(CIPHERTEXT_FILE))?;
        let raw_hash = read_artifact(path, &dir.join(HASH_FILE))?;

        let plaintext_hash = String::from_utf8(raw_hash)
            .map_err(|_| PilferError::shadow(path, "stored hash is not text"))?
            .trim()
            .to_string();
        if plaintext_hash.is_empty() {
            return Err(PilferError::shadow(path, "stored hash is empty"));
        }

        Ok(ShadowRecord {
            ciphertext,
            plaintext_hash,
        })
    }

    /// Remove the record for `path` and every mirror directory it
    /// leaves empty, stopping at the shadow root.
    pub fn clear(&self, path: &Path) -> Result<()> {
        let dir = self.mirror_dir(path)?;

        for name in [CIPHERTEXT_FILE, HASH_FILE] {
            let artifact = dir.join(name);
            match fs::remove_file(&artifact) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => {
                    return Err(PilferError::CleanupFailure {
                        path: artifact,
                        source,
                    })
                }
            }
        }

        if let Err(source) = fs::remove_dir(&dir) {
            if source.kind() != io::ErrorKind::NotFound {
                return Err(PilferError::CleanupFailure { path: dir, source });
            }
        }

        // Parents are shared with other records; stop at the first one in use.
        let mut parent = dir.parent();
        while let Some(current) = parent {
            if current == self.root || !current.starts_with(&self.root) {
                break;
            }
            if fs::remove_dir(current).is_err() {
                break;
            }
            parent = current.parent();
        }

        Ok(())
    }

    /// `true` if the shadow root is absent or holds nothing.
    pub fn is_empty(&self) -> bool {
        match fs::read_dir(&self.root) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    /// Remove the (empty) shadow root.
    pub fn remove_root(&self) -> Result<()> {
        match fs::remove_dir(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PilferError::CleanupFailure {
                path: self.root.clone(),
                source,
            }),
        }
    }
}

fn read_artifact(tracked: &Path, artifact: &Path) -> Result<Vec<u8>> {
    match fs::read(artifact) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(PilferError::shadow(
            tracked,
            format!("missing {}", artifact.display()),
        )),
        Err(e) => Err(PilferError::file_access(artifact, e)),
    }
}
