//! The open-session manifest.
//!
//! A JSON array of absolute paths, written when a session is opened and
//! removed once it is fully closed.  Its presence on disk is the only
//! signal that a session is open; `ManifestStore::state` is the one
//! place that turns that signal into a `SessionState`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::atomic::write_atomic;
use crate::errors::{PilferError, Result};

/// Ordered list of the vault files belonging to one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    paths: Vec<PathBuf>,
}

impl Manifest {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl<'a> IntoIterator for &'a Manifest {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Whether a session is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open(Manifest),
}

/// Reads and writes the manifest file.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Current session state as recorded on disk.
    pub fn state(&self) -> Result<SessionState> {
        if !self.exists() {
            return Ok(SessionState::Closed);
        }
        self.load().map(SessionState::Open)
    }

    /// Persist `manifest`, replacing any previous one atomically.
    pub fn save(&self, manifest: &Manifest) -> Result<()> {
        let mut json = serde_json::to_vec_pretty(manifest)
            .map_err(|e| PilferError::SerializationError(format!("manifest: {e}")))?;
        json.push(b'\n');
        write_atomic(&self.path, &json).map_err(|e| PilferError::file_access(&self.path, e))
    }

    /// Load the manifest.
    ///
    /// Fails with `NoOpenSession` if there is none.
    pub fn load(&self) -> Result<Manifest> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(PilferError::NoOpenSession(self.path.clone()));
            }
            Err(e) => return Err(PilferError::file_access(&self.path, e)),
        };

        serde_json::from_slice(&data).map_err(|e| {
            PilferError::SerializationError(format!("{}: {e}", self.path.display()))
        })
    }

    /// Remove the manifest, ending the session.
    ///
    /// A manifest that is already gone counts as success.
    pub fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PilferError::CleanupFailure {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
