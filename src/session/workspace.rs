//! The project directory and where its session state lives.

use std::fs;
use std::path::{Path, PathBuf};

use super::manifest::{ManifestStore, SessionState};
use super::scanner::FileScanner;
use super::shadow::ShadowStore;
use crate::config::Settings;
use crate::crypto::content_hash;
use crate::errors::Result;

/// A project root plus its manifest and shadow locations.
#[derive(Debug, Clone)]
pub struct Workspace {
    project_dir: PathBuf,
    manifest: ManifestStore,
    shadow: ShadowStore,
    exclude: Vec<String>,
}

impl Workspace {
    /// Build a workspace for `project_dir` using `settings`.
    pub fn new(project_dir: impl Into<PathBuf>, settings: &Settings) -> Self {
        let project_dir = project_dir.into();
        Self {
            manifest: ManifestStore::new(settings.manifest_path(&project_dir)),
            shadow: ShadowStore::new(settings.shadow_root(&project_dir)),
            exclude: settings.exclude.clone(),
            project_dir,
        }
    }

    /// Build a workspace, reading `.pilfer.toml` from `project_dir` if present.
    pub fn load(project_dir: impl Into<PathBuf>) -> Result<Self> {
        let project_dir = project_dir.into();
        let settings = Settings::load(&project_dir)?;
        Ok(Self::new(project_dir, &settings))
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn manifest(&self) -> &ManifestStore {
        &self.manifest
    }

    pub fn shadow(&self) -> &ShadowStore {
        &self.shadow
    }

    /// A scanner for this project that never enters the shadow tree or
    /// any excluded directory.
    pub fn scanner(&self, magic: &'static [u8]) -> FileScanner {
        self.exclude.iter().fold(
            FileScanner::new(magic).skip_dir(self.shadow.root()),
            |scanner, name| scanner.exclude_name(name),
        )
    }

    /// Inspect the session without needing the vault password.
    pub fn status(&self, magic: &[u8]) -> Result<SessionStatus> {
        let manifest = match self.manifest.state()? {
            SessionState::Closed => return Ok(SessionStatus::Closed),
            SessionState::Open(manifest) => manifest,
        };

        let files = manifest
            .iter()
            .map(|path| TrackedStatus {
                path: path.clone(),
                state: self.classify(path, magic),
            })
            .collect();

        Ok(SessionStatus::Open(files))
    }

    fn classify(&self, path: &Path, magic: &[u8]) -> FileState {
        let live = match fs::read(path) {
            Ok(live) => live,
            Err(_) => return FileState::Unreadable,
        };
        // Unchanged plaintext can start with the marker, so hash first.
        match self.shadow.load(path) {
            Ok(record) if content_hash(&live).eq_ignore_ascii_case(&record.plaintext_hash) => {
                FileState::Unchanged
            }
            _ if live.starts_with(magic) => FileState::Sealed,
            Ok(_) => FileState::Modified,
            Err(_) => FileState::MissingShadow,
        }
    }
}

/// Snapshot of the session as seen on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Closed,
    Open(Vec<TrackedStatus>),
}

/// One manifest entry and what CLOSE would find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedStatus {
    pub path: PathBuf,
    pub state: FileState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Decrypted and identical to what OPEN wrote.
    Unchanged,
    /// Decrypted and edited since OPEN.
    Modified,
    /// Still (or again) encrypted.
    Sealed,
    /// Decrypted but its shadow record is gone.
    MissingShadow,
    /// Cannot be read.
    Unreadable,
}

impl FileState {
    pub fn label(self) -> &'static str {
        match self {
            FileState::Unchanged => "unchanged",
            FileState::Modified => "modified",
            FileState::Sealed => "encrypted",
            FileState::MissingShadow => "missing shadow record",
            FileState::Unreadable => "unreadable",
        }
    }
}
