//! Outcomes of the OPEN and CLOSE transitions.
//!
//! Per-file problems never abort a transition; they are collected here
//! as explicit values so callers (and tests) can inspect them.

use std::path::{Path, PathBuf};

use crate::errors::PilferError;

/// A tracked file that could not be processed.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: PilferError,
}

/// A non-fatal problem, typically a best-effort cleanup that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    pub path: PathBuf,
    pub message: String,
}

/// Failures and warnings gathered during one transition.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub failures: Vec<FileFailure>,
    pub warnings: Vec<Warning>,
}

impl Diagnostics {
    pub(crate) fn fail(&mut self, path: &Path, error: PilferError) {
        tracing::warn!(path = %path.display(), error = %error, "file failed");
        self.failures.push(FileFailure {
            path: path.to_path_buf(),
            error,
        });
    }

    pub(crate) fn warn(&mut self, path: &Path, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(path = %path.display(), %message, "cleanup warning");
        self.warnings.push(Warning {
            path: path.to_path_buf(),
            message,
        });
    }

    /// `true` when nothing went wrong.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.warnings.is_empty()
    }
}

/// What OPEN did.
#[derive(Debug, Default)]
pub struct OpenReport {
    /// The manifest already existed, so the scan was skipped.
    pub resumed: bool,
    /// Number of paths in the manifest.
    pub tracked: usize,
    /// Files decrypted by this run.
    pub decrypted: usize,
    /// Files that were already decrypted by an earlier run.
    pub already_open: usize,
    pub diagnostics: Diagnostics,
}

/// What CLOSE did.
#[derive(Debug, Default)]
pub struct CloseReport {
    /// Files whose content changed and were re-encrypted.
    pub modified: usize,
    /// Unchanged files whose original ciphertext was put back.
    pub restored: usize,
    /// Files that were already encrypted again by an interrupted CLOSE.
    pub already_sealed: usize,
    /// Files still open after this run; the manifest now lists only these.
    pub pending: Vec<PathBuf>,
    pub diagnostics: Diagnostics,
}

/// Per-file result of OPEN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Decrypted,
    AlreadyOpen,
}

/// Per-file result of CLOSE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Reencrypted,
    Restored,
    AlreadySealed,
}
