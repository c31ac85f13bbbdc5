//! The OPEN/CLOSE state machine.
//!
//! OPEN decrypts every vault file in the project in place and records,
//! per file, the original ciphertext and a hash of the plaintext it
//! wrote.  CLOSE hashes each live file again: changed files are
//! encrypted afresh, unchanged ones get their original ciphertext back
//! byte-for-byte.
//!
//! Both transitions are best-effort over files: one bad file is
//! reported and skipped, the rest are still processed.  Both can be
//! re-run after an interruption:
//!
//! - OPEN never overwrites the record of a file it already decrypted.
//! - CLOSE treats a live file equal to its stored ciphertext, or one
//!   that changed and is already vault-formatted, as settled and does
//!   not encrypt it a second time.

use std::fs;
use std::path::Path;

use super::atomic::write_atomic;
use super::manifest::{Manifest, SessionState};
use super::report::{CloseOutcome, CloseReport, Diagnostics, OpenOutcome, OpenReport};
use super::workspace::Workspace;
use crate::crypto::{content_hash, VaultCodec};
use crate::errors::{PilferError, Result};

/// Drives OPEN and CLOSE for one workspace with one codec.
pub struct SessionController<C> {
    workspace: Workspace,
    codec: C,
}

impl<C: VaultCodec> SessionController<C> {
    pub fn new(workspace: Workspace, codec: C) -> Self {
        Self { workspace, codec }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    // ------------------------------------------------------------------
    // OPEN
    // ------------------------------------------------------------------

    /// Decrypt every tracked vault file in place.
    ///
    /// Scans the project and writes the manifest first unless one is
    /// already there, in which case it is reused as-is.  A scan that
    /// finds nothing writes no manifest.
    pub fn open(&self) -> Result<OpenReport> {
        let mut diagnostics = Diagnostics::default();

        let (manifest, resumed) = match self.workspace.manifest().state()? {
            SessionState::Open(manifest) => {
                tracing::info!(files = manifest.len(), "session already open, reusing manifest");
                (manifest, true)
            }
            SessionState::Closed => {
                let outcome = self
                    .workspace
                    .scanner(self.codec.magic())
                    .scan(self.workspace.project_dir());
                for skipped in outcome.skipped {
                    diagnostics.warn(&skipped.path, format!("skipped during scan: {}", skipped.error));
                }

                let manifest = Manifest::new(outcome.files);
                if manifest.is_empty() {
                    // Nothing to open, so the session stays closed.
                    tracing::info!("no vault files found");
                } else {
                    self.workspace.manifest().save(&manifest)?;
                    tracing::info!(files = manifest.len(), "wrote session manifest");
                }
                (manifest, false)
            }
        };

        let mut report = OpenReport {
            resumed,
            tracked: manifest.len(),
            ..OpenReport::default()
        };

        for path in &manifest {
            match self.open_file(path) {
                Ok(OpenOutcome::Decrypted) => report.decrypted += 1,
                Ok(OpenOutcome::AlreadyOpen) => report.already_open += 1,
                Err(e) => diagnostics.fail(path, e),
            }
        }

        report.diagnostics = diagnostics;
        Ok(report)
    }

    fn open_file(&self, path: &Path) -> Result<OpenOutcome> {
        let shadow = self.workspace.shadow();
        let live = fs::read(path).map_err(|e| PilferError::file_access(path, e))?;

        if shadow.contains(path) {
            // A record is only replaced while the live file still holds
            // the ciphertext it recorded; plaintext may itself look like a vault.
            let record = shadow.load(path)?;
            if live != record.ciphertext {
                tracing::debug!(path = %path.display(), "already decrypted");
                return Ok(OpenOutcome::AlreadyOpen);
            }
        } else if !self.codec.is_vault(&live) {
            return Err(PilferError::InvalidVaultFormat(format!(
                "{} is not a vault file",
                path.display()
            )));
        }

        // Nothing is written until decryption has succeeded.
        let plaintext = self.codec.decrypt(&live)?;
        shadow.save(path, &live, &content_hash(&plaintext))?;
        write_atomic(path, &plaintext).map_err(|e| PilferError::file_access(path, e))?;

        tracing::debug!(path = %path.display(), "decrypted");
        Ok(OpenOutcome::Decrypted)
    }

    // ------------------------------------------------------------------
    // CLOSE
    // ------------------------------------------------------------------

    /// Re-encrypt modified files, restore the original ciphertext of the
    /// rest, and end the session.
    ///
    /// Fails with `NoOpenSession` when there is no manifest.  Files that
    /// could not be settled stay open: the manifest is rewritten to list
    /// just those so that running CLOSE again picks them up.
    pub fn close(&self) -> Result<CloseReport> {
        let manifest = self.workspace.manifest().load()?;
        let shadow = self.workspace.shadow();
        let mut report = CloseReport::default();

        for path in &manifest {
            match self.close_file(path, &mut report.diagnostics) {
                Ok(CloseOutcome::Reencrypted) => report.modified += 1,
                Ok(CloseOutcome::Restored) => report.restored += 1,
                Ok(CloseOutcome::AlreadySealed) => report.already_sealed += 1,
                Err(e) => report.diagnostics.fail(path, e),
            }

            if shadow.contains(path) {
                report.pending.push(path.clone());
            }
        }

        if report.pending.is_empty() {
            if let Err(e) = shadow.remove_root() {
                report.diagnostics.warn(shadow.root(), e.to_string());
            }
            if let Err(e) = self.workspace.manifest().delete() {
                report
                    .diagnostics
                    .warn(self.workspace.manifest().path(), e.to_string());
            }
            tracing::info!(modified = report.modified, "session closed");
        } else {
            let remaining = Manifest::new(report.pending.clone());
            if let Err(e) = self.workspace.manifest().save(&remaining) {
                report
                    .diagnostics
                    .warn(self.workspace.manifest().path(), e.to_string());
            }
            tracing::info!(pending = report.pending.len(), "session left open");
        }

        Ok(report)
    }

    fn close_file(&self, path: &Path, diagnostics: &mut Diagnostics) -> Result<CloseOutcome> {
        let shadow = self.workspace.shadow();
        let record = shadow.load(path)?;
        let live = fs::read(path).map_err(|e| PilferError::file_access(path, e))?;

        // The hash is checked before the magic marker: unchanged plaintext
        // of a doubly encrypted file starts with the marker too.
        let (outcome, replacement) = if live == record.ciphertext {
            // Interrupted before OPEN replaced this file.
            (CloseOutcome::Restored, None)
        } else if content_hash(&live).eq_ignore_ascii_case(&record.plaintext_hash) {
            (CloseOutcome::Restored, Some(record.ciphertext))
        } else if self.codec.is_vault(&live) {
            // Interrupted after an earlier CLOSE sealed this file.
            (CloseOutcome::AlreadySealed, None)
        } else {
            (CloseOutcome::Reencrypted, Some(self.codec.encrypt(&live)?))
        };

        if let Some(ciphertext) = replacement {
            write_atomic(path, &ciphertext).map_err(|e| PilferError::file_access(path, e))?;
        }

        if let Err(e) = shadow.clear(path) {
            diagnostics.warn(path, e.to_string());
        }

        tracing::debug!(path = %path.display(), ?outcome, "closed");
        Ok(outcome)
    }
}
