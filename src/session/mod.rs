//! Session module — the open/close lifecycle of decrypted vault files.
//!
//! This module provides:
//! - Discovery of vault files in a project tree (`scanner`)
//! - The persisted manifest that marks a session as open (`manifest`)
//! - The shadow mirror of original ciphertexts and plaintext hashes (`shadow`)
//! - The `SessionController` that runs OPEN and CLOSE (`controller`)
//! - Reports and per-file diagnostics (`report`)
//! - Project paths and password-free status inspection (`workspace`)

pub mod atomic;
pub mod controller;
pub mod manifest;
pub mod report;
pub mod scanner;
pub mod shadow;
pub mod workspace;

// Re-export the most commonly used items.
pub use controller::SessionController;
pub use manifest::{Manifest, ManifestStore, SessionState};
pub use report::{CloseReport, Diagnostics, FileFailure, OpenReport, Warning};
pub use scanner::{FileScanner, ScanOutcome};
pub use shadow::{ShadowRecord, ShadowStore};
pub use workspace::{FileState, SessionStatus, TrackedStatus, Workspace};
