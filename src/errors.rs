use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in pilfer.
#[derive(Debug, Error)]
pub enum PilferError {
    // --- Secret errors ---
    #[error("Could not find vault password file ({0}) — pass one with -p/--vault-password-file")]
    SecretNotFound(String),

    // --- Session errors ---
    #[error("No open session — {0} not found (run `pilfer open` first)")]
    NoOpenSession(PathBuf),

    #[error("Shadow record for {path} is inconsistent: {reason}")]
    ShadowInconsistency { path: PathBuf, reason: String },

    #[error("Cleanup of {path} failed: {source}")]
    CleanupFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // --- File errors ---
    #[error("Cannot access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — {0}")]
    DecryptionFailed(String),

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl PilferError {
    /// Wrap an I/O error with the path it happened on.
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Build a `ShadowInconsistency` for `path`.
    pub fn shadow(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ShadowInconsistency {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for pilfer results.
pub type Result<T> = std::result::Result<T, PilferError>;
