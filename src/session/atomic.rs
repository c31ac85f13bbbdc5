//! Crash-safe file replacement.
//!
//! Files are replaced by rename, so the path ends up on a new inode:
//! hard links to the old file keep the old content and ownership
//! becomes that of the invoking user.  Permission bits are carried over.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;

/// Replace the contents of `path` with `bytes` **atomically**.
///
/// The data goes to a temp file in the same directory first and is then
/// renamed over the target, so a reader (or a crash) never observes a
/// half-written file.  If `path` already exists its permissions are
/// applied to the temp file before anything is written to it.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = create_temp(path)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

/// Empty temp file next to `path`, already carrying `path`'s permissions.
///
/// New temp files start owner-only; the temp file is removed on drop
/// unless it is persisted.
fn create_temp(path: &Path) -> io::Result<NamedTempFile> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let tmp = tempfile::Builder::new()
        .prefix(".pilfer-")
        .suffix(".tmp")
        .tempfile_in(parent)?;

    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions())?;
    }
    Ok(tmp)
}
