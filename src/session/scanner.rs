//! Discovery of vault files under a project root.

use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::report::FileFailure;
use crate::errors::PilferError;

/// Upper bound on how much of a file is read to find its first line.
const FIRST_LINE_LIMIT: u64 = 4096;

/// Result of a scan: vault files in walk order, plus entries that could
/// not be read.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<PathBuf>,
    pub skipped: Vec<FileFailure>,
}

/// Walks a directory tree looking for files whose first line starts
/// with a magic marker.
pub struct FileScanner {
    magic: &'static [u8],
    skip_dirs: Vec<PathBuf>,
    exclude_names: Vec<OsString>,
}

impl FileScanner {
    pub fn new(magic: &'static [u8]) -> Self {
        Self {
            magic,
            skip_dirs: Vec::new(),
            exclude_names: Vec::new(),
        }
    }

    /// Never descend into `dir` (an exact path).
    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skip_dirs.push(dir.into());
        self
    }

    /// Never descend into directories called `name`, wherever they are.
    pub fn exclude_name(mut self, name: impl Into<OsString>) -> Self {
        self.exclude_names.push(name.into());
        self
    }

    /// Scan `root` recursively.
    ///
    /// Order follows the directory walk and is not sorted.  Unreadable
    /// entries are recorded in `skipped` and the walk continues.
    pub fn scan(&self, root: &Path) -> ScanOutcome {
        let mut outcome = ScanOutcome::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.is_skipped(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| root.to_path_buf());
                    let source: io::Error = err.into();
                    tracing::debug!(path = %path.display(), error = %source, "skipping entry");
                    outcome.skipped.push(FileFailure {
                        error: PilferError::file_access(&path, source),
                        path,
                    });
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match has_magic(entry.path(), self.magic) {
                Ok(true) => outcome.files.push(entry.into_path()),
                Ok(false) => {}
                Err(source) => {
                    tracing::debug!(path = %entry.path().display(), error = %source, "unreadable file");
                    outcome.skipped.push(FileFailure {
                        path: entry.path().to_path_buf(),
                        error: PilferError::file_access(entry.path(), source),
                    });
                }
            }
        }

        outcome
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        self.skip_dirs.iter().any(|dir| dir == entry.path())
            || self
                .exclude_names
                .iter()
                .any(|name| name.as_os_str() == entry.file_name())
    }
}

/// Returns `true` if the first line of `path` starts with `magic`.
///
/// Reads at most `FIRST_LINE_LIMIT` bytes.
pub fn has_magic(path: &Path, magic: &[u8]) -> io::Result<bool> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file.take(FIRST_LINE_LIMIT));
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    Ok(line.starts_with(magic))
}
