//! `pilfer status` — show whether a session is open and what changed.

use crate::cli::output;
use crate::cli::project_dir;
use crate::crypto::VAULT_MAGIC;
use crate::errors::Result;
use crate::session::{FileState, SessionStatus, Workspace};

/// Execute the `status` command. Needs no password.
pub fn execute() -> Result<()> {
    let workspace = Workspace::load(project_dir()?)?;

    match workspace.status(VAULT_MAGIC)? {
        SessionStatus::Closed => {
            output::info("No open session.");
        }
        SessionStatus::Open(files) => {
            let modified = files
                .iter()
                .filter(|f| f.state == FileState::Modified)
                .count();
            output::info(&format!(
                "Session open: {} tracked files, {modified} modified.",
                files.len()
            ));
            output::print_status_table(&files);
        }
    }

    Ok(())
}
