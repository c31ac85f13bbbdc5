//! `pilfer close` — re-encrypt modified files and end the session.

use crate::cli::output;
use crate::cli::{project_dir, vault_password, Cli};
use crate::config::Settings;
use crate::crypto::AnsibleVault;
use crate::errors::{PilferError, Result};
use crate::session::{SessionController, Workspace};

/// Execute the `close` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = project_dir()?;
    let settings = Settings::load(&cwd)?;
    let workspace = Workspace::new(&cwd, &settings);

    // Nothing to close: fail before asking for a password.
    if !workspace.manifest().exists() {
        return Err(PilferError::NoOpenSession(
            workspace.manifest().path().to_path_buf(),
        ));
    }

    let password = vault_password(cli, &cwd, &settings)?;
    let controller = SessionController::new(workspace, AnsibleVault::new(password.as_bytes()));

    let report = controller.close()?;

    output::print_diagnostics(&report.diagnostics);

    output::success(&format!(
        "Vault files re-encrypted. {} modified files have been updated.",
        report.modified
    ));

    if !report.pending.is_empty() {
        output::warning(&format!(
            "{} files are still open.",
            report.pending.len()
        ));
        output::tip("Fix the errors above and run `pilfer close` again.");
    }

    Ok(())
}
