//! `pilfer open` — decrypt every vault file in the project in place.

use crate::cli::output;
use crate::cli::{project_dir, vault_password, Cli};
use crate::config::Settings;
use crate::crypto::AnsibleVault;
use crate::errors::Result;
use crate::session::{SessionController, Workspace};

/// Execute the `open` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let cwd = project_dir()?;
    let settings = Settings::load(&cwd)?;

    // The password is resolved before anything on disk is touched.
    let password = vault_password(cli, &cwd, &settings)?;
    let controller = SessionController::new(
        Workspace::new(&cwd, &settings),
        AnsibleVault::new(password.as_bytes()),
    );

    let report = controller.open()?;

    if report.resumed {
        output::info("A session is already open — resuming with the existing file list.");
    }

    output::print_diagnostics(&report.diagnostics);

    if report.tracked == 0 {
        output::info("No vault files found.");
        return Ok(());
    }

    if report.already_open > 0 {
        output::info(&format!(
            "{} files were already decrypted by an earlier run.",
            report.already_open
        ));
    }

    output::success(&format!(
        "Vault files decrypted. {} of {} files are open for editing.",
        report.decrypted + report.already_open,
        report.tracked
    ));
    output::tip("Run `pilfer close` when you are done to re-encrypt them.");

    Ok(())
}
