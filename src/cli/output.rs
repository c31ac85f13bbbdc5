//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::session::{Diagnostics, FileState, TrackedStatus};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print every per-file failure and cleanup warning from a transition.
pub fn print_diagnostics(diagnostics: &Diagnostics) {
    for failure in &diagnostics.failures {
        error(&format!(
            "Failed to process {}: {}",
            failure.path.display(),
            failure.error
        ));
    }
    for w in &diagnostics.warnings {
        warning(&format!("{}: {}", w.path.display(), w.message));
    }
}

/// Print a table of tracked files and their state.
pub fn print_status_table(files: &[TrackedStatus]) {
    if files.is_empty() {
        info("The open session tracks no files.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["File", "State"]);

    for f in files {
        let state = match f.state {
            FileState::Modified => style(f.state.label()).yellow().to_string(),
            FileState::MissingShadow | FileState::Unreadable => {
                style(f.state.label()).red().to_string()
            }
            _ => f.state.label().to_string(),
        };
        table.add_row(vec![f.path.display().to_string(), state]);
    }

    println!("{table}");
}
