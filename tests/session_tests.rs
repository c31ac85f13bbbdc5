//! End-to-end tests for the OPEN/CLOSE lifecycle.
//!
//! Each test builds a throwaway project of real vault files, runs the
//! session controller over it, and checks the bytes left on disk.

use std::fs;
use std::path::{Path, PathBuf};

use pilfer::config::Settings;
use pilfer::crypto::{AnsibleVault, VaultCodec, VAULT_MAGIC};
use pilfer::errors::{PilferError, Result};
use pilfer::session::{FileState, SessionController, SessionStatus, Workspace};
use tempfile::TempDir;

const PASSWORD: &[u8] = b"correct horse battery staple";

const UNIX: &[u8] = b"db_user: admin\ndb_pass: hunter2\n";
const WINDOWS: &[u8] = b"api_key: abc123\r\napi_secret: xyz\r\n";
const MIXED: &[u8] = b"first: crlf\r\nsecond: lf\nthird: crlf\r\nlast: none";

/// A project directory holding three vault files with different line endings.
struct Project {
    dir: TempDir,
    files: Vec<(PathBuf, Vec<u8>, Vec<u8>)>,
}

impl Project {
    fn new() -> Self {
        Self::with_files(&[
            ("group_vars/all/vault.yml", UNIX),
            ("host_vars/web/vault.yml", WINDOWS),
            ("roles/db/vars/secrets.yml", MIXED),
        ])
    }

    fn with_files(specs: &[(&str, &[u8])]) -> Self {
        let dir = TempDir::new().unwrap();
        let codec = AnsibleVault::new(PASSWORD);
        let mut files = Vec::new();

        for (rel, plaintext) in specs {
            let path = dir.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            let ciphertext = codec.encrypt(plaintext).unwrap();
            fs::write(&path, &ciphertext).unwrap();
            files.push((path, plaintext.to_vec(), ciphertext));
        }

        // Plain files that must never be touched.
        fs::write(dir.path().join("site.yml"), b"- hosts: all\n").unwrap();
        fs::write(dir.path().join("README.md"), b"# project\n").unwrap();

        Self { dir, files }
    }

    fn path(&self, i: usize) -> &Path {
        &self.files[i].0
    }

    fn plaintext(&self, i: usize) -> &[u8] {
        &self.files[i].1
    }

    fn ciphertext(&self, i: usize) -> &[u8] {
        &self.files[i].2
    }

    fn workspace(&self) -> Workspace {
        Workspace::new(self.dir.path(), &Settings::default())
    }

    fn controller(&self) -> SessionController<AnsibleVault> {
        self.controller_with(AnsibleVault::new(PASSWORD))
    }

    fn controller_with<C: VaultCodec>(&self, codec: C) -> SessionController<C> {
        SessionController::new(self.workspace(), codec)
    }

    fn manifest_path(&self) -> PathBuf {
        self.dir.path().join("vaultedFileList.json")
    }

    fn shadow_root(&self) -> PathBuf {
        self.dir.path().join(".vault")
    }

    fn assert_fully_closed(&self) {
        assert!(!self.manifest_path().exists(), "manifest should be gone");
        assert!(!self.shadow_root().exists(), "shadow tree should be gone");
    }
}

fn decrypt_file(path: &Path) -> Vec<u8> {
    AnsibleVault::new(PASSWORD)
        .decrypt(&fs::read(path).unwrap())
        .unwrap()
}

/// Decrypts like the real codec but refuses to encrypt.
struct SealFails(AnsibleVault);

impl VaultCodec for SealFails {
    fn magic(&self) -> &'static [u8] {
        self.0.magic()
    }

    fn encrypt(&self, _plaintext: &[u8]) -> Result<Vec<u8>> {
        Err(PilferError::EncryptionFailed("disk full".into()))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.0.decrypt(ciphertext)
    }
}

// ---------------------------------------------------------------------------
// Full cycles
// ---------------------------------------------------------------------------

#[test]
fn open_then_close_without_edits_restores_original_bytes() {
    let project = Project::new();

    let report = project.controller().open().unwrap();
    assert!(!report.resumed);
    assert_eq!(report.tracked, 3);
    assert_eq!(report.decrypted, 3);
    assert!(report.diagnostics.is_clean());
    assert!(project.manifest_path().exists());

    for i in 0..3 {
        assert_eq!(fs::read(project.path(i)).unwrap(), project.plaintext(i));
    }
    assert_eq!(fs::read(project.dir.path().join("site.yml")).unwrap(), b"- hosts: all\n");

    let report = project.controller().close().unwrap();
    assert_eq!(report.modified, 0);
    assert_eq!(report.restored, 3);
    assert!(report.pending.is_empty());
    assert!(report.diagnostics.is_clean());

    for i in 0..3 {
        assert_eq!(fs::read(project.path(i)).unwrap(), project.ciphertext(i));
    }
    project.assert_fully_closed();
}

#[test]
fn one_edit_reencrypts_only_that_file() {
    let project = Project::new();
    project.controller().open().unwrap();

    let edited = b"db_user: admin\ndb_pass: rotated\n";
    fs::write(project.path(0), edited).unwrap();

    let report = project.controller().close().unwrap();
    assert_eq!(report.modified, 1);
    assert_eq!(report.restored, 2);

    let new_ciphertext = fs::read(project.path(0)).unwrap();
    assert!(new_ciphertext.starts_with(VAULT_MAGIC));
    assert_ne!(new_ciphertext, project.ciphertext(0));
    assert_eq!(decrypt_file(project.path(0)), edited);

    assert_eq!(fs::read(project.path(1)).unwrap(), project.ciphertext(1));
    assert_eq!(fs::read(project.path(2)).unwrap(), project.ciphertext(2));
    project.assert_fully_closed();
}

#[test]
fn two_edits_are_counted() {
    let project = Project::new();
    project.controller().open().unwrap();

    fs::write(project.path(1), b"api_key: new\r\napi_secret: new\r\n").unwrap();
    fs::write(project.path(2), b"first: crlf\r\nsecond: lf\n").unwrap();

    let report = project.controller().close().unwrap();
    assert_eq!(report.modified, 2);
    assert_eq!(report.restored, 1);
    assert_eq!(fs::read(project.path(0)).unwrap(), project.ciphertext(0));
    assert_eq!(decrypt_file(project.path(2)), b"first: crlf\r\nsecond: lf\n");
}

#[test]
fn line_ending_change_alone_counts_as_a_modification() {
    let project = Project::with_files(&[("vault.yml", UNIX)]);
    project.controller().open().unwrap();

    let crlf = b"db_user: admin\r\ndb_pass: hunter2\r\n";
    fs::write(project.path(0), crlf).unwrap();

    let report = project.controller().close().unwrap();
    assert_eq!(report.modified, 1);
    assert_eq!(decrypt_file(project.path(0)), crlf);
}

#[test]
fn line_endings_survive_repeated_cycles() {
    let project = Project::new();

    for _ in 0..2 {
        project.controller().open().unwrap();
        for i in 0..3 {
            assert_eq!(fs::read(project.path(i)).unwrap(), project.plaintext(i));
        }
        project.controller().close().unwrap();
    }

    for i in 0..3 {
        assert_eq!(fs::read(project.path(i)).unwrap(), project.ciphertext(i));
    }
}

#[test]
fn binary_plaintext_round_trips() {
    let blob: &[u8] = &[0x00, 0xff, 0xfe, b'\r', b'\n', 0x80, b'\n'];
    let project = Project::with_files(&[("files/blob.bin", blob)]);

    project.controller().open().unwrap();
    assert_eq!(fs::read(project.path(0)).unwrap(), blob);

    let report = project.controller().close().unwrap();
    assert_eq!(report.restored, 1);
    assert_eq!(fs::read(project.path(0)).unwrap(), project.ciphertext(0));
}

#[test]
fn empty_project_leaves_no_session_behind() {
    let project = Project::with_files(&[]);

    let report = project.controller().open().unwrap();
    assert_eq!(report.tracked, 0);
    assert!(!project.manifest_path().exists());
    assert_eq!(
        project.workspace().status(VAULT_MAGIC).unwrap(),
        SessionStatus::Closed
    );

    // A vault file added later is found by the next OPEN.
    let late = project.dir.path().join("late.yml");
    fs::write(&late, AnsibleVault::new(PASSWORD).encrypt(b"late: 1\n").unwrap()).unwrap();
    let report = project.controller().open().unwrap();
    assert!(!report.resumed);
    assert_eq!(report.decrypted, 1);
}

#[test]
fn scan_problems_are_reported_as_warnings() {
    let tmp = TempDir::new().unwrap();
    let gone = tmp.path().join("gone");
    let controller =
        SessionController::new(Workspace::new(&gone, &Settings::default()), AnsibleVault::new(PASSWORD));

    let report = controller.open().unwrap();
    assert_eq!(report.tracked, 0);
    assert!(report.diagnostics.failures.is_empty());
    assert_eq!(report.diagnostics.warnings.len(), 1);
    assert_eq!(report.diagnostics.warnings[0].path, gone);
    assert!(report.diagnostics.warnings[0]
        .message
        .contains("skipped during scan"));
}

#[test]
fn git_directory_is_not_scanned() {
    let project = Project::with_files(&[("vault.yml", UNIX), (".git/objects/vault.yml", UNIX)]);

    let report = project.controller().open().unwrap();
    assert_eq!(report.tracked, 1);
    assert_eq!(fs::read(project.path(1)).unwrap(), project.ciphertext(1));
}

// ---------------------------------------------------------------------------
// Best-effort processing
// ---------------------------------------------------------------------------

#[test]
fn corrupt_file_does_not_stop_open() {
    let project = Project::new();
    let corrupt = b"$ANSIBLE_VAULT;1.1;AES256\n6162636465666768\n";
    fs::write(project.path(1), corrupt).unwrap();

    let report = project.controller().open().unwrap();
    assert_eq!(report.tracked, 3);
    assert_eq!(report.decrypted, 2);
    assert_eq!(report.diagnostics.failures.len(), 1);
    assert_eq!(report.diagnostics.failures[0].path, project.path(1));

    assert_eq!(fs::read(project.path(0)).unwrap(), project.plaintext(0));
    assert_eq!(fs::read(project.path(1)).unwrap(), corrupt);
    assert_eq!(fs::read(project.path(2)).unwrap(), project.plaintext(2));

    // The corrupt file was never opened, so CLOSE has no record for it.
    let report = project.controller().close().unwrap();
    assert_eq!(report.restored, 2);
    assert_eq!(report.diagnostics.failures.len(), 1);
    assert!(matches!(
        report.diagnostics.failures[0].error,
        PilferError::ShadowInconsistency { .. }
    ));
    assert!(report.pending.is_empty());
    assert_eq!(fs::read(project.path(1)).unwrap(), corrupt);
    project.assert_fully_closed();
}

#[test]
fn wrong_password_fails_each_file_and_touches_nothing() {
    let project = Project::new();

    let report = project
        .controller_with(AnsibleVault::new(b"wrong"))
        .open()
        .unwrap();
    assert_eq!(report.decrypted, 0);
    assert_eq!(report.diagnostics.failures.len(), 3);
    assert!(report
        .diagnostics
        .failures
        .iter()
        .all(|f| matches!(f.error, PilferError::DecryptionFailed(_))));

    for i in 0..3 {
        assert_eq!(fs::read(project.path(i)).unwrap(), project.ciphertext(i));
    }
    assert!(project.workspace().shadow().is_empty());
}

#[test]
fn deleted_live_file_stays_pending() {
    let project = Project::new();
    project.controller().open().unwrap();
    fs::remove_file(project.path(2)).unwrap();

    let report = project.controller().close().unwrap();
    assert_eq!(report.restored, 2);
    assert_eq!(report.diagnostics.failures.len(), 1);
    assert!(matches!(
        report.diagnostics.failures[0].error,
        PilferError::FileAccess { .. }
    ));
    assert_eq!(report.pending, vec![project.path(2).to_path_buf()]);

    // The original ciphertext is still recoverable from the shadow tree.
    let record = project.workspace().shadow().load(project.path(2)).unwrap();
    assert_eq!(record.ciphertext, project.ciphertext(2));
}

#[test]
fn failed_encryption_leaves_file_open_and_manifest_rewritten() {
    let project = Project::new();
    project.controller().open().unwrap();

    let edited = b"db_user: admin\ndb_pass: changed\n";
    fs::write(project.path(0), edited).unwrap();

    let report = project
        .controller_with(SealFails(AnsibleVault::new(PASSWORD)))
        .close()
        .unwrap();
    assert_eq!(report.modified, 0);
    assert_eq!(report.restored, 2);
    assert_eq!(report.diagnostics.failures.len(), 1);
    assert_eq!(report.pending, vec![project.path(0).to_path_buf()]);

    // Still plaintext, still tracked, and only it.
    assert_eq!(fs::read(project.path(0)).unwrap(), edited);
    let manifest = project.workspace().manifest().load().unwrap();
    assert_eq!(manifest.paths(), &[project.path(0).to_path_buf()]);

    let report = project.controller().close().unwrap();
    assert_eq!(report.modified, 1);
    assert!(report.pending.is_empty());
    assert_eq!(decrypt_file(project.path(0)), edited);
    project.assert_fully_closed();
}

#[test]
fn leftover_shadow_content_is_a_warning_not_a_failure() {
    let project = Project::new();
    project.controller().open().unwrap();
    fs::write(project.shadow_root().join("stray"), b"x").unwrap();

    let report = project.controller().close().unwrap();
    assert!(report.diagnostics.failures.is_empty());
    assert_eq!(report.diagnostics.warnings.len(), 1);
    assert_eq!(report.diagnostics.warnings[0].path, project.shadow_root());
    assert!(!project.manifest_path().exists());
}

// ---------------------------------------------------------------------------
// Plaintext that looks like a vault
// ---------------------------------------------------------------------------

/// A vault whose plaintext is itself a vault file.
fn doubly_encrypted_project() -> (Project, Vec<u8>) {
    let codec = AnsibleVault::new(PASSWORD);
    let inner = codec.encrypt(b"secret: 1\n").unwrap();
    (Project::with_files(&[("vault.yml", inner.as_slice())]), inner)
}

#[test]
fn unchanged_doubly_encrypted_file_is_restored() {
    let (project, inner) = doubly_encrypted_project();

    project.controller().open().unwrap();
    assert_eq!(fs::read(project.path(0)).unwrap(), inner);

    let report = project.controller().close().unwrap();
    assert_eq!(report.restored, 1);
    assert_eq!(report.already_sealed, 0);
    assert_eq!(report.modified, 0);
    assert_eq!(fs::read(project.path(0)).unwrap(), project.ciphertext(0));
    project.assert_fully_closed();
}

#[test]
fn reopening_doubly_encrypted_file_keeps_the_original_record() {
    let (project, inner) = doubly_encrypted_project();

    project.controller().open().unwrap();
    let report = project.controller().open().unwrap();
    assert_eq!(report.already_open, 1);
    assert_eq!(report.decrypted, 0);
    assert_eq!(fs::read(project.path(0)).unwrap(), inner);

    let record = project.workspace().shadow().load(project.path(0)).unwrap();
    assert_eq!(record.ciphertext, project.ciphertext(0));

    project.controller().close().unwrap();
    assert_eq!(fs::read(project.path(0)).unwrap(), project.ciphertext(0));
}

#[test]
fn status_shows_doubly_encrypted_file_as_unchanged() {
    let (project, _inner) = doubly_encrypted_project();
    project.controller().open().unwrap();

    match project.workspace().status(VAULT_MAGIC).unwrap() {
        SessionStatus::Open(files) => assert_eq!(files[0].state, FileState::Unchanged),
        SessionStatus::Closed => panic!("expected an open session"),
    }
}

// ---------------------------------------------------------------------------
// Resuming interrupted runs
// ---------------------------------------------------------------------------

#[test]
fn close_without_open_session_fails() {
    let project = Project::new();
    let result = project.controller().close();
    assert!(matches!(result, Err(PilferError::NoOpenSession(_))));

    for i in 0..3 {
        assert_eq!(fs::read(project.path(i)).unwrap(), project.ciphertext(i));
    }
}

#[test]
fn second_open_reuses_the_manifest() {
    let project = Project::new();
    project.controller().open().unwrap();

    // Not in the manifest, so a resumed OPEN must leave it alone.
    let late = project.dir.path().join("late.yml");
    let late_ciphertext = AnsibleVault::new(PASSWORD).encrypt(b"late: true\n").unwrap();
    fs::write(&late, &late_ciphertext).unwrap();

    let report = project.controller().open().unwrap();
    assert!(report.resumed);
    assert_eq!(report.tracked, 3);
    assert_eq!(report.decrypted, 0);
    assert_eq!(report.already_open, 3);
    assert_eq!(fs::read(&late).unwrap(), late_ciphertext);

    // Records from the first run are intact.
    let record = project.workspace().shadow().load(project.path(0)).unwrap();
    assert_eq!(record.ciphertext, project.ciphertext(0));
}

#[test]
fn open_resumes_after_interruption_midway() {
    let project = Project::new();
    project.controller().open().unwrap();

    // Roll file 2 back to "not yet processed": ciphertext on disk, no record.
    fs::write(project.path(2), project.ciphertext(2)).unwrap();
    project.workspace().shadow().clear(project.path(2)).unwrap();

    let report = project.controller().open().unwrap();
    assert!(report.resumed);
    assert_eq!(report.decrypted, 1);
    assert_eq!(report.already_open, 2);
    for i in 0..3 {
        assert_eq!(fs::read(project.path(i)).unwrap(), project.plaintext(i));
    }

    let report = project.controller().close().unwrap();
    assert_eq!(report.restored, 3);
    for i in 0..3 {
        assert_eq!(fs::read(project.path(i)).unwrap(), project.ciphertext(i));
    }
}

#[test]
fn close_handles_file_interrupted_between_record_and_write() {
    let project = Project::new();
    project.controller().open().unwrap();

    // Record saved, live file never replaced.
    fs::write(project.path(1), project.ciphertext(1)).unwrap();

    let report = project.controller().close().unwrap();
    assert_eq!(report.modified, 0);
    assert_eq!(report.restored, 3);
    assert_eq!(fs::read(project.path(1)).unwrap(), project.ciphertext(1));
    project.assert_fully_closed();
}

#[test]
fn close_resumes_without_double_encrypting() {
    let project = Project::new();
    project.controller().open().unwrap();

    let edited = b"api_key: rotated\r\n";
    fs::write(project.path(1), edited).unwrap();

    // An earlier CLOSE sealed file 1 and then died before clearing its record.
    let sealed = AnsibleVault::new(PASSWORD).encrypt(edited).unwrap();
    fs::write(project.path(1), &sealed).unwrap();

    let report = project.controller().close().unwrap();
    assert_eq!(report.already_sealed, 1);
    assert_eq!(report.modified, 0);
    assert_eq!(report.restored, 2);
    assert_eq!(fs::read(project.path(1)).unwrap(), sealed);
    assert_eq!(decrypt_file(project.path(1)), edited);
    project.assert_fully_closed();
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[test]
fn status_reports_closed_without_a_manifest() {
    let project = Project::new();
    assert_eq!(
        project.workspace().status(VAULT_MAGIC).unwrap(),
        SessionStatus::Closed
    );
}

#[test]
fn status_classifies_tracked_files() {
    let project = Project::new();
    project.controller().open().unwrap();

    fs::write(project.path(0), b"changed\n").unwrap();
    fs::write(project.path(1), project.ciphertext(1)).unwrap();
    project.workspace().shadow().clear(project.path(2)).unwrap();

    let files = match project.workspace().status(VAULT_MAGIC).unwrap() {
        SessionStatus::Open(files) => files,
        SessionStatus::Closed => panic!("expected an open session"),
    };

    let state_of = |p: &Path| files.iter().find(|f| f.path == p).map(|f| f.state);
    assert_eq!(state_of(project.path(0)), Some(FileState::Modified));
    assert_eq!(state_of(project.path(1)), Some(FileState::Sealed));
    assert_eq!(state_of(project.path(2)), Some(FileState::MissingShadow));
}

#[test]
fn status_shows_unchanged_files_right_after_open() {
    let project = Project::new();
    project.controller().open().unwrap();

    match project.workspace().status(VAULT_MAGIC).unwrap() {
        SessionStatus::Open(files) => {
            assert_eq!(files.len(), 3);
            assert!(files.iter().all(|f| f.state == FileState::Unchanged));
        }
        SessionStatus::Closed => panic!("expected an open session"),
    }
}
