//! Integration tests for the fdrepo CLI binary.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

/// A throwaway repository checkout
struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    fn new(apps_yaml: &str) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        std::fs::write(dir.path().join("apps.yaml"), apps_yaml).expect("failed to write apps.yaml");
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn fdrepo(&self, args: &[&str]) -> Output {
        let bin_path = env!("CARGO_BIN_EXE_fdrepo");
        Command::new(bin_path)
            .arg("--root")
            .arg(self.root())
            .args(args)
            .env_remove("FDREPO_APPS")
            .env_remove("FDREPO_CONFIG")
            .env("NO_COLOR", "1")
            .output()
            .expect("failed to run fdrepo")
    }
}

// Fails before any network access: the source is not a GitHub repository.
const OFF_GITHUB: &str = "- id: org.example\n  name: Example\n  url: https://gitlab.com/o/example\n";

#[test]
fn test_help_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_fdrepo"))
        .arg("--help")
        .output()
        .expect("failed to run fdrepo");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("update"));
}

#[test]
fn test_version_command() {
    let output = Command::new(env!("CARGO_BIN_EXE_fdrepo"))
        .arg("--version")
        .output()
        .expect("failed to run fdrepo");
    assert!(output.status.success());
}

#[test]
fn test_status_writes_markdown_page() {
    let repo = TestRepo::new(OFF_GITHUB);
    let page = repo.root().join("docs/app-status.md");

    let output = repo.fdrepo(&["status", "--markdown", page.to_str().unwrap()]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("org.example"));
    let content = std::fs::read_to_string(&page).unwrap();
    assert!(content.contains("Last updated:"));
    assert!(content.contains("| Example | N/A |"));
}

#[test]
fn test_missing_app_list_fails() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_fdrepo"))
        .arg("--root")
        .arg(dir.path())
        .arg("status")
        .env_remove("FDREPO_APPS")
        .output()
        .expect("failed to run fdrepo");
    assert!(!output.status.success());
}

#[test]
fn test_failed_app_only_fails_strict_runs() {
    let repo = TestRepo::new(OFF_GITHUB);

    let output = repo.fdrepo(&["update"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("failed"));

    let output = repo.fdrepo(&["update", "--strict"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_json_report() {
    let repo = TestRepo::new(OFF_GITHUB);
    let output = repo.fdrepo(&["update", "--json"]);
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["apps"][0]["app"], "org.example");
    assert_eq!(report["apps"][0]["outcome"]["status"], "failed");
    assert_eq!(report["cancelled"], false);
}

#[test]
fn test_unconfigured_app_is_removed_unless_dry_run() {
    let repo = TestRepo::new(OFF_GITHUB);
    let gone = repo.root().join("apks/org.gone");
    std::fs::create_dir_all(&gone).unwrap();
    std::fs::write(gone.join("org.gone_1.apk"), b"apk").unwrap();

    let output = repo.fdrepo(&["update", "--dry-run"]);
    assert!(output.status.success());
    assert!(gone.join("org.gone_1.apk").exists());

    let output = repo.fdrepo(&["update"]);
    assert!(output.status.success());
    assert!(!gone.exists());
}

#[test]
fn test_rejected_entry_keeps_its_stored_app() {
    let repo = TestRepo::new(&format!("{OFF_GITHUB}- id: org.typo\n  name: No url\n"));
    for id in ["org.typo", "org.gone"] {
        std::fs::create_dir_all(repo.root().join("apks").join(id)).unwrap();
    }

    let output = repo.fdrepo(&["update"]);
    assert!(output.status.success());
    assert!(repo.root().join("apks/org.typo").exists());
    assert!(!repo.root().join("apks/org.gone").exists());
    assert!(String::from_utf8_lossy(&output.stdout).contains("org.typo: entry rejected"));
}

#[test]
fn test_empty_app_list_removes_stored_apps() {
    let repo = TestRepo::new("apps: []\n");
    let gone = repo.root().join("apks/org.gone");
    std::fs::create_dir_all(&gone).unwrap();

    let output = repo.fdrepo(&["update"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(!gone.exists());
}

#[test]
fn test_add_then_status() {
    let repo = TestRepo::new(OFF_GITHUB);
    let output = repo.fdrepo(&[
        "add",
        "https://github.com/someone/fresh-app",
        "--id",
        "org.fresh",
        "--category",
        "System",
    ]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let list = std::fs::read_to_string(repo.root().join("apps.yaml")).unwrap();
    assert!(list.contains("org.example"));
    assert!(list.contains("author: someone"));

    let output = repo.fdrepo(&["status"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("org.fresh"));

    let again = repo.fdrepo(&["add", "someone/fresh-app", "--id", "org.fresh"]);
    assert!(!again.status.success());
}

#[test]
fn test_add_print_leaves_list_alone() {
    let repo = TestRepo::new(OFF_GITHUB);
    let output = repo.fdrepo(&["add", "someone/fresh-app", "--id", "org.fresh", "--print"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("name: Fresh App"));
    let list = std::fs::read_to_string(repo.root().join("apps.yaml")).unwrap();
    assert_eq!(list, OFF_GITHUB);
}
