//! Profile persistence through the CLI (non-interactive paths only)
use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use infrasentinel::profiles::ProfilesFile;

fn run_infrasentinel(config_home: &Path, args: &[&str]) -> (bool, String) {
    let output = Command::cargo_bin("infrasentinel")
        .expect("binary built")
        .env("XDG_CONFIG_HOME", config_home)
        .args(args)
        .output()
        .expect("run infrasentinel");
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    (output.status.success(), text)
}

fn profiles_path(config_home: &Path) -> PathBuf {
    config_home.join("infrasentinel").join("profiles.json")
}

fn load(config_home: &Path) -> ProfilesFile {
    let data = fs::read_to_string(profiles_path(config_home)).expect("profiles.json created");
    serde_json::from_str(&data).expect("valid profiles.json")
}

#[test]
fn test_profile_created_on_first_use() {
    let td = tempfile::tempdir().unwrap();
    let (ok, out) = run_infrasentinel(
        td.path(),
        &["--profile", "unittest", "http://example:1", "--dry-run"],
    );
    assert!(ok, "{out}");
    let pf = load(td.path());
    assert_eq!(pf.profiles["unittest"].url, "http://example:1");
}

#[test]
fn test_profile_overwrite_only_when_changed() {
    let td = tempfile::tempdir().unwrap();
    run_infrasentinel(td.path(), &["--profile", "prod", "http://one:8000", "--dry-run"]);
    let first = fs::read_to_string(profiles_path(td.path())).unwrap();
    run_infrasentinel(td.path(), &["--profile", "prod", "http://one:8000", "--dry-run"]);
    let second = fs::read_to_string(profiles_path(td.path())).unwrap();
    assert_eq!(first, second, "Profile file changed despite identical input");

    // --save overwrites without prompting
    run_infrasentinel(
        td.path(),
        &["--profile", "prod", "--save", "http://two:8000", "--dry-run"],
    );
    assert_eq!(load(td.path()).profiles["prod"].url, "http://two:8000");
}

#[test]
fn test_profile_tls_ca_and_user_persisted() {
    let td = tempfile::tempdir().unwrap();
    run_infrasentinel(
        td.path(),
        &[
            "--profile",
            "secureX",
            "--tls-ca",
            "/tmp/cert.pem",
            "-u",
            "ops",
            "https://host:8443",
            "--dry-run",
        ],
    );
    let pf = load(td.path());
    let entry = &pf.profiles["secureX"];
    assert_eq!(entry.tls_ca.as_deref(), Some("/tmp/cert.pem"));
    assert_eq!(entry.username.as_deref(), Some("ops"));
}

#[test]
fn test_saved_profile_is_loaded_by_name() {
    let td = tempfile::tempdir().unwrap();
    run_infrasentinel(td.path(), &["--profile", "lab", "http://lab:8000", "--dry-run"]);
    let (ok, out) = run_infrasentinel(td.path(), &["--profile", "lab", "--dry-run"]);
    assert!(ok, "{out}");
    assert!(out.contains("http://lab:8000/"), "{out}");
}

#[test]
fn test_logout_removes_stored_token() {
    let td = tempfile::tempdir().unwrap();
    let dir = td.path().join("infrasentinel");
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join("session.json"),
        r#"{"infrasentinel_token":"a.b.c"}"#,
    )
    .unwrap();
    let (ok, out) = run_infrasentinel(td.path(), &["--logout"]);
    assert!(ok, "{out}");
    let data = fs::read_to_string(dir.join("session.json")).unwrap_or_default();
    assert!(!data.contains("a.b.c"), "token survived logout: {data}");
}
