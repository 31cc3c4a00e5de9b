#![allow(dead_code)]

use gitward::config::{AuditConfig, BackendKind, ClientConfig};
use gitward::GitClient;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Route test logs through the test harness; `RUST_LOG=debug` to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Run the real git binary and return its stdout, panicking on failure
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(["-c", "protocol.file.allow=always"])
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn configure(repo_path: &Path) {
    git(repo_path, &["config", "user.name", "Test User"]);
    git(repo_path, &["config", "user.email", "test@example.com"]);
    git(repo_path, &["config", "commit.gpgsign", "false"]);
}

/// Helper to create a test git repository with `main` as its initial branch
pub fn create_test_repo() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let repo_path = temp_dir.path().join("repo");
    init_repo_at(&repo_path);
    (temp_dir, repo_path)
}

pub fn init_repo_at(repo_path: &Path) {
    fs::create_dir_all(repo_path).unwrap();
    git(repo_path, &["init", "-q"]);
    git(repo_path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    configure(repo_path);
}

/// Bare repository with `main` as HEAD, suitable as a push target
pub fn create_bare_remote(parent: &Path, name: &str) -> PathBuf {
    let path = parent.join(name);
    fs::create_dir_all(&path).unwrap();
    git(&path, &["init", "-q", "--bare"]);
    git(&path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    path
}

/// Helper to create a commit; returns its id
pub fn create_commit(repo_path: &Path, file: &str, content: &str, message: &str) -> String {
    fs::write(repo_path.join(file), content).expect("Failed to write file");
    git(repo_path, &["add", file]);
    git(repo_path, &["commit", "-q", "-m", message]);
    git(repo_path, &["rev-parse", "HEAD"])
}

/// Source repository with `count` commits on `main`
pub fn create_source_repo(parent: &Path, count: usize) -> PathBuf {
    let path = parent.join("source");
    init_repo_at(&path);
    for i in 0..count {
        create_commit(&path, &format!("file{}.txt", i), &format!("content {}", i), &format!("Commit {}", i));
    }
    path
}

/// Client configuration for tests: local file transport allowed for
/// submodules, optional audit log
pub fn test_config(backend: BackendKind, audit_log: Option<PathBuf>) -> ClientConfig {
    let mut config = ClientConfig::default();
    config.backend = backend;
    config
        .environment
        .insert("GIT_CONFIG_COUNT".to_string(), "1".to_string());
    config
        .environment
        .insert("GIT_CONFIG_KEY_0".to_string(), "protocol.file.allow".to_string());
    config
        .environment
        .insert("GIT_CONFIG_VALUE_0".to_string(), "always".to_string());
    if let Some(path) = audit_log {
        config.audit = AuditConfig {
            enabled: true,
            path: Some(path),
        };
    }
    config
}

pub fn client(workdir: &Path, backend: BackendKind) -> GitClient {
    init_tracing();
    GitClient::new(workdir, test_config(backend, None)).expect("Failed to create client")
}

pub fn audited_client(workdir: &Path, backend: BackendKind, audit_log: &Path) -> GitClient {
    init_tracing();
    GitClient::new(workdir, test_config(backend, Some(audit_log.to_path_buf())))
        .expect("Failed to create client")
}

/// Lines of the audit log that mention `needle`
pub fn audit_lines_with(audit_log: &Path, needle: &str) -> Vec<String> {
    fs::read_to_string(audit_log)
        .unwrap_or_default()
        .lines()
        .filter(|line| line.contains(needle))
        .map(str::to_string)
        .collect()
}

pub fn file_url(path: &Path) -> String {
    format!("file://{}", path.display())
}
