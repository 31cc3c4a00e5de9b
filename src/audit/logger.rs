use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024; // 10MB

/// How an audited invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    Exited(i32),
    TimedOut,
    SpawnFailed,
}

impl std::fmt::Display for InvocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvocationStatus::Exited(code) => write!(f, "{}", code),
            InvocationStatus::TimedOut => f.write_str("timeout"),
            InvocationStatus::SpawnFailed => f.write_str("spawn-failed"),
        }
    }
}

/// Append-only record of every git invocation and rejected argument
///
/// Lines carry the already redacted command line. Nothing passed through the
/// environment of a child process is ever written here.
#[derive(Debug)]
pub struct AuditLogger {
    log_path: PathBuf,
    write_lock: Mutex<()>,
}

impl AuditLogger {
    /// Create an AuditLogger writing to `path`
    pub fn with_path<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let log_path = path.as_ref().to_path_buf();

        // Ensure directory exists
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }

        Ok(Self {
            log_path,
            write_lock: Mutex::new(()),
        })
    }

    /// Log one finished (or failed to start) invocation
    pub fn log_invocation(
        &self,
        command: &str,
        working_dir: &Path,
        timeout: &str,
        status: InvocationStatus,
    ) -> std::io::Result<()> {
        let log_entry = format!(
            "[{}] [{}] [{}] [timeout:{}] [exit:{}] {}\n",
            Utc::now().to_rfc3339(),
            current_user(),
            working_dir.display(),
            timeout,
            status,
            command
        );

        self.append(&log_entry)
    }

    /// Log a rejected URL or argument for forensics
    pub fn log_validation_failure(
        &self,
        value: &str,
        reason: &str,
        working_dir: &Path,
    ) -> std::io::Result<()> {
        let log_entry = format!(
            "[{}] [{}] [{}] [VALIDATION-REJECTED] value=\"{}\" reason=\"{}\"\n",
            Utc::now().to_rfc3339(),
            current_user(),
            working_dir.display(),
            value.escape_debug(),
            reason
        );

        self.append(&log_entry)
    }

    fn append(&self, entry: &str) -> std::io::Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        self.rotate_if_needed()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        file.write_all(entry.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// Rotate log file if it exceeds MAX_LOG_SIZE
    fn rotate_if_needed(&self) -> std::io::Result<()> {
        if !self.log_path.exists() {
            return Ok(());
        }

        let metadata = fs::metadata(&self.log_path)?;
        if metadata.len() > MAX_LOG_SIZE {
            // Rotate: audit.log -> audit.log.1
            let backup_path = self.log_path.with_extension("log.1");
            fs::rename(&self.log_path, backup_path)?;
        }

        Ok(())
    }

    /// Get the path to the log file
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_logger() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("audit").join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        assert_eq!(logger.log_path(), log_path);
        assert!(log_path.parent().unwrap().exists());
    }

    #[test]
    fn test_log_invocation() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        let repo_path = Path::new("/test/repo");

        logger
            .log_invocation("git fetch --tags origin", repo_path, "7min", InvocationStatus::Exited(0))
            .unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("git fetch --tags origin"));
        assert!(content.contains("/test/repo"));
        assert!(content.contains("[timeout:7min]"));
        assert!(content.contains("[exit:0]"));
    }

    #[test]
    fn test_multiple_log_entries() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        let repo_path = Path::new("/test/repo");

        logger
            .log_invocation("git init", repo_path, "10min", InvocationStatus::Exited(0))
            .unwrap();
        logger
            .log_invocation("git fetch", repo_path, "10min", InvocationStatus::TimedOut)
            .unwrap();
        logger
            .log_invocation("git push", repo_path, "10min", InvocationStatus::Exited(1))
            .unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("[exit:timeout]"));
        assert!(lines[2].contains("[exit:1]"));
    }

    #[test]
    fn test_log_rotation() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        let repo_path = Path::new("/test/repo");

        // Write a large entry to trigger rotation
        let large_command = "git ".to_string() + &"x".repeat(MAX_LOG_SIZE as usize);
        logger
            .log_invocation(&large_command, repo_path, "1min", InvocationStatus::Exited(0))
            .unwrap();

        // Write another entry - should trigger rotation
        logger
            .log_invocation("git status", repo_path, "1min", InvocationStatus::Exited(0))
            .unwrap();

        let backup_path = log_path.with_extension("log.1");
        assert!(backup_path.exists());

        assert!(log_path.exists());
        let metadata = fs::metadata(&log_path).unwrap();
        assert!(metadata.len() < MAX_LOG_SIZE);
    }

    #[test]
    fn test_log_validation_failure() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        let repo_path = Path::new("/test/repo");

        logger
            .log_validation_failure(
                "--upload-pack=touch /tmp/pwned",
                "value starts with '-'",
                repo_path,
            )
            .unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("VALIDATION-REJECTED"));
        assert!(content.contains("--upload-pack=touch /tmp/pwned"));
        assert!(content.contains("starts with '-'"));
    }

    #[test]
    fn test_validation_failure_newlines_stay_on_one_line() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let logger = AuditLogger::with_path(&log_path).unwrap();
        logger
            .log_validation_failure("-o\nforged line", "option", Path::new("/repo"))
            .unwrap();

        let content = fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
