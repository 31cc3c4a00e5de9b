use crate::error::{ErrorCategory, GitError};
use crate::git::duration_label;

#[derive(Debug, Clone)]
pub struct UserFriendlyError {
    pub category: ErrorCategory,
    pub simple_message: String,
    pub suggestion: Option<String>,
    pub raw_error: String,
}

/// Turns [`GitError`]s into messages for the operator running a job
pub struct ErrorTranslator;

impl ErrorTranslator {
    /// Translate a GitError into an operator-facing message and suggestion
    pub fn translate(error: &GitError) -> UserFriendlyError {
        let raw_error = error.to_string();
        let category = error.category();

        let (simple_message, suggestion) = match error {
            GitError::Validation { value, .. } => (
                format!("Refused to pass '{}' to git: it looks like a git option.", value),
                Some(
                    "Check the repository URL and ref names. If the value is intentional, \
                     check_remote_url can be turned off in the client configuration."
                        .to_string(),
                ),
            ),
            GitError::Timeout { timeout, .. } => (
                format!(
                    "The git operation did not finish within {} and was stopped.",
                    duration_label(*timeout)
                ),
                Some("Increase the timeout for this operation or check network access to the remote.".to_string()),
            ),
            GitError::LockHeld(_) => (
                "Another git process holds a lock in this repository.".to_string(),
                Some(
                    "Wait for the other process to finish. If none is running, remove the stale \
                     .lock file."
                        .to_string(),
                ),
            ),
            GitError::Unsupported { backend, operation } => (
                format!("The {} backend cannot perform: {}.", backend, operation),
                Some("Switch the client to the cli backend for this operation.".to_string()),
            ),
            GitError::NotARepository(path) => (
                format!("{} is not a git repository.", path.display()),
                Some("Clone or initialise the repository first.".to_string()),
            ),
            GitError::GitVersionTooOld(_) => (
                "The installed git is too old.".to_string(),
                Some("Install git 2.30 or newer.".to_string()),
            ),
            GitError::Spawn { program, .. } => (
                format!("Could not start {}.", program),
                Some("Check git_executable in the client configuration and that git is installed.".to_string()),
            ),
            GitError::Config(_) => (
                "Configuration error occurred.".to_string(),
                Some("Check your config file at ~/.config/gitward/config.toml".to_string()),
            ),
            GitError::CommandFailed { output, .. } => Self::match_error_patterns(output)
                .unwrap_or_else(|| (raw_error.clone(), None)),
            GitError::Library { source, .. } => Self::match_error_patterns(source.message())
                .unwrap_or_else(|| (raw_error.clone(), None)),
            GitError::NotFound(_)
            | GitError::ParseError(_)
            | GitError::GitVersionDetectionFailed(_)
            | GitError::IoError(_) => (raw_error.clone(), None),
        };

        UserFriendlyError {
            category,
            simple_message,
            suggestion,
            raw_error,
        }
    }

    /// Match common git error output
    fn match_error_patterns(error_text: &str) -> Option<(String, Option<String>)> {
        let lower = error_text.to_lowercase();

        // Authentication
        if lower.contains("authentication failed")
            || lower.contains("permission denied")
            || lower.contains("could not read username")
        {
            return Some((
                "Authentication failed - check your credentials.".to_string(),
                Some("Verify the SSH key or password configured for this remote.".to_string()),
            ));
        }

        // Host key
        if lower.contains("host key verification failed") {
            return Some((
                "The remote host key could not be verified.".to_string(),
                Some("Add the host to known_hosts or adjust ssh.host_key_verification.".to_string()),
            ));
        }

        // Remote not found
        if lower.contains("repository not found")
            || lower.contains("does not appear to be a git repository")
        {
            return Some((
                "Remote repository not found.".to_string(),
                Some("Check the remote URL and your access rights to it.".to_string()),
            ));
        }

        // Name resolution and connectivity
        if lower.contains("could not resolve host") || lower.contains("connection refused") {
            return Some((
                "Could not reach the remote host.".to_string(),
                Some("Check network access and proxy settings.".to_string()),
            ));
        }

        // Merge conflicts
        if lower.contains("conflict") {
            return Some((
                "Merge has conflicts that need to be resolved.".to_string(),
                None,
            ));
        }

        // Push rejected
        if lower.contains("rejected") || lower.contains("non-fast-forward") {
            return Some((
                "The remote rejected the push.".to_string(),
                Some("Fetch and merge the remote changes first, or push with force.".to_string()),
            ));
        }

        // Unknown revision
        if lower.contains("unknown revision") || lower.contains("did not match any") {
            return Some((
                "The requested revision does not exist.".to_string(),
                Some("Fetch the remote first or check the branch or tag name.".to_string()),
            ));
        }

        // Existing branch or tag
        if lower.contains("already exists") {
            return Some((
                "A branch or tag with that name already exists.".to_string(),
                Some("Use a different name or delete the existing one first.".to_string()),
            ));
        }

        None
    }
}
