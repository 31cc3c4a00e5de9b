use crate::error::{GitError, GitResult};
use crate::git::executor::GitExecutor;

/// Minimum required git version (`rev-parse --end-of-options`)
const MIN_GIT_VERSION: (u32, u32) = (2, 30);

/// First release with `git maintenance run --task=...`
const MAINTENANCE_VERSION: (u32, u32) = (2, 30);

/// Represents a git version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct GitVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl GitVersion {
    /// Detect the version of the executor's git binary
    pub fn detect(executor: &GitExecutor) -> GitResult<Self> {
        let output = executor
            .run_unchecked(&executor.git(["--version"]).timeout_minutes(1))
            .map_err(|e| GitError::GitVersionDetectionFailed(e.to_string()))?;

        if !output.success() {
            return Err(GitError::GitVersionDetectionFailed(
                "git --version command failed".to_string(),
            ));
        }

        Self::parse(&output.stdout_str())
    }

    /// Parse git version from string like "git version 2.39.2"
    pub fn parse(version_str: &str) -> GitResult<Self> {
        // Expected format: "git version X.Y.Z" or "git version X.Y.Z.windows.1" etc.
        let parts: Vec<&str> = version_str.split_whitespace().collect();

        if parts.len() < 3 || parts[0] != "git" || parts[1] != "version" {
            return Err(GitError::ParseError(format!(
                "Unexpected git version format: {}",
                version_str.trim()
            )));
        }

        let nums: Vec<&str> = parts[2].split('.').collect();
        if nums.len() < 2 {
            return Err(GitError::ParseError(format!(
                "Invalid version number format: {}",
                parts[2]
            )));
        }

        let major = nums[0]
            .parse::<u32>()
            .map_err(|_| GitError::ParseError(format!("Invalid major version: {}", nums[0])))?;

        let minor = nums[1]
            .parse::<u32>()
            .map_err(|_| GitError::ParseError(format!("Invalid minor version: {}", nums[1])))?;

        // Patch may carry suffixes like "0-rc1"
        let patch = nums
            .get(2)
            .map(|p| {
                p.chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>()
                    .parse::<u32>()
                    .unwrap_or(0)
            })
            .unwrap_or(0);

        Ok(GitVersion {
            major,
            minor,
            patch,
        })
    }

    pub fn is_at_least(&self, major: u32, minor: u32) -> bool {
        self.major > major || (self.major == major && self.minor >= minor)
    }

    /// Check if this version meets minimum requirements
    pub fn is_supported(&self) -> bool {
        self.is_at_least(MIN_GIT_VERSION.0, MIN_GIT_VERSION.1)
    }

    pub fn supports_maintenance(&self) -> bool {
        self.is_at_least(MAINTENANCE_VERSION.0, MAINTENANCE_VERSION.1)
    }

    /// Detect and fail when the installed git is older than the minimum
    pub fn validate(executor: &GitExecutor) -> GitResult<Self> {
        let version = Self::detect(executor)?;

        if !version.is_supported() {
            return Err(GitError::GitVersionTooOld(format!(
                "{}\n\nPlease upgrade git to version {}.{} or higher.\nVisit: https://git-scm.com/downloads",
                version, MIN_GIT_VERSION.0, MIN_GIT_VERSION.1
            )));
        }

        Ok(version)
    }
}

impl std::fmt::Display for GitVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}
