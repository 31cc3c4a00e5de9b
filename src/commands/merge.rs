use std::fmt;

use crate::backend::GitBackend;
use crate::error::GitResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Whatever git picks
    #[default]
    Default,
    Resolve,
    Recursive,
    Octopus,
    Ours,
    Subtree,
    /// `recursive` favouring the merged side on conflicts (`-X theirs`)
    RecursiveTheirs,
}

impl MergeStrategy {
    /// `-s`/`-X` arguments for the git command line
    pub fn args(self) -> &'static [&'static str] {
        match self {
            MergeStrategy::Default => &[],
            MergeStrategy::Resolve => &["-s", "resolve"],
            MergeStrategy::Recursive => &["-s", "recursive"],
            MergeStrategy::Octopus => &["-s", "octopus"],
            MergeStrategy::Ours => &["-s", "ours"],
            MergeStrategy::Subtree => &["-s", "subtree"],
            MergeStrategy::RecursiveTheirs => &["-s", "recursive", "-X", "theirs"],
        }
    }
}

impl fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeStrategy::Default => "default",
            MergeStrategy::Resolve => "resolve",
            MergeStrategy::Recursive => "recursive",
            MergeStrategy::Octopus => "octopus",
            MergeStrategy::Ours => "ours",
            MergeStrategy::Subtree => "subtree",
            MergeStrategy::RecursiveTheirs => "recursive-theirs",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FastForwardMode {
    /// Fast-forward when possible, merge commit otherwise
    #[default]
    Ff,
    /// Fail unless a fast-forward is possible
    FfOnly,
    /// Always create a merge commit
    NoFf,
}

impl FastForwardMode {
    pub fn arg(self) -> &'static str {
        match self {
            FastForwardMode::Ff => "--ff",
            FastForwardMode::FfOnly => "--ff-only",
            FastForwardMode::NoFf => "--no-ff",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MergeOptions {
    pub revision: String,
    pub strategy: MergeStrategy,
    pub fast_forward: FastForwardMode,
    pub squash: bool,
    /// Record the merge commit; `false` leaves the result staged
    pub commit: bool,
    pub message: Option<String>,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            revision: String::new(),
            strategy: MergeStrategy::Default,
            fast_forward: FastForwardMode::Ff,
            squash: false,
            commit: true,
            message: None,
        }
    }
}

/// Merge a revision into the current branch
pub struct MergeCommand<'a> {
    backend: &'a dyn GitBackend,
    options: MergeOptions,
}

impl<'a> MergeCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: MergeOptions::default(),
        }
    }

    #[must_use]
    pub fn revision(mut self, revision: impl Into<String>) -> Self {
        self.options.revision = revision.into();
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: MergeStrategy) -> Self {
        self.options.strategy = strategy;
        self
    }

    #[must_use]
    pub fn fast_forward_mode(mut self, mode: FastForwardMode) -> Self {
        self.options.fast_forward = mode;
        self
    }

    #[must_use]
    pub fn squash(mut self, squash: bool) -> Self {
        self.options.squash = squash;
        self
    }

    #[must_use]
    pub fn commit(mut self, commit: bool) -> Self {
        self.options.commit = commit;
        self
    }

    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.options.message = Some(message.into());
        self
    }

    pub fn execute(self) -> GitResult<()> {
        self.backend.merge(&self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_args() {
        assert!(MergeStrategy::Default.args().is_empty());
        assert_eq!(MergeStrategy::Ours.args(), &["-s", "ours"]);
        assert_eq!(
            MergeStrategy::RecursiveTheirs.args(),
            &["-s", "recursive", "-X", "theirs"]
        );
    }

    #[test]
    fn test_defaults() {
        let options = MergeOptions::default();
        assert!(options.commit);
        assert_eq!(options.fast_forward.arg(), "--ff");
    }
}
