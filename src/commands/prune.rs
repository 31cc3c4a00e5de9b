use crate::backend::GitBackend;
use crate::error::GitResult;

#[derive(Debug, Clone)]
pub struct PruneOptions {
    pub remote: String,
    pub timeout_minutes: Option<u64>,
}

/// Remove remote-tracking branches whose upstream is gone
pub struct PruneCommand<'a> {
    backend: &'a dyn GitBackend,
    options: PruneOptions,
}

impl<'a> PruneCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: PruneOptions {
                remote: "origin".to_string(),
                timeout_minutes: None,
            },
        }
    }

    #[must_use]
    pub fn remote(mut self, remote: impl Into<String>) -> Self {
        self.options.remote = remote.into();
        self
    }

    #[must_use]
    pub fn timeout(mut self, minutes: u64) -> Self {
        self.options.timeout_minutes = Some(minutes);
        self
    }

    pub fn execute(self) -> GitResult<()> {
        self.backend.prune(&self.options)
    }
}
