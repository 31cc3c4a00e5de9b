use crate::backend::GitBackend;
use crate::error::GitResult;

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub bare: bool,
}

/// Create a repository in the client's working directory
pub struct InitCommand<'a> {
    backend: &'a dyn GitBackend,
    options: InitOptions,
}

impl<'a> InitCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: InitOptions::default(),
        }
    }

    #[must_use]
    pub fn bare(mut self, bare: bool) -> Self {
        self.options.bare = bare;
        self
    }

    pub fn execute(self) -> GitResult<()> {
        self.backend.init(&self.options)
    }
}
