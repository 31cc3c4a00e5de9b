use crate::backend::GitBackend;
use crate::error::GitResult;

#[derive(Debug, Clone, Default)]
pub struct PushOptions {
    /// Remote URL or remote name
    pub to: String,
    /// Refspec such as `HEAD:refs/heads/main` or `refs/tags/v1`
    pub refspec: String,
    pub tags: bool,
    pub force: bool,
    pub timeout_minutes: Option<u64>,
}

pub struct PushCommand<'a> {
    backend: &'a dyn GitBackend,
    options: PushOptions,
}

impl<'a> PushCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: PushOptions::default(),
        }
    }

    #[must_use]
    pub fn to(mut self, url: impl Into<String>) -> Self {
        self.options.to = url.into();
        self
    }

    #[must_use]
    pub fn reference(mut self, refspec: impl Into<String>) -> Self {
        self.options.refspec = refspec.into();
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: bool) -> Self {
        self.options.tags = tags;
        self
    }

    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.options.force = force;
        self
    }

    #[must_use]
    pub fn timeout(mut self, minutes: u64) -> Self {
        self.options.timeout_minutes = Some(minutes);
        self
    }

    pub fn execute(self) -> GitResult<()> {
        self.backend.push(&self.options)
    }
}
