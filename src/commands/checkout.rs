use crate::backend::GitBackend;
use crate::error::GitResult;

#[derive(Debug, Clone, Default)]
pub struct CheckoutOptions {
    /// Revision to check out
    pub reference: String,
    /// Create or reset this branch at `reference`
    pub branch: Option<String>,
    pub delete_branch_if_exists: bool,
    /// Non-empty enables sparse checkout limited to these patterns; empty
    /// turns a previous sparse checkout back off
    pub sparse_paths: Vec<String>,
    pub timeout_minutes: Option<u64>,
}

pub struct CheckoutCommand<'a> {
    backend: &'a dyn GitBackend,
    options: CheckoutOptions,
}

impl<'a> CheckoutCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: CheckoutOptions::default(),
        }
    }

    #[must_use]
    pub fn reference(mut self, reference: impl Into<String>) -> Self {
        self.options.reference = reference.into();
        self
    }

    #[must_use]
    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.options.branch = Some(branch.into());
        self
    }

    #[must_use]
    pub fn delete_branch_if_exists(mut self, delete: bool) -> Self {
        self.options.delete_branch_if_exists = delete;
        self
    }

    #[must_use]
    pub fn sparse_checkout_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.sparse_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn timeout(mut self, minutes: u64) -> Self {
        self.options.timeout_minutes = Some(minutes);
        self
    }

    pub fn execute(self) -> GitResult<()> {
        self.backend.checkout(&self.options)
    }
}
