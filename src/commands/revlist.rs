use crate::backend::GitBackend;
use crate::error::GitResult;
use crate::git::ObjectId;

#[derive(Debug, Clone, Default)]
pub struct RevListOptions {
    /// `None` walks every ref
    pub revision: Option<String>,
    pub first_parent: bool,
    pub max_count: Option<usize>,
}

pub struct RevListCommand<'a> {
    backend: &'a dyn GitBackend,
    options: RevListOptions,
}

impl<'a> RevListCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: RevListOptions::default(),
        }
    }

    #[must_use]
    pub fn reference(mut self, revision: impl Into<String>) -> Self {
        self.options.revision = Some(revision.into());
        self
    }

    #[must_use]
    pub fn all(mut self) -> Self {
        self.options.revision = None;
        self
    }

    #[must_use]
    pub fn first_parent(mut self, first_parent: bool) -> Self {
        self.options.first_parent = first_parent;
        self
    }

    #[must_use]
    pub fn max_count(mut self, max: usize) -> Self {
        self.options.max_count = Some(max);
        self
    }

    pub fn execute(self) -> GitResult<Vec<ObjectId>> {
        self.backend.rev_list(&self.options)
    }
}
