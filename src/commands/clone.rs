use std::path::PathBuf;

use crate::backend::GitBackend;
use crate::error::GitResult;

#[derive(Debug, Clone)]
pub struct CloneOptions {
    pub url: String,
    pub remote_name: String,
    pub shallow: bool,
    /// Only used when `shallow` is set; defaults to 1
    pub depth: Option<u32>,
    /// Local repository whose objects are borrowed through alternates
    pub reference: Option<PathBuf>,
    /// Borrow objects from a local source repository instead of copying
    pub shared: bool,
    pub refspecs: Vec<String>,
    pub tags: bool,
    pub timeout_minutes: Option<u64>,
}

impl CloneOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            remote_name: "origin".to_string(),
            shallow: false,
            depth: None,
            reference: None,
            shared: false,
            refspecs: Vec::new(),
            tags: true,
            timeout_minutes: None,
        }
    }

    pub fn depth(&self) -> Option<u32> {
        super::shallow_depth(self.shallow, self.depth)
    }
}

/// Clone a remote into the client's working directory
///
/// Implemented as init, fetch and remote configuration; nothing is checked
/// out.
pub struct CloneCommand<'a> {
    backend: &'a dyn GitBackend,
    options: CloneOptions,
}

impl<'a> CloneCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: CloneOptions::new(""),
        }
    }

    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.options.url = url.into();
        self
    }

    #[must_use]
    pub fn repository_name(mut self, name: impl Into<String>) -> Self {
        self.options.remote_name = name.into();
        self
    }

    #[must_use]
    pub fn shallow(mut self, shallow: bool) -> Self {
        self.options.shallow = shallow;
        self
    }

    #[must_use]
    pub fn depth(mut self, depth: u32) -> Self {
        self.options.depth = Some(depth);
        self
    }

    #[must_use]
    pub fn reference(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.reference = Some(path.into());
        self
    }

    #[must_use]
    pub fn shared(mut self, shared: bool) -> Self {
        self.options.shared = shared;
        self
    }

    #[must_use]
    pub fn refspecs<I, S>(mut self, refspecs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.refspecs = refspecs.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn tags(mut self, tags: bool) -> Self {
        self.options.tags = tags;
        self
    }

    #[must_use]
    pub fn timeout(mut self, minutes: u64) -> Self {
        self.options.timeout_minutes = Some(minutes);
        self
    }

    pub fn execute(self) -> GitResult<()> {
        self.backend.clone_repo(&self.options)
    }
}
