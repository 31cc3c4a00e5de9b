use crate::backend::GitBackend;
use crate::error::GitResult;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub url: String,
    /// Empty means `+refs/heads/*:refs/remotes/origin/*`
    pub refspecs: Vec<String>,
    pub prune: bool,
    pub shallow: bool,
    pub depth: Option<u32>,
    pub tags: bool,
    pub timeout_minutes: Option<u64>,
}

impl FetchOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            refspecs: Vec::new(),
            prune: false,
            shallow: false,
            depth: None,
            tags: true,
            timeout_minutes: None,
        }
    }

    pub fn depth(&self) -> Option<u32> {
        super::shallow_depth(self.shallow, self.depth)
    }
}

pub struct FetchCommand<'a> {
    backend: &'a dyn GitBackend,
    options: FetchOptions,
}

impl<'a> FetchCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: FetchOptions::new(""),
        }
    }

    #[must_use]
    pub fn from(mut self, url: impl Into<String>) -> Self {
        self.options.url = url.into();
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
    pub fn prune(mut self, prune: bool) -> Self {
        self.options.prune = prune;
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
        self.backend.fetch(&self.options)
    }
}
