use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::backend::GitBackend;
use crate::error::GitResult;

#[derive(Debug, Clone, Default)]
pub struct SubmoduleUpdateOptions {
    pub recursive: bool,
    /// Track each submodule's remote branch instead of the recorded commit
    pub remote_tracking: bool,
    pub shallow: bool,
    pub depth: Option<u32>,
    /// Parallel jobs; `None` or 1 runs serially
    pub threads: Option<u32>,
    /// Submodule name to branch, written to `.gitmodules`
    pub branches: BTreeMap<String, String>,
    pub reference: Option<PathBuf>,
    /// Authenticate submodule remotes with the parent repository's credential
    pub parent_credentials: bool,
    pub timeout_minutes: Option<u64>,
}

impl SubmoduleUpdateOptions {
    pub fn depth(&self) -> Option<u32> {
        super::shallow_depth(self.shallow, self.depth)
    }
}

pub struct SubmoduleUpdateCommand<'a> {
    backend: &'a dyn GitBackend,
    options: SubmoduleUpdateOptions,
}

impl<'a> SubmoduleUpdateCommand<'a> {
    pub fn new(backend: &'a dyn GitBackend) -> Self {
        Self {
            backend,
            options: SubmoduleUpdateOptions::default(),
        }
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.options.recursive = recursive;
        self
    }

    #[must_use]
    pub fn remote_tracking(mut self, remote_tracking: bool) -> Self {
        self.options.remote_tracking = remote_tracking;
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
    pub fn threads(mut self, threads: u32) -> Self {
        self.options.threads = Some(threads);
        self
    }

    #[must_use]
    pub fn use_branch(mut self, submodule: impl Into<String>, branch: impl Into<String>) -> Self {
        self.options.branches.insert(submodule.into(), branch.into());
        self
    }

    #[must_use]
    pub fn reference(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.reference = Some(path.into());
        self
    }

    #[must_use]
    pub fn parent_credentials(mut self, parent_credentials: bool) -> Self {
        self.options.parent_credentials = parent_credentials;
        self
    }

    #[must_use]
    pub fn timeout(mut self, minutes: u64) -> Self {
        self.options.timeout_minutes = Some(minutes);
        self
    }

    pub fn execute(self) -> GitResult<()> {
        self.backend.submodule_update(&self.options)
    }
}
