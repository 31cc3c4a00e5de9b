use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::audit::AuditLogger;
use crate::backend::{create_backend, BackendContext, Capability, GitBackend};
use crate::commands::{
    ChangelogCommand, CheckoutCommand, CloneCommand, FetchCommand, InitCommand,
    MaintenanceCommand, MergeCommand, PruneCommand, PushCommand, RevListCommand,
    SubmoduleUpdateCommand,
};
use crate::config::settings::minutes_to_duration;
use crate::config::{BackendKind, ClientConfig, ProxyConfig};
use crate::credentials::CredentialProvider;
use crate::error::{GitError, GitResult};
use crate::git::{Branch, GitExecutor, GitVersion, ObjectId};

/// Entry point: one working directory, one configured backend
///
/// Operations with options are returned as command objects to be configured
/// and executed; simple queries run immediately.
pub struct GitClient {
    ctx: BackendContext,
    backend: Box<dyn GitBackend>,
}

impl GitClient {
    /// Create a client for `workdir`
    ///
    /// The configuration is validated first. A proxy is taken from the
    /// `GITWARD_PROXY_*` environment when the configuration has none.
    pub fn new(workdir: impl Into<PathBuf>, mut config: ClientConfig) -> GitResult<Self> {
        config.validate()?;
        if config.proxy.is_none() {
            config.proxy = ProxyConfig::from_env();
        }

        let audit = match (config.audit.enabled, &config.audit.path) {
            (true, Some(path)) => Some(Arc::new(AuditLogger::with_path(path)?)),
            _ => None,
        };

        if !config.check_remote_url {
            warn!("remote URL checking is disabled; option-like arguments will reach git");
        }

        let mut ctx = BackendContext::new(workdir, config);
        ctx.audit = audit;
        debug!(workdir = %ctx.workdir.display(), backend = ?ctx.config.backend, "created git client");

        let backend = create_backend(ctx.clone());
        Ok(Self { ctx, backend })
    }

    /// Credentials for remote operations; replaces any previous provider
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.ctx.credentials = Some(provider);
        self.backend = create_backend(self.ctx.clone());
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.ctx.workdir
    }

    pub fn config(&self) -> &ClientConfig {
        &self.ctx.config
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.backend.supports(capability)
    }

    pub fn backend(&self) -> &dyn GitBackend {
        self.backend.as_ref()
    }

    pub fn init(&self) -> InitCommand<'_> {
        InitCommand::new(self.backend.as_ref())
    }

    pub fn clone_repo(&self) -> CloneCommand<'_> {
        CloneCommand::new(self.backend.as_ref())
    }

    pub fn fetch(&self) -> FetchCommand<'_> {
        FetchCommand::new(self.backend.as_ref())
    }

    pub fn checkout(&self) -> CheckoutCommand<'_> {
        CheckoutCommand::new(self.backend.as_ref())
    }

    pub fn merge(&self) -> MergeCommand<'_> {
        MergeCommand::new(self.backend.as_ref())
    }

    pub fn push(&self) -> PushCommand<'_> {
        PushCommand::new(self.backend.as_ref())
    }

    pub fn submodule_update(&self) -> SubmoduleUpdateCommand<'_> {
        SubmoduleUpdateCommand::new(self.backend.as_ref())
    }

    pub fn rev_list(&self) -> RevListCommand<'_> {
        RevListCommand::new(self.backend.as_ref())
    }

    pub fn changelog(&self) -> ChangelogCommand<'_> {
        ChangelogCommand::new(self.backend.as_ref())
    }

    pub fn maintenance(&self) -> MaintenanceCommand<'_> {
        MaintenanceCommand::new(self.backend.as_ref())
    }

    pub fn prune(&self) -> PruneCommand<'_> {
        PruneCommand::new(self.backend.as_ref())
    }

    /// Id of `branch` on the remote at `url`, `None` if it has no such branch
    pub fn get_head_rev(&self, url: &str, branch: &str) -> GitResult<Option<ObjectId>> {
        self.backend.head_rev(url, branch)
    }

    pub fn get_remote_references(
        &self,
        url: &str,
        pattern: Option<&str>,
        heads: bool,
        tags: bool,
    ) -> GitResult<BTreeMap<String, ObjectId>> {
        self.backend.remote_references(url, pattern, heads, tags)
    }

    pub fn rev_parse(&self, revision: &str) -> GitResult<ObjectId> {
        self.backend.rev_parse(revision)
    }

    pub fn tag_exists(&self, name: &str) -> GitResult<bool> {
        self.backend.tag_exists(name)
    }

    pub fn create_tag(&self, name: &str, message: Option<&str>) -> GitResult<()> {
        self.backend.create_tag(name, message)
    }

    pub fn create_branch(&self, name: &str, start_point: Option<&str>) -> GitResult<()> {
        self.backend.create_branch(name, start_point)
    }

    pub fn delete_branch(&self, name: &str) -> GitResult<()> {
        self.backend.delete_branch(name)
    }

    pub fn delete_tag(&self, name: &str) -> GitResult<()> {
        self.backend.delete_tag(name)
    }

    pub fn delete_ref(&self, refname: &str) -> GitResult<()> {
        self.backend.delete_ref(refname)
    }

    pub fn ref_exists(&self, refname: &str) -> GitResult<bool> {
        self.backend.ref_exists(refname)
    }

    pub fn branches(&self, pattern: Option<&str>) -> GitResult<Vec<Branch>> {
        self.backend.branches(pattern)
    }

    pub fn submodule_init(&self) -> GitResult<()> {
        self.backend.submodule_init()
    }

    pub fn set_remote_url(&self, remote: &str, url: &str) -> GitResult<()> {
        self.backend.set_remote_url(remote, url)
    }

    pub fn remote_url(&self, remote: &str) -> GitResult<Option<String>> {
        self.backend.remote_url(remote)
    }

    /// Version of the configured git executable; CLI backend only
    pub fn git_version(&self) -> GitResult<GitVersion> {
        if self.backend.kind() != BackendKind::Cli {
            return Err(GitError::Unsupported {
                backend: "library",
                operation: "git version".to_string(),
            });
        }

        let executor = GitExecutor::new(&self.ctx.workdir)
            .with_git_executable(self.ctx.config.git_executable.clone())
            .with_audit(self.ctx.audit.clone())
            .with_env(self.ctx.config.environment.clone())
            .with_default_timeout(minutes_to_duration(1));
        GitVersion::detect(&executor)
    }
}

impl std::fmt::Debug for GitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitClient")
            .field("ctx", &self.ctx)
            .field("backend", &self.backend.kind())
            .finish()
    }
}
