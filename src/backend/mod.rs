//! The two interchangeable implementations behind [`crate::GitClient`].
//!
//! [`GitBackend`] is the capability contract. Where the implementations
//! genuinely differ the difference is named by a [`Capability`] and can be
//! queried before an operation is attempted.

pub mod cli;
pub mod library;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::audit::AuditLogger;
use crate::commands::{
    AbortHandle, ChangelogOptions, CheckoutOptions, CloneOptions, FetchOptions, InitOptions,
    MaintenanceOutcome, MaintenanceTask, MergeOptions, PruneOptions, PushOptions, RevListOptions,
    SubmoduleUpdateOptions,
};
use crate::config::{BackendKind, ClientConfig};
use crate::credentials::{host_of, Credential, CredentialProvider};
use crate::error::GitResult;
use crate::git::{Branch, ObjectId};
use crate::security::UrlValidator;

pub use cli::CliBackend;
pub use library::LibraryBackend;

/// Behaviours that differ between backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// `git maintenance` tasks
    Maintenance,
    /// Pushing an existing tag with a different target fails instead of
    /// overwriting it
    RejectsTagOverwrite,
    /// Submodules whose name differs from their path
    RenamedSubmodules,
    /// `submodule update --remote`
    SubmoduleRemoteTracking,
    /// Shallow submodule clones
    ShallowSubmodules,
    SparseCheckout,
    /// Updating a submodule that is not checked out is an error
    ErrorOnMissingSubmodule,
}

/// Capability contract shared by the subprocess and library backends
///
/// Every URL, ref, branch and tag argument passes through the validator
/// before anything is launched or opened.
pub trait GitBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn supports(&self, capability: Capability) -> bool;

    fn workdir(&self) -> &Path;

    fn init(&self, options: &InitOptions) -> GitResult<()>;

    fn clone_repo(&self, options: &CloneOptions) -> GitResult<()>;

    fn fetch(&self, options: &FetchOptions) -> GitResult<()>;

    fn checkout(&self, options: &CheckoutOptions) -> GitResult<()>;

    fn merge(&self, options: &MergeOptions) -> GitResult<()>;

    fn push(&self, options: &PushOptions) -> GitResult<()>;

    fn submodule_init(&self) -> GitResult<()>;

    fn submodule_update(&self, options: &SubmoduleUpdateOptions) -> GitResult<()>;

    fn rev_list(&self, options: &RevListOptions) -> GitResult<Vec<ObjectId>>;

    /// Render the changelog into `out`; callers decide whether it reaches
    /// the final sink
    fn changelog(
        &self,
        options: &ChangelogOptions,
        out: &mut Vec<u8>,
        abort: &AbortHandle,
    ) -> GitResult<()>;

    fn maintenance(&self, task: MaintenanceTask) -> GitResult<MaintenanceOutcome>;

    fn prune(&self, options: &PruneOptions) -> GitResult<()>;

    fn rev_parse(&self, revision: &str) -> GitResult<ObjectId>;

    /// Id of `branch` on the remote, `None` when the remote has no such branch
    fn head_rev(&self, url: &str, branch: &str) -> GitResult<Option<ObjectId>>;

    fn remote_references(
        &self,
        url: &str,
        pattern: Option<&str>,
        heads: bool,
        tags: bool,
    ) -> GitResult<BTreeMap<String, ObjectId>>;

    fn tag_exists(&self, name: &str) -> GitResult<bool>;

    /// Lightweight tag at HEAD, annotated when a message is given
    fn create_tag(&self, name: &str, message: Option<&str>) -> GitResult<()>;

    fn create_branch(&self, name: &str, start_point: Option<&str>) -> GitResult<()>;

    /// Deleting a branch that does not exist succeeds
    fn delete_branch(&self, name: &str) -> GitResult<()>;

    /// Deleting a tag that does not exist succeeds
    fn delete_tag(&self, name: &str) -> GitResult<()>;

    /// Deleting a ref that does not exist succeeds
    fn delete_ref(&self, refname: &str) -> GitResult<()>;

    fn ref_exists(&self, refname: &str) -> GitResult<bool>;

    /// Local and remote-tracking branches, filtered by a glob on the name
    fn branches(&self, pattern: Option<&str>) -> GitResult<Vec<Branch>>;

    fn set_remote_url(&self, remote: &str, url: &str) -> GitResult<()>;

    fn remote_url(&self, remote: &str) -> GitResult<Option<String>>;
}

/// State both backends share: where they work and what they check
#[derive(Clone)]
pub struct BackendContext {
    pub workdir: PathBuf,
    pub config: ClientConfig,
    pub validator: UrlValidator,
    pub credentials: Option<Arc<dyn CredentialProvider>>,
    pub audit: Option<Arc<AuditLogger>>,
}

impl BackendContext {
    pub fn new(workdir: impl Into<PathBuf>, config: ClientConfig) -> Self {
        let validator = UrlValidator::new(config.check_remote_url);
        Self {
            workdir: workdir.into(),
            config,
            validator,
            credentials: None,
            audit: None,
        }
    }

    /// Validate a URL or ref argument, recording rejections
    pub fn check(&self, value: &str) -> GitResult<String> {
        self.validator.check(value).inspect_err(|err| {
            warn!(error = %err, workdir = %self.workdir.display(), "rejected argument");
            if let (Some(audit), crate::error::GitError::Validation { value, reason }) =
                (&self.audit, err)
            {
                if let Err(e) = audit.log_validation_failure(value, reason, &self.workdir) {
                    warn!(error = %e, "failed to write audit log");
                }
            }
        })
    }

    pub fn check_all(&self, values: &[String]) -> GitResult<Vec<String>> {
        values.iter().map(|v| self.check(v)).collect()
    }

    /// Timeout actually enforced for a request, in minutes
    pub fn timeout_minutes(&self, requested: Option<u64>) -> u64 {
        self.config.effective_timeout(requested)
    }

    pub fn credential_for(&self, url: &str) -> Option<Credential> {
        self.credentials.as_ref().and_then(|p| p.lookup(url))
    }
}

impl fmt::Debug for BackendContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendContext")
            .field("workdir", &self.workdir)
            .field("config", &self.config)
            .field("validator", &self.validator)
            .field("credentials", &self.credentials.is_some())
            .field("audit", &self.audit)
            .finish()
    }
}

/// Build the backend selected by `ctx.config.backend`
pub fn create_backend(ctx: BackendContext) -> Box<dyn GitBackend> {
    match ctx.config.backend {
        BackendKind::Cli => Box::new(CliBackend::new(ctx)),
        BackendKind::Library => Box::new(LibraryBackend::new(ctx)),
    }
}

/// Default fetch refspec for a remote
pub(crate) fn default_refspec(remote: &str) -> String {
    format!("+refs/heads/*:refs/remotes/{}/*", remote)
}

/// Directory behind a local repository URL
pub(crate) fn local_path(url: &str) -> Option<PathBuf> {
    let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
    path.is_dir().then_some(path)
}

/// Borrow objects from `source` by listing its object store in
/// `objects/info/alternates`; a source without one is ignored
pub(crate) fn write_alternates(git_dir: &Path, source: &Path) -> GitResult<()> {
    let objects = [source.join(".git").join("objects"), source.join("objects")]
        .into_iter()
        .find(|p| p.is_dir());

    let Some(objects) = objects else {
        warn!(reference = %source.display(), "reference repository has no object store, ignoring");
        return Ok(());
    };

    let info = git_dir.join("objects").join("info");
    fs::create_dir_all(&info)?;
    let objects = objects.canonicalize()?;
    fs::write(info.join("alternates"), format!("{}\n", objects.display()))?;

    debug!(alternates = %objects.display(), "using reference repository");
    Ok(())
}

/// Proxy URL to use for `url`, with credentials filled in; `None` when no
/// proxy is configured or the host bypasses it
pub(crate) fn proxy_for(config: &ClientConfig, url: &str) -> Option<String> {
    let proxy = config.proxy.as_ref()?;
    let host = host_of(url)?;
    if proxy.bypasses(&host) {
        debug!(%host, "proxy bypassed");
        return None;
    }

    let proxy_url = proxy.url();
    if let (Some(user), Ok(mut parsed)) = (&proxy.user, Url::parse(&proxy_url)) {
        let password = proxy.password();
        if parsed.set_username(user).is_ok() && parsed.set_password(password.as_deref()).is_ok() {
            return Some(parsed.to_string());
        }
    }
    Some(proxy_url)
}

/// Full ref name for a branch argument that may already be qualified
pub(crate) fn qualify_branch(branch: &str) -> String {
    if branch.starts_with("refs/") {
        branch.to_string()
    } else {
        format!("refs/heads/{}", branch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialStore;
    use crate::error::ErrorCategory;
    use tempfile::TempDir;

    #[test]
    fn test_check_records_rejection() {
        let temp = TempDir::new().unwrap();
        let audit = Arc::new(AuditLogger::with_path(temp.path().join("audit.log")).unwrap());
        let mut ctx = BackendContext::new(temp.path(), ClientConfig::default());
        ctx.audit = Some(audit.clone());

        let err = ctx.check("--upload-pack=evil").unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Validation);

        let log = std::fs::read_to_string(audit.log_path()).unwrap();
        assert!(log.contains("VALIDATION-REJECTED"));
        assert!(log.contains("--upload-pack=evil"));
    }

    #[test]
    fn test_check_disabled() {
        let mut config = ClientConfig::default();
        config.check_remote_url = false;
        let ctx = BackendContext::new("/tmp/ws", config);
        assert_eq!(ctx.check(" -q ").unwrap(), "-q");
    }

    #[test]
    fn test_credential_lookup() {
        let mut ctx = BackendContext::new("/tmp/ws", ClientConfig::default());
        assert!(ctx.credential_for("https://example.com/r.git").is_none());

        let store = CredentialStore::new().with_default(Credential::password("u", "p"));
        ctx.credentials = Some(Arc::new(store));
        assert_eq!(
            ctx.credential_for("https://example.com/r.git").unwrap().username(),
            "u"
        );
    }

    #[test]
    fn test_create_backend_kind() {
        let mut config = ClientConfig::default();
        assert_eq!(
            create_backend(BackendContext::new("/tmp/ws", config.clone())).kind(),
            BackendKind::Cli
        );
        config.backend = BackendKind::Library;
        assert_eq!(
            create_backend(BackendContext::new("/tmp/ws", config)).kind(),
            BackendKind::Library
        );
    }

    #[test]
    fn test_write_alternates() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        std::fs::create_dir_all(source.join(".git").join("objects")).unwrap();
        let git_dir = temp.path().join("target").join(".git");

        write_alternates(&git_dir, &source).unwrap();
        let alternates =
            std::fs::read_to_string(git_dir.join("objects").join("info").join("alternates"))
                .unwrap();
        assert!(alternates.trim_end().ends_with("objects"));

        let missing = temp.path().join("missing");
        write_alternates(&git_dir, &missing).unwrap();
    }

    #[test]
    fn test_proxy_for() {
        let mut config = ClientConfig::default();
        assert!(proxy_for(&config, "https://example.com/r.git").is_none());

        config.proxy = Some(crate::config::ProxyConfig {
            host: "proxy.corp".to_string(),
            port: 8080,
            user: Some("svc".to_string()),
            password_env: None,
            no_proxy: vec!["internal.corp".to_string()],
        });
        assert_eq!(
            proxy_for(&config, "https://example.com/r.git").as_deref(),
            Some("http://svc@proxy.corp:8080/")
        );
        assert!(proxy_for(&config, "git@git.internal.corp:a/b.git").is_none());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(default_refspec("origin"), "+refs/heads/*:refs/remotes/origin/*");
        assert_eq!(qualify_branch("main"), "refs/heads/main");
        assert_eq!(qualify_branch("refs/tags/v1"), "refs/tags/v1");
    }
}
