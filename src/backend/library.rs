//! Backend built on libgit2 through the `git2` crate.
//!
//! No process is launched, so timeouts are enforced through the transfer
//! callbacks: once the deadline passes every progress callback asks libgit2
//! to stop and the resulting error is reported as [`GitError::Timeout`].
//! Purely local work (checkout, merge) is not interruptible.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{DateTime, FixedOffset, Offset, Utc};
use git2::build::CheckoutBuilder;
use git2::{
    AutotagOption, BranchType, CertificateCheckStatus, Commit, Cred, CredentialType, Delta,
    DiffFindOptions, Direction, FetchPrune, FileMode, ObjectType, ProxyOptions, Reference,
    RemoteCallbacks, Repository, Signature, Sort,
};
use tempfile::TempPath;
use tracing::{debug, info, warn};

use super::{
    default_refspec, local_path, proxy_for, qualify_branch, write_alternates, BackendContext,
    Capability, GitBackend,
};
use crate::audit::InvocationStatus;
use crate::commands::{
    AbortHandle, ChangelogOptions, CheckoutOptions, CloneOptions, FastForwardMode, FetchOptions,
    InitOptions, MaintenanceOutcome, MaintenanceTask, MergeOptions, MergeStrategy, PruneOptions,
    PushOptions, RevListOptions, SubmoduleUpdateOptions,
};
use crate::config::settings::minutes_to_duration;
use crate::config::{BackendKind, HostKeyVerification};
use crate::credentials::{redact, Credential, SshKeySource};
use crate::error::{GitError, GitResult};
use crate::git::{glob_match, Branch, ObjectId};
use crate::security::{script_dir_for, write_key_file};

const BACKEND_NAME: &str = "library";

/// libgit2 keeps asking while credentials are rejected
const MAX_CREDENTIAL_ATTEMPTS: u32 = 3;

trait During<T> {
    fn during(self, context: &str) -> GitResult<T>;
}

impl<T> During<T> for Result<T, git2::Error> {
    fn during(self, context: &str) -> GitResult<T> {
        self.map_err(|e| GitError::library(context, e))
    }
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
            timeout,
        }
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}

fn unsupported(operation: impl Into<String>) -> GitError {
    GitError::Unsupported {
        backend: BACKEND_NAME,
        operation: operation.into(),
    }
}

#[derive(Debug)]
pub struct LibraryBackend {
    ctx: BackendContext,
}

impl LibraryBackend {
    pub fn new(ctx: BackendContext) -> Self {
        Self { ctx }
    }

    fn open(&self) -> GitResult<Repository> {
        Repository::open(&self.ctx.workdir).map_err(|e| match e.code() {
            git2::ErrorCode::NotFound => GitError::NotARepository(self.ctx.workdir.clone()),
            _ => GitError::library("open repository", e),
        })
    }

    /// Run a remote or long-running operation under a deadline and record it
    /// in the audit trail the way the CLI backend records a process
    fn audited<T>(
        &self,
        command: &str,
        timeout_minutes: Option<u64>,
        operation: impl FnOnce(Deadline) -> GitResult<T>,
    ) -> GitResult<T> {
        let minutes = self.ctx.timeout_minutes(timeout_minutes);
        let deadline = Deadline::after(minutes_to_duration(minutes));
        let label = format!("{}min", minutes);

        let result = operation(deadline);
        let status = match &result {
            Ok(_) => InvocationStatus::Exited(0),
            Err(GitError::Timeout { .. }) => InvocationStatus::TimedOut,
            Err(_) => InvocationStatus::Exited(1),
        };

        info!(
            command = %command,
            working_dir = %self.ctx.workdir.display(),
            timeout = %label,
            exit = %status,
            "libgit2 operation"
        );
        if let Some(audit) = &self.ctx.audit {
            if let Err(e) = audit.log_invocation(command, &self.ctx.workdir, &label, status) {
                warn!(error = %e, path = %audit.log_path().display(), "failed to write audit log");
            }
        }

        result
    }

    /// Map a failed transfer to a timeout when the deadline is what stopped it
    fn transfer_error(&self, command: &str, deadline: Deadline, e: git2::Error) -> GitError {
        if deadline.expired() {
            GitError::Timeout {
                command: command.to_string(),
                timeout: deadline.timeout,
            }
        } else {
            GitError::library(command, e)
        }
    }

    fn callbacks(&self, url: &str, deadline: Deadline) -> GitResult<RemoteCallbacks<'static>> {
        let mut callbacks = RemoteCallbacks::new();
        callbacks.transfer_progress(move |_| !deadline.expired());
        callbacks.sideband_progress(move |_| !deadline.expired());

        let verification = self.ctx.config.ssh.host_key_verification;
        callbacks.certificate_check(move |cert, host| {
            if cert.as_hostkey().is_some() && verification == HostKeyVerification::NoVerification {
                debug!(%host, "skipping host key verification");
                return Ok(CertificateCheckStatus::CertificateOk);
            }
            Ok(CertificateCheckStatus::CertificatePassthrough)
        });

        let credential = self.ctx.credential_for(url);
        let key_file: Option<TempPath> = match &credential {
            Some(Credential::SshKey {
                key: SshKeySource::Material(material),
                ..
            }) => {
                let dir = script_dir_for(&self.ctx.workdir)?;
                Some(write_key_file(&dir, material.expose())?)
            }
            _ => None,
        };

        let mut attempts = 0u32;
        callbacks.credentials(move |_url, username_from_url, allowed| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("credentials rejected by remote"));
            }

            match &credential {
                Some(Credential::UsernamePassword { username, password })
                    if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) =>
                {
                    Cred::userpass_plaintext(username, password.expose())
                }
                Some(Credential::SshKey {
                    username,
                    key,
                    passphrase,
                }) if allowed.contains(CredentialType::SSH_KEY) => {
                    let path = match key {
                        SshKeySource::File(path) => Some(path.as_path()),
                        SshKeySource::Material(_) => key_file.as_deref(),
                    };
                    let path = path.ok_or_else(|| git2::Error::from_str("ssh key unavailable"))?;
                    Cred::ssh_key(username, None, path, passphrase.as_ref().map(|p| p.expose()))
                }
                Some(credential) if allowed.contains(CredentialType::USERNAME) => {
                    Cred::username(credential.username())
                }
                None if allowed.contains(CredentialType::SSH_KEY) => {
                    Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
                }
                None if allowed.contains(CredentialType::USERNAME) => {
                    Cred::username(username_from_url.unwrap_or("git"))
                }
                _ => Cred::default(),
            }
        });

        Ok(callbacks)
    }

    fn proxy_options(&self, url: &str) -> ProxyOptions<'static> {
        let mut options = ProxyOptions::new();
        if let Some(proxy) = proxy_for(&self.ctx.config, url) {
            options.url(&proxy);
        }
        options
    }

    fn fetch_options(
        &self,
        url: &str,
        deadline: Deadline,
        prune: bool,
        depth: Option<u32>,
        tags: bool,
    ) -> GitResult<git2::FetchOptions<'static>> {
        let mut options = git2::FetchOptions::new();
        options.remote_callbacks(self.callbacks(url, deadline)?);
        options.proxy_options(self.proxy_options(url));
        options.prune(if prune {
            FetchPrune::On
        } else {
            FetchPrune::Unspecified
        });
        options.download_tags(if tags {
            AutotagOption::All
        } else {
            AutotagOption::None
        });
        if let Some(depth) = depth {
            options.depth(i32::try_from(depth).unwrap_or(i32::MAX));
        }
        Ok(options)
    }

    /// Ref listing of a remote, the library's `ls-remote`
    fn list_remote(&self, url: &str) -> GitResult<BTreeMap<String, ObjectId>> {
        let command = format!("libgit2 ls-remote {}", redact(url));
        self.audited(&command, None, |deadline| {
            let mut remote = git2::Remote::create_detached(url).during(&command)?;
            let connection = remote
                .connect_auth(
                    Direction::Fetch,
                    Some(self.callbacks(url, deadline)?),
                    Some(self.proxy_options(url)),
                )
                .map_err(|e| self.transfer_error(&command, deadline, e))?;

            Ok(connection
                .list()
                .during("ls-remote")?
                .iter()
                .map(|head| (head.name().to_string(), ObjectId::from_oid(head.oid())))
                .collect())
        })
    }

    fn resolve_commit<'r>(&self, repo: &'r Repository, revision: &str) -> GitResult<Commit<'r>> {
        repo.revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .map_err(|_| GitError::NotFound(format!("revision {}", revision)))
    }

    fn update_submodules(
        &self,
        repo: &Repository,
        recursive: bool,
        parent_url: Option<&str>,
        deadline: Deadline,
    ) -> GitResult<()> {
        for mut submodule in repo.submodules().during("submodule list")? {
            let name = submodule.name().unwrap_or_default().to_string();
            let path = submodule.path().to_path_buf();
            if Path::new(&name) != path {
                return Err(unsupported(format!("renamed submodule {}", name)));
            }

            let url = self.ctx.check(submodule.url().unwrap_or_default())?;
            let mut update = git2::SubmoduleUpdateOptions::new();
            let credential_url = parent_url.unwrap_or(&url);
            update.fetch(self.fetch_options(credential_url, deadline, false, None, true)?);

            debug!(submodule = %name, url = %redact(&url), "updating submodule");
            let command = format!("submodule update {}", name);
            submodule
                .update(true, Some(&mut update))
                .map_err(|e| self.transfer_error(&command, deadline, e))?;

            if recursive {
                let child = submodule.open().during("open submodule")?;
                self.update_submodules(&child, true, parent_url, deadline)?;
            }
        }
        Ok(())
    }

    /// Fully qualified push refspecs; tags are always force-pushed
    fn push_refspecs(
        &self,
        repo: &Repository,
        options: &PushOptions,
        refspec: &str,
    ) -> GitResult<Vec<String>> {
        let mut specs = Vec::new();

        if !refspec.is_empty() {
            let (forced, spec) = match refspec.strip_prefix('+') {
                Some(rest) => (true, rest),
                None => (false, refspec),
            };
            let (src, dst) = spec.split_once(':').unwrap_or((spec, ""));
            let src = full_ref_name(repo, src)?;
            let dst = if dst.is_empty() {
                src.clone()
            } else if dst.starts_with("refs/") {
                dst.to_string()
            } else if src.starts_with("refs/tags/") {
                format!("refs/tags/{}", dst)
            } else {
                qualify_branch(dst)
            };

            let force = forced || options.force || dst.starts_with("refs/tags/");
            specs.push(format!("{}{}:{}", if force { "+" } else { "" }, src, dst));
        }

        if options.tags {
            let names = repo.tag_names(None).during("list tags")?;
            for tag in names.iter().flatten() {
                specs.push(format!("+refs/tags/{0}:refs/tags/{0}", tag));
            }
        }

        if specs.is_empty() {
            let head = full_ref_name(repo, "HEAD")?;
            let force = if options.force { "+" } else { "" };
            specs.push(format!("{}{}:{}", force, head, head));
        }

        Ok(specs)
    }

    fn write_commit_entry(
        &self,
        repo: &Repository,
        commit: &Commit<'_>,
        out: &mut Vec<u8>,
    ) -> GitResult<()> {
        let parents: Vec<String> = commit.parent_ids().map(|id| id.to_string()).collect();
        writeln!(out, "commit {}", commit.id())?;
        writeln!(out, "tree {}", commit.tree_id())?;
        writeln!(out, "parent {}", parents.join(" "))?;
        writeln!(out, "author {}", format_signature(&commit.author()))?;
        writeln!(out, "committer {}", format_signature(&commit.committer()))?;
        writeln!(out)?;
        for line in String::from_utf8_lossy(commit.message_bytes()).lines() {
            writeln!(out, "    {}", line)?;
        }
        writeln!(out)?;

        let tree = commit.tree().during("changelog tree")?;
        let parent_tree = match commit.parents().next() {
            Some(parent) => Some(parent.tree().during("changelog parent tree")?),
            None => None,
        };
        let mut diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .during("changelog diff")?;
        let mut find = DiffFindOptions::new();
        find.renames(true);
        diff.find_similar(Some(&mut find)).during("changelog renames")?;

        for delta in diff.deltas() {
            let old = delta.old_file();
            let new = delta.new_file();
            let status = match delta.status() {
                Delta::Added => "A",
                Delta::Deleted => "D",
                Delta::Renamed => "R",
                Delta::Copied => "C",
                Delta::Typechange => "T",
                _ => "M",
            };
            write!(
                out,
                ":{:06o} {:06o} {} {} {}",
                octal_mode(old.mode()),
                octal_mode(new.mode()),
                old.id(),
                new.id(),
                status
            )?;
            let old_path = old.path().map(|p| p.display().to_string()).unwrap_or_default();
            let new_path = new.path().map(|p| p.display().to_string()).unwrap_or_default();
            match delta.status() {
                Delta::Renamed | Delta::Copied => writeln!(out, "\t{}\t{}", old_path, new_path)?,
                Delta::Deleted => writeln!(out, "\t{}", old_path)?,
                _ => writeln!(out, "\t{}", new_path)?,
            }
        }
        writeln!(out)?;
        Ok(())
    }
}

/// Expand a short ref name (`main`, `HEAD`, `v1.0`) to the ref it resolves to
fn full_ref_name(repo: &Repository, name: &str) -> GitResult<String> {
    if name.starts_with("refs/") {
        return Ok(name.to_string());
    }
    let reference = repo
        .resolve_reference_from_short_name(name)
        .and_then(|r| r.resolve())
        .map_err(|_| GitError::NotFound(format!("ref {}", name)))?;
    reference
        .name()
        .map(str::to_string)
        .ok_or_else(|| GitError::ParseError(format!("ref {} has a non UTF-8 name", name)))
}

fn find_reference<'r>(repo: &'r Repository, name: &str) -> GitResult<Option<Reference<'r>>> {
    match repo.find_reference(name) {
        Ok(reference) => Ok(Some(reference)),
        Err(e) if matches!(e.code(), git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec) => {
            Ok(None)
        }
        Err(e) => Err(GitError::library(format!("lookup {}", name), e)),
    }
}

fn current_branch(repo: &Repository) -> Option<String> {
    let head = repo.head().ok()?;
    if !head.is_branch() {
        return None;
    }
    head.shorthand().map(str::to_string)
}

/// `Name <email> 2024-01-31 12:00:00 +0100`, the layout of `%aN <%aE> %ai`
fn format_signature(signature: &Signature<'_>) -> String {
    let when = signature.when();
    let offset = FixedOffset::east_opt(when.offset_minutes() * 60).unwrap_or_else(|| Utc.fix());
    let date = match DateTime::from_timestamp(when.seconds(), 0) {
        Some(utc) => utc
            .with_timezone(&offset)
            .format("%Y-%m-%d %H:%M:%S %z")
            .to_string(),
        None => when.seconds().to_string(),
    };
    format!(
        "{} <{}> {}",
        signature.name().unwrap_or_default(),
        signature.email().unwrap_or_default(),
        date
    )
}

fn octal_mode(mode: FileMode) -> u32 {
    match mode {
        FileMode::Tree => 0o040000,
        FileMode::Blob => 0o100644,
        FileMode::BlobExecutable => 0o100755,
        FileMode::Link => 0o120000,
        FileMode::Commit => 0o160000,
        _ => 0,
    }
}

impl GitBackend for LibraryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Library
    }

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Maintenance
            | Capability::RejectsTagOverwrite
            | Capability::RenamedSubmodules
            | Capability::SubmoduleRemoteTracking
            | Capability::ShallowSubmodules
            | Capability::SparseCheckout
            | Capability::ErrorOnMissingSubmodule => false,
        }
    }

    fn workdir(&self) -> &Path {
        &self.ctx.workdir
    }

    fn init(&self, options: &InitOptions) -> GitResult<()> {
        fs::create_dir_all(&self.ctx.workdir)?;
        if options.bare {
            Repository::init_bare(&self.ctx.workdir).during("init")?;
        } else {
            Repository::init(&self.ctx.workdir).during("init")?;
        }
        Ok(())
    }

    fn clone_repo(&self, options: &CloneOptions) -> GitResult<()> {
        let url = self.ctx.check(&options.url)?;
        let remote_name = self.ctx.check(&options.remote_name)?;
        let refspecs = if options.refspecs.is_empty() {
            vec![default_refspec(&remote_name)]
        } else {
            self.ctx.check_all(&options.refspecs)?
        };

        info!(url = %redact(&url), workdir = %self.ctx.workdir.display(), "cloning");

        self.init(&InitOptions::default())?;
        let git_dir = self.ctx.workdir.join(".git");
        if let Some(reference) = &options.reference {
            write_alternates(&git_dir, reference)?;
        } else if options.shared {
            match local_path(&url) {
                Some(source) => write_alternates(&git_dir, &source)?,
                None => warn!("shared clone requested for a non-local URL, ignoring"),
            }
        }

        let repo = self.open()?;
        let mut remote = repo
            .remote_with_fetch(&remote_name, &url, &refspecs[0])
            .during("configure remote")?;
        for extra in &refspecs[1..] {
            repo.remote_add_fetch(&remote_name, extra)
                .during("configure remote")?;
        }

        let command = format!("libgit2 clone {}", redact(&url));
        self.audited(&command, options.timeout_minutes, |deadline| {
            let mut fetch = self.fetch_options(&url, deadline, false, options.depth(), options.tags)?;
            remote
                .fetch(&refspecs, Some(&mut fetch), None)
                .map_err(|e| self.transfer_error(&command, deadline, e))
        })
    }

    fn fetch(&self, options: &FetchOptions) -> GitResult<()> {
        let url = self.ctx.check(&options.url)?;
        let refspecs = if options.refspecs.is_empty() {
            vec![default_refspec("origin")]
        } else {
            self.ctx.check_all(&options.refspecs)?
        };

        let repo = self.open()?;
        let mut remote = repo.remote_anonymous(&url).during("fetch")?;

        let command = format!("libgit2 fetch {}", redact(&url));
        self.audited(&command, options.timeout_minutes, |deadline| {
            let mut fetch = self.fetch_options(
                &url,
                deadline,
                options.prune,
                options.depth(),
                options.tags,
            )?;
            remote
                .fetch(&refspecs, Some(&mut fetch), None)
                .map_err(|e| self.transfer_error(&command, deadline, e))
        })
    }

    fn checkout(&self, options: &CheckoutOptions) -> GitResult<()> {
        let reference = self.ctx.check(&options.reference)?;
        let branch = options
            .branch
            .as_deref()
            .map(|b| self.ctx.check(b))
            .transpose()?;
        if !options.sparse_paths.is_empty() {
            return Err(unsupported("sparse checkout"));
        }

        let repo = self.open()?;
        let command = format!("libgit2 checkout {}", reference);
        self.audited(&command, options.timeout_minutes, |_| {
            let commit = self.resolve_commit(&repo, &reference)?;
            let current = current_branch(&repo);

            if let (Some(branch), true) = (&branch, options.delete_branch_if_exists) {
                if current.as_deref() != Some(branch.as_str()) {
                    self.delete_branch(branch)?;
                }
            }

            let mut builder = CheckoutBuilder::new();
            builder.force();
            repo.checkout_tree(commit.as_object(), Some(&mut builder))
                .during("checkout")?;

            match &branch {
                Some(branch) => {
                    let refname = qualify_branch(branch);
                    if current.as_deref() == Some(branch.as_str()) {
                        repo.find_reference(&refname)
                            .and_then(|mut r| r.set_target(commit.id(), "checkout: reset branch").map(|_| ()))
                            .during("checkout")?;
                    } else {
                        repo.branch(branch, &commit, true).during("checkout")?;
                    }
                    repo.set_head(&refname).during("checkout")?;
                }
                None => {
                    let local = qualify_branch(&reference);
                    if !reference.starts_with("refs/") && find_reference(&repo, &local)?.is_some() {
                        repo.set_head(&local).during("checkout")?;
                    } else {
                        repo.set_head_detached(commit.id()).during("checkout")?;
                    }
                }
            }
            Ok(())
        })
    }

    fn merge(&self, options: &MergeOptions) -> GitResult<()> {
        let revision = self.ctx.check(&options.revision)?;
        if !matches!(options.strategy, MergeStrategy::Default | MergeStrategy::Recursive) {
            return Err(unsupported(format!("merge strategy {}", options.strategy)));
        }

        let repo = self.open()?;
        let theirs = self.resolve_commit(&repo, &revision)?;
        let annotated = repo
            .find_annotated_commit(theirs.id())
            .during("merge")?;
        let (analysis, _) = repo.merge_analysis(&[&annotated]).during("merge")?;

        if analysis.is_up_to_date() {
            debug!(%revision, "already up to date");
            return Ok(());
        }

        let mut safe = CheckoutBuilder::new();
        safe.safe();

        if analysis.is_unborn() {
            let head = repo.find_reference("HEAD").during("merge")?;
            let target = head
                .symbolic_target()
                .map(str::to_string)
                .ok_or_else(|| GitError::ParseError("HEAD is not symbolic".to_string()))?;
            repo.reference(&target, theirs.id(), false, "merge: initial")
                .during("merge")?;
            repo.checkout_head(Some(&mut safe)).during("merge")?;
            return Ok(());
        }

        let fast_forward = analysis.is_fast_forward();
        if options.fast_forward == FastForwardMode::FfOnly && !fast_forward {
            return Err(GitError::CommandFailed {
                command: format!("libgit2 merge {}", revision),
                exit_code: 128,
                output: "Not possible to fast-forward, aborting.".to_string(),
            });
        }

        if fast_forward && !options.squash && options.fast_forward != FastForwardMode::NoFf {
            repo.checkout_tree(theirs.as_object(), Some(&mut safe))
                .during("merge")?;
            repo.head()
                .and_then(|mut head| head.set_target(theirs.id(), "merge: Fast-forward").map(|_| ()))
                .during("merge")?;
            return Ok(());
        }

        if options.squash || !options.commit {
            repo.merge(&[&annotated], None, Some(&mut safe))
                .during("merge")?;
            if repo.index().during("merge")?.has_conflicts() {
                return Err(GitError::CommandFailed {
                    command: format!("libgit2 merge {}", revision),
                    exit_code: 1,
                    output: "Automatic merge failed; fix conflicts".to_string(),
                });
            }
            if options.squash {
                repo.cleanup_state().during("merge")?;
            }
            return Ok(());
        }

        let ours = repo
            .head()
            .and_then(|head| head.peel_to_commit())
            .during("merge")?;
        let mut index = repo
            .merge_commits(&ours, &theirs, None)
            .during("merge")?;
        if index.has_conflicts() {
            return Err(GitError::CommandFailed {
                command: format!("libgit2 merge {}", revision),
                exit_code: 1,
                output: "Automatic merge failed; fix conflicts".to_string(),
            });
        }

        let tree_id = index.write_tree_to(&repo).during("merge")?;
        let tree = repo.find_tree(tree_id).during("merge")?;
        let signature = repo.signature().during("merge signature")?;
        let message = options
            .message
            .clone()
            .unwrap_or_else(|| format!("Merge commit '{}'", revision));
        repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            &message,
            &tree,
            &[&ours, &theirs],
        )
        .during("merge commit")?;

        let mut force = CheckoutBuilder::new();
        force.force();
        repo.checkout_head(Some(&mut force)).during("merge")?;
        Ok(())
    }

    fn push(&self, options: &PushOptions) -> GitResult<()> {
        let to = self.ctx.check(&options.to)?;
        let refspec = self.ctx.check(&options.refspec)?;

        let repo = self.open()?;
        let specs = self.push_refspecs(&repo, options, &refspec)?;
        let mut remote = match repo.find_remote(&to) {
            Ok(remote) => remote,
            Err(_) => repo.remote_anonymous(&to).during("push")?,
        };
        let url = remote.url().unwrap_or(&to).to_string();

        let command = format!("libgit2 push {} {}", redact(&url), specs.join(" "));
        self.audited(&command, options.timeout_minutes, |deadline| {
            let rejected = Rc::new(RefCell::new(Vec::new()));
            let mut callbacks = self.callbacks(&url, deadline)?;
            let sink = Rc::clone(&rejected);
            callbacks.push_update_reference(move |refname, status| {
                if let Some(status) = status {
                    sink.borrow_mut().push(format!("{}: {}", refname, status));
                }
                Ok(())
            });

            let mut push = git2::PushOptions::new();
            push.remote_callbacks(callbacks);
            push.proxy_options(self.proxy_options(&url));
            remote
                .push(&specs, Some(&mut push))
                .map_err(|e| self.transfer_error(&command, deadline, e))?;

            let rejected = rejected.borrow();
            if !rejected.is_empty() {
                return Err(GitError::CommandFailed {
                    command: command.clone(),
                    exit_code: 1,
                    output: rejected.join("; "),
                });
            }
            Ok(())
        })
    }

    fn submodule_init(&self) -> GitResult<()> {
        let repo = self.open()?;
        for mut submodule in repo.submodules().during("submodule list")? {
            submodule.init(false).during("submodule init")?;
        }
        Ok(())
    }

    fn submodule_update(&self, options: &SubmoduleUpdateOptions) -> GitResult<()> {
        if options.remote_tracking {
            return Err(unsupported("submodule update --remote"));
        }
        if options.shallow {
            return Err(unsupported("shallow submodule update"));
        }
        if options.reference.is_some() {
            return Err(unsupported("submodule reference repository"));
        }
        if !options.branches.is_empty() {
            return Err(unsupported("submodule branch override"));
        }

        let repo = self.open()?;
        let parent_url = if options.parent_credentials {
            self.remote_url("origin")?
        } else {
            None
        };

        self.audited(
            "libgit2 submodule update",
            options.timeout_minutes,
            |deadline| {
                self.update_submodules(&repo, options.recursive, parent_url.as_deref(), deadline)
            },
        )
    }

    fn rev_list(&self, options: &RevListOptions) -> GitResult<Vec<ObjectId>> {
        let repo = self.open()?;
        let mut walk = repo.revwalk().during("rev-list")?;
        walk.set_sorting(Sort::TIME).during("rev-list")?;

        match &options.revision {
            Some(revision) => {
                let revision = self.ctx.check(revision)?;
                let commit = self.resolve_commit(&repo, &revision)?;
                walk.push(commit.id()).during("rev-list")?;
            }
            None => {
                walk.push_glob("*").during("rev-list")?;
                if repo.head().is_ok() {
                    walk.push_head().during("rev-list")?;
                }
            }
        }
        if options.first_parent {
            walk.simplify_first_parent().during("rev-list")?;
        }

        walk.take(options.max_count.unwrap_or(usize::MAX))
            .map(|id| id.map(ObjectId::from_oid).during("rev-list"))
            .collect()
    }

    fn changelog(
        &self,
        options: &ChangelogOptions,
        out: &mut Vec<u8>,
        abort: &AbortHandle,
    ) -> GitResult<()> {
        let include = self.ctx.check(&options.include)?;
        let exclude = options
            .exclude
            .as_deref()
            .map(|e| self.ctx.check(e))
            .transpose()?;

        let repo = self.open()?;
        let mut walk = repo.revwalk().during("changelog")?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .during("changelog")?;
        walk.push(self.resolve_commit(&repo, &include)?.id())
            .during("changelog")?;
        if let Some(exclude) = exclude {
            walk.hide(self.resolve_commit(&repo, &exclude)?.id())
                .during("changelog")?;
        }

        let mut written = 0usize;
        for id in walk {
            if abort.is_aborted() {
                debug!(commits = written, "changelog aborted");
                return Ok(());
            }
            if options.max.is_some_and(|max| written >= max) {
                break;
            }

            let commit = repo.find_commit(id.during("changelog")?).during("changelog")?;
            if commit.parent_count() > 1 {
                continue;
            }
            self.write_commit_entry(&repo, &commit, out)?;
            written += 1;
        }
        Ok(())
    }

    fn maintenance(&self, task: MaintenanceTask) -> GitResult<MaintenanceOutcome> {
        debug!(%task, "maintenance is not available through libgit2");
        Ok(MaintenanceOutcome::NotSupported)
    }

    fn prune(&self, options: &PruneOptions) -> GitResult<()> {
        let remote_name = self.ctx.check(&options.remote)?;
        let repo = self.open()?;
        let mut remote = repo.find_remote(&remote_name).during("prune")?;
        let url = remote.url().unwrap_or_default().to_string();

        let command = format!("libgit2 prune {}", remote_name);
        self.audited(&command, options.timeout_minutes, |deadline| {
            let mut fetch = self.fetch_options(&url, deadline, true, None, false)?;
            let configured: [&str; 0] = [];
            remote
                .fetch(&configured, Some(&mut fetch), None)
                .map_err(|e| self.transfer_error(&command, deadline, e))
        })
    }

    fn rev_parse(&self, revision: &str) -> GitResult<ObjectId> {
        let revision = self.ctx.check(revision)?;
        let repo = self.open()?;
        Ok(ObjectId::from_oid(self.resolve_commit(&repo, &revision)?.id()))
    }

    fn head_rev(&self, url: &str, branch: &str) -> GitResult<Option<ObjectId>> {
        let url = self.ctx.check(url)?;
        let branch = self.ctx.check(branch)?;
        let pattern = qualify_branch(&branch);

        let refs = self.list_remote(&url)?;
        Ok(refs
            .iter()
            .find(|(name, _)| **name == pattern || glob_match(&pattern, name))
            .map(|(_, id)| id.clone()))
    }

    fn remote_references(
        &self,
        url: &str,
        pattern: Option<&str>,
        heads: bool,
        tags: bool,
    ) -> GitResult<BTreeMap<String, ObjectId>> {
        let url = self.ctx.check(url)?;
        let pattern = pattern.map(|p| self.ctx.check(p)).transpose()?;

        let refs = self.list_remote(&url)?;
        Ok(refs
            .into_iter()
            .filter(|(name, _)| {
                if !heads && !tags {
                    return true;
                }
                (heads && name.starts_with("refs/heads/")) || (tags && name.starts_with("refs/tags/"))
            })
            .filter(|(name, _)| match &pattern {
                Some(pattern) => {
                    glob_match(pattern, name) || glob_match(&format!("*/{}", pattern), name)
                }
                None => true,
            })
            .collect())
    }

    fn tag_exists(&self, name: &str) -> GitResult<bool> {
        let name = self.ctx.check(name)?;
        let repo = self.open()?;
        Ok(find_reference(&repo, &format!("refs/tags/{}", name))?.is_some())
    }

    fn create_tag(&self, name: &str, message: Option<&str>) -> GitResult<()> {
        let name = self.ctx.check(name)?;
        let repo = self.open()?;
        let target = repo
            .head()
            .and_then(|head| head.peel(ObjectType::Commit))
            .during("tag")?;

        match message {
            Some(message) => {
                let signature = repo.signature().during("tag signature")?;
                repo.tag(&name, &target, &signature, message, false)
                    .during("tag")?;
            }
            None => {
                repo.tag_lightweight(&name, &target, false).during("tag")?;
            }
        }
        Ok(())
    }

    fn create_branch(&self, name: &str, start_point: Option<&str>) -> GitResult<()> {
        let name = self.ctx.check(name)?;
        let start = start_point.map(|s| self.ctx.check(s)).transpose()?;
        let repo = self.open()?;
        let commit = self.resolve_commit(&repo, start.as_deref().unwrap_or("HEAD"))?;
        repo.branch(&name, &commit, false).during("branch")?;
        Ok(())
    }

    fn delete_branch(&self, name: &str) -> GitResult<()> {
        let name = self.ctx.check(name)?;
        let repo = self.open()?;
        match repo.find_branch(&name, BranchType::Local) {
            Ok(mut branch) => branch.delete().during("delete branch"),
            Err(e) if e.code() == git2::ErrorCode::NotFound => {
                debug!(branch = %name, "branch already absent");
                Ok(())
            }
            Err(e) => Err(GitError::library("delete branch", e)),
        }
    }

    fn delete_tag(&self, name: &str) -> GitResult<()> {
        let name = self.ctx.check(name)?;
        let repo = self.open()?;
        if find_reference(&repo, &format!("refs/tags/{}", name))?.is_none() {
            debug!(tag = %name, "tag already absent");
            return Ok(());
        }
        repo.tag_delete(&name).during("delete tag")
    }

    fn delete_ref(&self, refname: &str) -> GitResult<()> {
        let refname = self.ctx.check(refname)?;
        let repo = self.open()?;
        match find_reference(&repo, &refname)? {
            Some(mut reference) => reference.delete().during("delete ref"),
            None => {
                debug!(%refname, "ref already absent");
                Ok(())
            }
        }
    }

    fn ref_exists(&self, refname: &str) -> GitResult<bool> {
        let refname = self.ctx.check(refname)?;
        let repo = self.open()?;
        Ok(find_reference(&repo, &refname)?.is_some())
    }

    fn branches(&self, pattern: Option<&str>) -> GitResult<Vec<Branch>> {
        let pattern = pattern.map(|p| self.ctx.check(p)).transpose()?;
        let repo = self.open()?;

        let mut branches = Vec::new();
        for entry in repo.branches(None).during("list branches")? {
            let (branch, _) = entry.during("list branches")?;
            let Some(name) = branch.name().during("branch name")?.map(str::to_string) else {
                continue;
            };
            let Some(target) = branch.get().target() else {
                continue;
            };
            if pattern.as_ref().is_some_and(|p| !glob_match(p, &name)) {
                continue;
            }
            branches.push(Branch {
                name,
                id: ObjectId::from_oid(target),
            });
        }
        Ok(branches)
    }

    fn set_remote_url(&self, remote: &str, url: &str) -> GitResult<()> {
        let remote = self.ctx.check(remote)?;
        let url = self.ctx.check(url)?;
        let repo = self.open()?;
        repo.remote_set_url(&remote, &url).during("set remote url")
    }

    fn remote_url(&self, remote: &str) -> GitResult<Option<String>> {
        let remote = self.ctx.check(remote)?;
        let repo = self.open()?;
        match repo.find_remote(&remote) {
            Ok(found) => Ok(found.url().map(str::to_string)),
            Err(e) if matches!(e.code(), git2::ErrorCode::NotFound | git2::ErrorCode::InvalidSpec) => {
                Ok(None)
            }
            Err(e) => Err(GitError::library("remote url", e)),
        }
    }
}
