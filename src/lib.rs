//! Credential-aware git execution for automation.
//!
//! A [`GitClient`] drives either the external `git` executable or libgit2
//! behind the same [`GitBackend`] contract. Every URL and ref argument is
//! validated before use, credentials only travel through environment
//! variables and short-lived helper scripts, and every git process runs
//! under a timeout.

pub mod audit;
pub mod backend;
pub mod client;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod error;
pub mod error_translation;
pub mod git;
pub mod security;

// Re-export commonly used types for convenience
pub use backend::{Capability, GitBackend};
pub use client::GitClient;
pub use config::{BackendKind, ClientConfig};
pub use credentials::{Credential, CredentialProvider, CredentialStore, Secret};
pub use error::{ErrorCategory, GitError, GitResult};
pub use git::{Branch, GitVersion, ObjectId};
pub use security::UrlValidator;
