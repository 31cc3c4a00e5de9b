pub mod validator;
pub mod wrapper;

pub use validator::{UrlValidator, Verdict};
pub use wrapper::{
    make_askpass_wrapper, make_ssh_wrapper, script_dir_for, write_key_file, AskpassSecret,
    SshIdentity, TargetOs, WrapperScript, PASSWORD_VAR, SSH_KEYFILE_VAR, SSH_KNOWN_HOSTS_VAR,
    SSH_PASSPHRASE_VAR, SSH_USERNAME_VAR,
};

/// Deny-list of option prefixes that git would act on if they reached a
/// command line in the position of a URL, refspec or ref name
///
/// Grown from reported option-injection vectors. Additions require the same
/// security review as the validator itself.
pub const DANGEROUS_OPTION_PREFIXES: &[&str] = &[
    // Arbitrary command execution
    "--upload-pack",
    "--receive-pack",
    "--exec",
    "-u",
    "--config",
    "-c",
    // Arbitrary file writes
    "--output",
    "-o",
    "--template",
    "--separate-git-dir",
    "--reference",
    // Behaviour changes in ls-remote / fetch / push
    "--sort",
    "--server-option",
    "--mirror",
    "--force",
    "--delete",
    "--prune",
    "-q",
    "--quiet",
];
