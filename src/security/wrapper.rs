//! Transient helper scripts that hand credentials to git subprocesses.
//!
//! Git and ssh invoke these in place of their normal helpers (`GIT_SSH`,
//! `GIT_ASKPASS`, `SSH_ASKPASS`). The script text is a fixed skeleton: it only
//! ever names the variables below, and the values travel in the environment
//! of the single child process that runs the script. Nothing a caller passes
//! in (key path, user name, workspace name) is written into the file.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

use crate::config::HostKeyVerification;

pub const SSH_KEYFILE_VAR: &str = "JENKINS_GIT_SSH_KEYFILE";
pub const SSH_USERNAME_VAR: &str = "JENKINS_GIT_SSH_USERNAME";
pub const SSH_KNOWN_HOSTS_VAR: &str = "JENKINS_GIT_SSH_KNOWN_HOSTS";
pub const SSH_PASSPHRASE_VAR: &str = "JENKINS_GIT_SSH_PASSPHRASE";
pub const PASSWORD_VAR: &str = "JENKINS_GIT_PASSWORD";

/// Script dialect to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOs {
    /// `/bin/sh` script
    Posix,
    /// `cmd.exe` batch file
    Windows,
}

impl TargetOs {
    pub fn current() -> Self {
        if cfg!(windows) {
            TargetOs::Windows
        } else {
            TargetOs::Posix
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            TargetOs::Posix => ".sh",
            TargetOs::Windows => ".bat",
        }
    }

    fn var(self, name: &str) -> String {
        match self {
            TargetOs::Posix => format!("\"${}\"", name),
            TargetOs::Windows => format!("\"!{}!\"", name),
        }
    }

    fn line_ending(self) -> &'static str {
        match self {
            TargetOs::Posix => "\n",
            TargetOs::Windows => "\r\n",
        }
    }
}

/// Which secret an askpass wrapper prints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskpassSecret {
    /// HTTP password or token, for `GIT_ASKPASS`
    Password,
    /// Private key passphrase, for `SSH_ASKPASS`
    SshPassphrase,
}

impl AskpassSecret {
    fn var(self) -> &'static str {
        match self {
            AskpassSecret::Password => PASSWORD_VAR,
            AskpassSecret::SshPassphrase => SSH_PASSPHRASE_VAR,
        }
    }
}

/// Identity material the ssh wrapper reads at run time
#[derive(Debug, Clone)]
pub struct SshIdentity {
    pub key_file: PathBuf,
    pub username: String,
    pub known_hosts: Option<PathBuf>,
}

/// A generated helper script plus the environment its caller must export
///
/// The file is removed when this value is dropped.
pub struct WrapperScript {
    path: TempPath,
    env: Vec<(String, String)>,
}

impl WrapperScript {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Variables to set on the child process that will run the script
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    pub fn text(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

impl fmt::Debug for WrapperScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("WrapperScript")
            .field("path", &self.path.to_path_buf())
            .field("env", &names)
            .finish()
    }
}

/// Directory holding transient scripts for a workspace: `<workspace>@tmp`
///
/// Created with mode 0700 on unix.
pub fn script_dir_for(workspace: &Path) -> io::Result<PathBuf> {
    let name = workspace.file_name().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("workspace has no directory name: {}", workspace.display()),
        )
    })?;

    let mut dir_name = name.to_os_string();
    dir_name.push("@tmp");
    let dir = workspace.with_file_name(dir_name);

    fs::create_dir_all(&dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }

    Ok(dir)
}

/// Generate a `GIT_SSH` replacement that runs ssh with the given identity
pub fn make_ssh_wrapper(
    dir: &Path,
    identity: &SshIdentity,
    target: TargetOs,
    verification: HostKeyVerification,
) -> io::Result<WrapperScript> {
    let text = ssh_script_text(target, verification, identity.known_hosts.is_some());
    let path = write_script(dir, "ssh", target, &text)?;

    let mut env = vec![
        (
            SSH_KEYFILE_VAR.to_string(),
            identity.key_file.to_string_lossy().into_owned(),
        ),
        (SSH_USERNAME_VAR.to_string(), identity.username.clone()),
    ];
    if let Some(known_hosts) = &identity.known_hosts {
        env.push((
            SSH_KNOWN_HOSTS_VAR.to_string(),
            known_hosts.to_string_lossy().into_owned(),
        ));
    }

    Ok(WrapperScript { path, env })
}

/// Generate an askpass helper that prints one secret
///
/// The secret value itself is returned in the wrapper's environment.
pub fn make_askpass_wrapper(
    dir: &Path,
    target: TargetOs,
    secret: AskpassSecret,
    value: &str,
) -> io::Result<WrapperScript> {
    let text = askpass_script_text(target, secret);
    let path = write_script(dir, "pass", target, &text)?;

    Ok(WrapperScript {
        path,
        env: vec![(secret.var().to_string(), value.to_string())],
    })
}

/// Write private key material to a 0600 file that lives as long as the
/// returned path
pub fn write_key_file(dir: &Path, material: &str) -> io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix("ssh")
        .suffix(".key")
        .tempfile_in(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o600))?;
    }

    file.write_all(material.as_bytes())?;
    if !material.ends_with('\n') {
        file.write_all(b"\n")?;
    }
    file.flush()?;

    Ok(file.into_temp_path())
}

fn host_key_options(target: TargetOs, verification: HostKeyVerification, known_hosts: bool) -> String {
    let mut options = match verification {
        HostKeyVerification::KnownHosts => "-o StrictHostKeyChecking=yes".to_string(),
        HostKeyVerification::AcceptFirst => "-o StrictHostKeyChecking=accept-new".to_string(),
        HostKeyVerification::NoVerification => "-o StrictHostKeyChecking=no".to_string(),
    };

    if known_hosts {
        options.push_str(" -o UserKnownHostsFile=");
        options.push_str(&target.var(SSH_KNOWN_HOSTS_VAR));
    }

    options
}

fn ssh_script_text(target: TargetOs, verification: HostKeyVerification, known_hosts: bool) -> String {
    let nl = target.line_ending();
    let invocation = format!(
        "-i {} -l {} {}",
        target.var(SSH_KEYFILE_VAR),
        target.var(SSH_USERNAME_VAR),
        host_key_options(target, verification, known_hosts)
    );

    match target {
        TargetOs::Posix => format!("#!/bin/sh{nl}exec ssh {invocation} \"$@\"{nl}"),
        TargetOs::Windows => format!(
            "@echo off{nl}setlocal enabledelayedexpansion{nl}ssh.exe {invocation} %*{nl}"
        ),
    }
}

fn askpass_script_text(target: TargetOs, secret: AskpassSecret) -> String {
    let nl = target.line_ending();
    match target {
        TargetOs::Posix => format!(
            "#!/bin/sh{nl}printf '%s\\n' \"${}\"{nl}",
            secret.var()
        ),
        TargetOs::Windows => format!(
            "@echo off{nl}setlocal enabledelayedexpansion{nl}echo !{}!{nl}",
            secret.var()
        ),
    }
}

fn write_script(dir: &Path, prefix: &str, target: TargetOs, text: &str) -> io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(target.suffix())
        .tempfile_in(dir)?;

    file.write_all(text.as_bytes())?;
    file.flush()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(file.path(), fs::Permissions::from_mode(0o700))?;
    }

    // Closing the handle before anyone executes the file avoids ETXTBSY
    Ok(file.into_temp_path())
}
