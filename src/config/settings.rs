use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default timeout applied to every git invocation, in minutes
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 10;

/// Upper bound for caller-supplied timeouts (one week)
pub const MAX_TIMEOUT_MINUTES: u64 = 7 * 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Config directory not found")]
    DirectoryNotFound,

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Which implementation performs git operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// External git executable driven as a subprocess
    #[default]
    Cli,
    /// Embedded libgit2
    Library,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Cli => f.write_str("cli"),
            BackendKind::Library => f.write_str("library"),
        }
    }
}

/// How ssh treats unknown or changed host keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyVerification {
    /// Only hosts present in the known hosts file are accepted
    #[default]
    KnownHosts,
    /// Unknown hosts are added on first contact, changed keys are refused
    AcceptFirst,
    /// No verification at all
    NoVerification,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SshConfig {
    #[serde(default)]
    pub host_key_verification: HostKeyVerification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known_hosts: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Name of the environment variable holding the proxy password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    #[serde(default)]
    pub no_proxy: Vec<String>,
}

impl ProxyConfig {
    /// Read `GITWARD_PROXY_HOST`, `GITWARD_PROXY_PORT`, `GITWARD_PROXY_USER`
    /// and `GITWARD_NO_PROXY` (comma separated). The password stays in
    /// `GITWARD_PROXY_PASSWORD` and is looked up at use.
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("GITWARD_PROXY_HOST").ok()?;
        if host.trim().is_empty() {
            return None;
        }
        let port = std::env::var("GITWARD_PROXY_PORT")
            .ok()
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(8080);
        let user = std::env::var("GITWARD_PROXY_USER")
            .ok()
            .filter(|u| !u.is_empty());
        let no_proxy = std::env::var("GITWARD_NO_PROXY")
            .map(|list| parse_no_proxy(&list))
            .unwrap_or_default();

        Some(ProxyConfig {
            host: host.trim().to_string(),
            port,
            user,
            password_env: Some("GITWARD_PROXY_PASSWORD".to_string()),
            no_proxy,
        })
    }

    pub fn password(&self) -> Option<String> {
        self.password_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|p| !p.is_empty())
    }

    /// Whether `host` matches an entry of the no-proxy list
    ///
    /// Entries match exactly or as a domain suffix (`.example.com` and
    /// `example.com` both cover `git.example.com`); `*` matches everything.
    pub fn bypasses(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        self.no_proxy.iter().any(|entry| {
            let entry = entry.trim().to_ascii_lowercase();
            if entry == "*" {
                return true;
            }
            let bare = entry.trim_start_matches('.');
            !bare.is_empty() && (host == bare || host.ends_with(&format!(".{}", bare)))
        })
    }

    /// Proxy URL without credentials, e.g. `http://proxy:3128`
    pub fn url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

fn parse_no_proxy(list: &str) -> Vec<String> {
    list.split([',', '|'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AuditConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ClientConfig {
    #[serde(default)]
    pub backend: BackendKind,
    /// Reject remote URLs and arguments that look like git options.
    /// Turning this off is a reduced-safety compatibility mode.
    #[serde(default = "default_true")]
    pub check_remote_url: bool,
    #[serde(default = "default_timeout")]
    pub default_timeout_minutes: u64,
    #[serde(default = "default_git")]
    pub git_executable: PathBuf,
    /// Start each git process in its own process group so a timeout can
    /// terminate the whole tree
    #[serde(default = "default_true")]
    pub process_group: bool,
    /// Extra environment for every git process
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub ssh: SshConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub audit: AuditConfig,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_MINUTES
}

fn default_git() -> PathBuf {
    PathBuf::from("git")
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl ClientConfig {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::DirectoryNotFound)?;
        Ok(PathBuf::from(home).join(".config").join("gitward"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default location
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from a file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::ReadError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Config file not found",
            )));
        }

        let contents = fs::read_to_string(path)?;
        let mut config: ClientConfig = toml::from_str(&contents)?;

        if config.proxy.is_none() {
            config.proxy = ProxyConfig::from_env();
        }

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        self.validate()?;

        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;

        // Set permissions to 600 (owner read/write only)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Create default configuration
    pub fn default_config() -> Self {
        ClientConfig {
            backend: BackendKind::Cli,
            check_remote_url: true,
            default_timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            git_executable: default_git(),
            process_group: true,
            environment: BTreeMap::new(),
            ssh: SshConfig::default(),
            proxy: None,
            audit: AuditConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_minutes == 0 {
            return Err(ConfigError::InvalidValue(
                "default_timeout_minutes must be greater than 0".to_string(),
            ));
        }

        if self.git_executable.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "git_executable must not be empty".to_string(),
            ));
        }

        if let Some(proxy) = &self.proxy {
            if proxy.host.trim().is_empty() || proxy.port == 0 {
                return Err(ConfigError::InvalidValue(format!(
                    "Invalid proxy address: {}:{}",
                    proxy.host, proxy.port
                )));
            }
        }

        if self.audit.enabled && self.audit.path.is_none() {
            return Err(ConfigError::InvalidValue(
                "audit.path is required when audit logging is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Resolve a caller-requested timeout to the value actually enforced
    ///
    /// `None` and zero fall back to the configured default; anything above
    /// [`MAX_TIMEOUT_MINUTES`] is capped.
    pub fn effective_timeout(&self, requested_minutes: Option<u64>) -> u64 {
        match requested_minutes {
            None | Some(0) => self.default_timeout_minutes.min(MAX_TIMEOUT_MINUTES),
            Some(minutes) => minutes.min(MAX_TIMEOUT_MINUTES),
        }
    }
}

/// Convert a timeout in minutes to a `Duration` without overflowing
pub fn minutes_to_duration(minutes: u64) -> Duration {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(MAX_TIMEOUT_MINUTES * 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default_config();
        assert_eq!(config.backend, BackendKind::Cli);
        assert!(config.check_remote_url);
        assert_eq!(config.default_timeout_minutes, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = ClientConfig::default_config();
        config.default_timeout_minutes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_audit_without_path() {
        let mut config = ClientConfig::default_config();
        config.audit.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_effective_timeout() {
        let config = ClientConfig::default_config();
        assert_eq!(config.effective_timeout(None), 10);
        assert_eq!(config.effective_timeout(Some(0)), 10);
        assert_eq!(config.effective_timeout(Some(3)), 3);
        assert_eq!(config.effective_timeout(Some(u64::MAX)), MAX_TIMEOUT_MINUTES);
    }

    #[test]
    fn test_minutes_to_duration_overflow() {
        assert_eq!(minutes_to_duration(2), Duration::from_secs(120));
        assert_eq!(
            minutes_to_duration(u64::MAX),
            Duration::from_secs(MAX_TIMEOUT_MINUTES * 60)
        );
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ClientConfig = toml::from_str("backend = \"library\"").unwrap();
        assert_eq!(config.backend, BackendKind::Library);
        assert!(config.check_remote_url);
        assert!(config.process_group);
        assert_eq!(config.git_executable, PathBuf::from("git"));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = ClientConfig::default_config();
        config.check_remote_url = false;
        config.ssh.host_key_verification = HostKeyVerification::AcceptFirst;
        config.proxy = Some(ProxyConfig {
            host: "proxy.example.com".to_string(),
            port: 3128,
            user: Some("builder".to_string()),
            password_env: None,
            no_proxy: vec!["localhost".to_string()],
        });
        config.save_to(&path).unwrap();

        let loaded = ClientConfig::load_from(&path).unwrap();
        assert!(!loaded.check_remote_url);
        assert_eq!(loaded.ssh.host_key_verification, HostKeyVerification::AcceptFirst);
        assert_eq!(loaded.proxy, config.proxy);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_proxy_bypass() {
        let proxy = ProxyConfig {
            host: "proxy".to_string(),
            port: 8080,
            user: None,
            password_env: None,
            no_proxy: parse_no_proxy("localhost, .internal.example.com|git.corp"),
        };
        assert!(proxy.bypasses("localhost"));
        assert!(proxy.bypasses("build.internal.example.com"));
        assert!(proxy.bypasses("GIT.CORP"));
        assert!(!proxy.bypasses("github.com"));
        assert_eq!(proxy.url(), "http://proxy:8080");
    }
}
