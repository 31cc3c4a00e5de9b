pub mod settings;

pub use settings::{
    AuditConfig, BackendKind, ClientConfig, ConfigError, HostKeyVerification, ProxyConfig,
    SshConfig, DEFAULT_TIMEOUT_MINUTES, MAX_TIMEOUT_MINUTES,
};
