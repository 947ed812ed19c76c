//! Startup configuration from `PORTAL_*` environment variables.

use crate::session::DEFAULT_MAX_SESSIONS;
use portal_auth::{Authenticator, CommandAuthenticator};
use portal_core::PortalSettings;
use portal_slurm::SlurmCommands;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_LISTEN: &str = "0.0.0.0:5000";
const DEFAULT_SESSION_IDLE_SECS: u64 = 12 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORTAL_LISTEN address {0:?}")]
    InvalidListen(String),
    #[error("invalid {var} value {value:?}")]
    InvalidNumber { var: &'static str, value: String },
    #[error("unknown PORTAL_AUTH backend {0:?} (expected \"pam\" or \"command\")")]
    UnknownAuthBackend(String),
    #[error("PORTAL_AUTH=command requires PORTAL_AUTH_COMMAND")]
    MissingAuthCommand,
    #[error("PORTAL_AUTH=pam but this binary was built without the `pam` feature")]
    PamUnavailable,
}

/// How login credentials are checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthBackend {
    Pam { service: String },
    /// Checkpassword-style helper command line.
    Command { command_line: String },
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub listen: SocketAddr,
    pub portal: PortalSettings,
    pub slurm: SlurmCommands,
    pub auth: AuthBackend,
    pub session_idle: Duration,
    pub max_sessions: usize,
}

impl PortalConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source; empty values count as unset.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| get(name).filter(|v| !v.trim().is_empty());

        let listen_raw = get("PORTAL_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen_raw
            .parse()
            .map_err(|_| ConfigError::InvalidListen(listen_raw.clone()))?;

        let defaults = PortalSettings::default();
        let portal = PortalSettings {
            admin_user: get("PORTAL_ADMIN_USER").unwrap_or(defaults.admin_user),
            script_dir: get("PORTAL_SCRIPT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.script_dir),
            job_chdir: get("PORTAL_JOB_CHDIR").unwrap_or(defaults.job_chdir),
        };

        let session_idle = match get("PORTAL_SESSION_IDLE_SECS") {
            None => Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidNumber {
                    var: "PORTAL_SESSION_IDLE_SECS",
                    value: v.clone(),
                })?,
        };

        let max_sessions = match get("PORTAL_MAX_SESSIONS") {
            None => DEFAULT_MAX_SESSIONS,
            Some(v) => v
                .trim()
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidNumber {
                    var: "PORTAL_MAX_SESSIONS",
                    value: v.clone(),
                })?,
        };

        let default_backend = if cfg!(feature = "pam") { "pam" } else { "command" };
        let backend = get("PORTAL_AUTH").unwrap_or_else(|| default_backend.to_string());
        let auth = match backend.trim().to_ascii_lowercase().as_str() {
            "pam" => AuthBackend::Pam {
                service: get("PORTAL_PAM_SERVICE").unwrap_or_else(|| "login".to_string()),
            },
            "command" => AuthBackend::Command {
                command_line: get("PORTAL_AUTH_COMMAND").ok_or(ConfigError::MissingAuthCommand)?,
            },
            _ => return Err(ConfigError::UnknownAuthBackend(backend)),
        };

        Ok(Self {
            listen,
            portal,
            slurm: SlurmCommands::from_lookup(get),
            auth,
            session_idle,
            max_sessions,
        })
    }

    /// Instantiate the configured credential backend.
    pub fn authenticator(&self) -> Result<Arc<dyn Authenticator>, ConfigError> {
        match &self.auth {
            AuthBackend::Command { command_line } => CommandAuthenticator::from_command_line(command_line)
                .map(|a| Arc::new(a) as Arc<dyn Authenticator>)
                .ok_or(ConfigError::MissingAuthCommand),
            #[cfg(feature = "pam")]
            AuthBackend::Pam { service } => Ok(Arc::new(portal_auth::PamAuthenticator::new(service.clone()))),
            #[cfg(not(feature = "pam"))]
            AuthBackend::Pam { .. } => Err(ConfigError::PamUnavailable),
        }
    }
}
