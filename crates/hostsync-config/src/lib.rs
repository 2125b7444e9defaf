//! Configuration for the hostsync bridge.
//!
//! TOML file + `HOSTSYNC_*` environment layering, credential resolution
//! (env + keyring + plaintext), and translation to
//! `hostsync_core::BridgeConfig`.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hostsync_core::{
    BridgeConfig, Policy, ProvisionerConfig, ProxyRule, ReferenceNames, TlsVerification,
    ZabbixConfig,
};

const KEYRING_SERVICE: &str = "hostsync";
const USERNAME_ENV: &str = "ZABBIX_USERNAME";
const PASSWORD_ENV: &str = "ZABBIX_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no Zabbix credentials configured ({missing})")]
    NoCredentials { missing: String },

    #[error("config file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub listen: Listen,

    #[serde(default)]
    pub zabbix: Zabbix,

    #[serde(default)]
    pub provisioning: Provisioning,

    #[serde(default)]
    pub policy: PolicySection,

    /// Template and host group names to preload at startup.
    #[serde(default)]
    pub reference: ReferenceNames,

    /// Proxy selection rules, first match wins.
    #[serde(default = "ProxyRule::defaults")]
    pub proxies: Vec<ProxyRule>,

    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: Listen::default(),
            zabbix: Zabbix::default(),
            provisioning: Provisioning::default(),
            policy: PolicySection::default(),
            reference: ReferenceNames::default(),
            proxies: ProxyRule::defaults(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Listen {
    /// Socket address the webhook intake binds to.
    #[serde(default = "default_listen_address")]
    pub address: String,
}

impl Default for Listen {
    fn default() -> Self {
        Self {
            address: default_listen_address(),
        }
    }
}

fn default_listen_address() -> String {
    "0.0.0.0:17777".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Zabbix {
    /// JSON-RPC endpoint, e.g. `https://zabbix.example.com/zabbix/api_jsonrpc.php`.
    pub url: Option<String>,

    /// Username (falls back to `ZABBIX_USERNAME`).
    pub username: Option<String>,

    /// Password (plaintext -- prefer `ZABBIX_PASSWORD` or the keyring).
    pub password: Option<String>,

    #[serde(default = "default_zabbix_timeout")]
    pub timeout_secs: u64,

    /// Skip TLS verification.
    #[serde(default)]
    pub insecure: bool,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Write the session token here after login.
    pub token_file: Option<PathBuf>,
}

impl Default for Zabbix {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            timeout_secs: default_zabbix_timeout(),
            insecure: false,
            ca_cert: None,
            token_file: None,
        }
    }
}

fn default_zabbix_timeout() -> u64 {
    180
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Provisioning {
    #[serde(default = "default_program")]
    pub program: PathBuf,

    #[serde(default = "default_playbook")]
    pub playbook: PathBuf,

    #[serde(default = "default_provisioning_timeout")]
    pub timeout_secs: u64,
}

impl Default for Provisioning {
    fn default() -> Self {
        Self {
            program: default_program(),
            playbook: default_playbook(),
            timeout_secs: default_provisioning_timeout(),
        }
    }
}

fn default_program() -> PathBuf {
    ProvisionerConfig::default().program
}
fn default_playbook() -> PathBuf {
    ProvisionerConfig::default().playbook
}
fn default_provisioning_timeout() -> u64 {
    ProvisionerConfig::default().timeout.as_secs()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PolicySection {
    #[serde(default = "default_name_marker")]
    pub excluded_name_marker: String,

    #[serde(default = "default_cluster_marker")]
    pub excluded_cluster_marker: String,

    #[serde(default = "default_excluded_tag")]
    pub excluded_tag: String,

    /// Events reconciled at the same time (same-address events are always
    /// serialized).
    #[serde(default = "default_max_concurrent_events")]
    pub max_concurrent_events: usize,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            excluded_name_marker: default_name_marker(),
            excluded_cluster_marker: default_cluster_marker(),
            excluded_tag: default_excluded_tag(),
            max_concurrent_events: default_max_concurrent_events(),
        }
    }
}

fn default_name_marker() -> String {
    Policy::default().excluded_name_marker
}
fn default_cluster_marker() -> String {
    Policy::default().excluded_cluster_marker
}
fn default_excluded_tag() -> String {
    Policy::default().excluded_tag
}
fn default_max_concurrent_events() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Logging {
    /// Directory for daily-rotated log files. Logs go to stderr only when
    /// unset.
    pub directory: Option<PathBuf>,

    /// File name prefix inside `directory`.
    #[serde(default = "default_log_file")]
    pub file_name: String,

    /// Default filter when neither `-v` nor `RUST_LOG` is given.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            directory: None,
            file_name: default_log_file(),
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_file() -> String {
    "hostsync.log".into()
}
fn default_log_level() -> String {
    "info".into()
}

/// Parse an `ip:port` listen address.
pub fn parse_listen_addr(address: &str) -> Result<SocketAddr, ConfigError> {
    address.parse().map_err(|e| ConfigError::Validation {
        field: "listen.address".into(),
        reason: format!("{e}: {address}"),
    })
}

impl Config {
    /// Parse the listen address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen_addr(&self.listen.address)
    }

    /// A copy safe to print: any plaintext password is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.zabbix.password.is_some() {
            copy.zabbix.password = Some("********".into());
        }
        copy
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "hostsync", "hostsync").map_or_else(
        || {
            let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
            p.push(".config");
            p.push("hostsync");
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load defaults, then the TOML file, then `HOSTSYNC_*` environment
/// variables (`HOSTSYNC_ZABBIX__URL` sets `zabbix.url`).
///
/// An explicit `path` must exist; the default path may be absent.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let file = match path {
        Some(p) if !p.exists() => {
            return Err(ConfigError::MissingFile { path: p.to_owned() });
        }
        Some(p) => p.to_owned(),
        None => config_path(),
    };

    let config: Config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(&file))
        .merge(Env::prefixed("HOSTSYNC_").split("__"))
        .extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve the Zabbix username and password.
///
/// Username: config, then `ZABBIX_USERNAME`. Password: `ZABBIX_PASSWORD`,
/// then the system keyring entry `hostsync/<username>`, then plaintext in
/// the config.
pub fn resolve_credentials(zabbix: &Zabbix) -> Result<(String, SecretString), ConfigError> {
    resolve_credentials_with(
        zabbix,
        |name| std::env::var(name).ok(),
        |username| {
            keyring::Entry::new(KEYRING_SERVICE, username)
                .and_then(|entry| entry.get_password())
                .ok()
        },
    )
}

/// [`resolve_credentials`] with the environment and keyring lookups
/// supplied by the caller.
pub fn resolve_credentials_with(
    zabbix: &Zabbix,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<(String, SecretString), ConfigError> {
    let username = zabbix
        .username
        .clone()
        .or_else(|| env(USERNAME_ENV))
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ConfigError::NoCredentials {
            missing: format!("username: set zabbix.username or {USERNAME_ENV}"),
        })?;

    let password = env(PASSWORD_ENV)
        .or_else(|| keyring(&username))
        .or_else(|| zabbix.password.clone())
        .ok_or_else(|| ConfigError::NoCredentials {
            missing: format!(
                "password: set {PASSWORD_ENV}, a keyring entry '{KEYRING_SERVICE}/{username}', or zabbix.password"
            ),
        })?;

    Ok((username, SecretString::from(password)))
}

// ── Translation ─────────────────────────────────────────────────────

/// Build the runtime `BridgeConfig`, resolving credentials.
pub fn to_bridge_config(cfg: &Config) -> Result<BridgeConfig, ConfigError> {
    let (username, password) = resolve_credentials(&cfg.zabbix)?;
    bridge_config_with_credentials(cfg, username, password)
}

/// Build the runtime `BridgeConfig` from already resolved credentials.
pub fn bridge_config_with_credentials(
    cfg: &Config,
    username: String,
    password: SecretString,
) -> Result<BridgeConfig, ConfigError> {
    let raw_url = cfg
        .zabbix
        .url
        .as_deref()
        .ok_or_else(|| ConfigError::Validation {
            field: "zabbix.url".into(),
            reason: "not set".into(),
        })?;
    let url: url::Url = raw_url.parse().map_err(|_| ConfigError::Validation {
        field: "zabbix.url".into(),
        reason: format!("invalid URL: {raw_url}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "zabbix.url".into(),
            reason: format!("expected http or https, got '{}'", url.scheme()),
        });
    }

    if cfg.policy.max_concurrent_events == 0 {
        return Err(ConfigError::Validation {
            field: "policy.max_concurrent_events".into(),
            reason: "must be at least 1".into(),
        });
    }

    let tls = if cfg.zabbix.insecure {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = cfg.zabbix.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(BridgeConfig {
        zabbix: ZabbixConfig {
            url,
            username,
            password,
            tls,
            timeout: Duration::from_secs(cfg.zabbix.timeout_secs),
            token_file: cfg.zabbix.token_file.clone(),
        },
        policy: cfg.policy.rules(),
        proxies: cfg.proxies.clone(),
        reference: cfg.reference.clone(),
        provisioning: ProvisionerConfig {
            program: cfg.provisioning.program.clone(),
            playbook: cfg.provisioning.playbook.clone(),
            timeout: Duration::from_secs(cfg.provisioning.timeout_secs),
        },
        max_concurrent_events: cfg.policy.max_concurrent_events,
    })
}

impl PolicySection {
    /// The admission and classification rules.
    pub fn rules(&self) -> Policy {
        Policy {
            excluded_name_marker: self.excluded_name_marker.clone(),
            excluded_cluster_marker: self.excluded_cluster_marker.clone(),
            excluded_tag: self.excluded_tag.clone(),
        }
    }
}
