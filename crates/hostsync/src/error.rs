//! CLI error types with miette diagnostics.
//!
//! Maps configuration and reconciliation failures into user-facing errors
//! with actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use hostsync_config::ConfigError;
use hostsync_core::SyncError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(hostsync::no_config),
        help("Pass an existing file with --config, or run: hostsync config path")
    )]
    NoConfig { path: String },

    #[error("No Zabbix credentials configured")]
    #[diagnostic(
        code(hostsync::no_credentials),
        help(
            "{detail}\n\
             Credentials are read from ZABBIX_USERNAME / ZABBIX_PASSWORD,\n\
             the system keyring, or the [zabbix] section of the config file."
        )
    )]
    NoCredentials { detail: String },

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(hostsync::validation))]
    Validation { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(hostsync::config))]
    Config(ConfigError),

    // ── Zabbix ───────────────────────────────────────────────────────

    #[error("Could not start against Zabbix at {url}")]
    #[diagnostic(
        code(hostsync::connection_failed),
        help(
            "{message}\n\
             Check zabbix.url and the credentials. For self-signed certificates\n\
             set zabbix.insecure = true or zabbix.ca_cert."
        )
    )]
    ConnectionFailed { url: String, message: String },

    #[error("{count} reference name(s) missing in Zabbix")]
    #[diagnostic(
        code(hostsync::incomplete_reference),
        help(
            "Missing: {names}\n\
             Create them in Zabbix or remove them from the [reference] section.\n\
             Events that need them will fail with unresolved_reference_name."
        )
    )]
    IncompleteReference { count: usize, names: String },

    #[error(transparent)]
    #[diagnostic(code(hostsync::sync))]
    Sync(#[from] SyncError),

    // ── Server ───────────────────────────────────────────────────────

    #[error("Cannot listen on {address}")]
    #[diagnostic(
        code(hostsync::bind),
        help("Another process may hold the port. Change listen.address or pass --listen.")
    )]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Logging setup failed: {message}")]
    #[diagnostic(code(hostsync::logging))]
    Logging { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(hostsync::json), help("Check the JSON file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("YAML rendering failed: {0}")]
    #[diagnostic(code(hostsync::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::MissingFile { path } => Self::NoConfig {
                path: path.display().to_string(),
            },
            ConfigError::NoCredentials { missing } => Self::NoCredentials { detail: missing },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::Bind { .. } => exit_code::CONNECTION,
            Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NoConfig { .. } | Self::IncompleteReference { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. }
            | Self::Config(_)
            | Self::Json(_)
            | Self::Sync(SyncError::MalformedInput { .. }) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}
