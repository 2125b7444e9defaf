use thiserror::Error;

/// Top-level error type for the `hostsync-api` crate.
///
/// Covers every failure mode of a JSON-RPC exchange with Zabbix:
/// session handling, transport, HTTP status, and the `error` member of an
/// otherwise well-formed response. `hostsync-core` maps these into its
/// reconciliation taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login failed (wrong credentials, account blocked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// A method that needs a session token was called before `login`.
    #[error("Not authenticated -- call login first")]
    NotAuthenticated,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Non-success HTTP status from the API endpoint.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── JSON-RPC ────────────────────────────────────────────────────
    /// The `error` member of a JSON-RPC response.
    #[error("Zabbix API error {code}: {message} {data}")]
    Rpc {
        code: i64,
        message: String,
        data: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// Local file error (session token file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Returns `true` if the server answered with a JSON-RPC error object.
    /// Every other variant means no usable answer came back.
    pub fn is_application(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }
}
