// ── Core error types ──
//
// Every failure that abandons an event. Business rejections (inactive,
// excluded, unrecognized platform) are not errors: they are terminal
// `Outcome::Rejected` values. None of these are retried inside the core.

use thiserror::Error;

/// Which kind of reference entry a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RefKind {
    Template,
    Group,
}

/// Unified error type for the core crate.
#[derive(Debug, Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum SyncError {
    // ── Intake ───────────────────────────────────────────────────────
    #[error("Malformed event: {reason}")]
    MalformedInput { reason: String },

    // ── Lookup ───────────────────────────────────────────────────────
    #[error("Host lookup for {ip} failed: {message}")]
    LookupTransport { ip: String, message: String },

    #[error("Host lookup for {ip} rejected by Zabbix: {message}")]
    LookupApplication { ip: String, message: String },

    #[error("{count} Zabbix hosts match address {ip}")]
    AmbiguousLookup { ip: String, count: usize },

    // ── Apply ────────────────────────────────────────────────────────
    #[error("No {kind} named '{name}' in reference data")]
    UnresolvedReferenceName { kind: RefKind, name: String },

    #[error("Update of host '{host}' failed: {message}")]
    ApplyTransport { host: String, message: String },

    #[error("Update of host '{host}' rejected by Zabbix: {message}")]
    ApplyApplication { host: String, message: String },

    #[error("Provisioning of host '{host}' failed ({status}): {output}")]
    ProvisioningFailure {
        host: String,
        status: String,
        output: String,
    },

    // ── Process lifecycle ────────────────────────────────────────────
    #[error("Startup failed: {message}")]
    Startup { message: String },
}

impl SyncError {
    /// Stable snake_case name of the variant, used in responses and logs.
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// Stale reference data or broken configuration rather than a
    /// transient fault: an operator has to act before the event can succeed.
    pub fn is_operator_attention(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedReferenceName { .. } | Self::Startup { .. }
        )
    }
}
