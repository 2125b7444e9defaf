//! Reconciliation engine between a NetBox inventory and a Zabbix
//! monitoring server.
//!
//! One inbound change notification flows through the crate like this:
//!
//! - **[`InventoryEvent`]**: the webhook payload, parsed into an immutable
//!   [`InventoryRecord`] with an explicit default for every optional field.
//!
//! - **[`classify()`]**: decides, without any I/O, whether the host is
//!   monitored at all and which templates and host groups it belongs to
//!   ([`MonitoringProfile`]).
//!
//! - **[`HostDirectory`]**: looks the host up by address in the monitoring
//!   system and applies updates. [`ZabbixDirectory`] is the real
//!   implementation on top of `hostsync-api`.
//!
//! - **[`reconcile()`]**: diffs the desired profile against the existing
//!   [`MonitoringRecord`] and yields the merged target plus change flags.
//!
//! - **[`apply()`]**: resolves names through the read-only
//!   [`ReferenceData`] cache and issues exactly one update, or hands a new
//!   host to the [`Provisioner`].
//!
//! - **[`Pipeline`]**: drives the above for one event at a time and reports
//!   a terminal [`Outcome`] or [`SyncError`].

pub mod apply;
pub mod classify;
pub mod config;
pub mod convert;
pub mod directory;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provision;
pub mod reconcile;
pub mod reference;

// ── Primary re-exports ──────────────────────────────────────────────
pub use apply::{Applied, apply, resolve_update};
pub use classify::{classify, select_proxy};
pub use config::{
    BridgeConfig, Policy, ProvisionerConfig, ProxyRule, ReferenceNames, TlsVerification,
    ZabbixConfig,
};
pub use directory::{HostDirectory, Lookup, ZabbixDirectory};
pub use error::{RefKind, SyncError};
pub use pipeline::{Outcome, Pipeline};
pub use provision::{AnsibleProvisioner, ProvisionRequest, Provisioner};
pub use reconcile::{FieldChange, GUARDED_TEMPLATE, ReconcileResult, reconcile};
pub use reference::ReferenceData;

pub use hostsync_api::HostUpdate;

pub use model::{
    InventoryEvent, InventoryRecord, MonitoringProfile, MonitoringRecord, OsFamily, RefSet,
    RejectReason, Verdict,
};
