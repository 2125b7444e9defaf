// hostsync-api: Async Rust client for the Zabbix JSON-RPC management API

pub mod auth;
pub mod client;
pub mod error;
pub mod hosts;
pub mod models;
pub mod reference;
pub mod transport;

pub use client::ZabbixClient;
pub use error::Error;
pub use models::{GroupId, GroupRef, HostUpdate, TemplateId, TemplateRef, ZabbixHost};
pub use transport::{TlsMode, TransportConfig};
