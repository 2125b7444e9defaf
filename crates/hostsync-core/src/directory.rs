// ── Host directory ──
//
// The seam between the pipeline and the monitoring system: find a host by
// address, rewrite it in place. `ZabbixDirectory` owns the authenticated
// API client for the lifetime of the process.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use hostsync_api::transport::{TlsMode, TransportConfig};
use hostsync_api::{HostUpdate, ZabbixClient};

use crate::config::{ReferenceNames, TlsVerification, ZabbixConfig};
use crate::error::SyncError;
use crate::model::MonitoringRecord;
use crate::reference::ReferenceData;

/// Result of an address lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(MonitoringRecord),
    NotFound,
}

#[async_trait]
pub trait HostDirectory: Send + Sync {
    /// Exactly one query filtered by `ip`. More than one match is
    /// [`SyncError::AmbiguousLookup`].
    async fn find_by_ip(&self, ip: &str) -> Result<Lookup, SyncError>;

    /// Exactly one update request. Not retried.
    async fn update_host(&self, update: &HostUpdate) -> Result<(), SyncError>;
}

// ── ZabbixDirectory ──────────────────────────────────────────────

pub struct ZabbixDirectory {
    client: ZabbixClient,
}

impl ZabbixDirectory {
    /// Wrap an already authenticated client.
    pub fn new(client: ZabbixClient) -> Self {
        Self { client }
    }

    /// Build the client, log in, and optionally persist the session token.
    pub async fn connect(config: &ZabbixConfig) -> Result<Self, SyncError> {
        let transport = TransportConfig {
            tls: tls_to_transport(&config.tls),
            timeout: config.timeout,
        };
        let client = ZabbixClient::new(config.url.clone(), &transport).map_err(startup)?;

        client
            .login(&config.username, &config.password)
            .await
            .map_err(startup)?;
        info!(url = %config.url, username = %config.username, "connected to Zabbix");

        if let Some(ref path) = config.token_file {
            client.write_session_file(path).map_err(startup)?;
        }

        Ok(Self { client })
    }

    /// Load the name -> id cache. Failing to reach Zabbix here is fatal;
    /// names Zabbix does not know only produce warnings.
    pub async fn load_reference_data(
        &self,
        names: &ReferenceNames,
    ) -> Result<ReferenceData, SyncError> {
        ReferenceData::load(&self.client, names)
            .await
            .map_err(startup)
    }

    /// End the session. Errors are logged, never propagated: this runs
    /// during shutdown.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.logout().await {
            warn!(error = %e, "Zabbix logout failed");
        } else {
            debug!("Zabbix session closed");
        }
    }
}

#[async_trait]
impl HostDirectory for ZabbixDirectory {
    async fn find_by_ip(&self, ip: &str) -> Result<Lookup, SyncError> {
        let mut hosts = self.client.hosts_by_ip(ip).await.map_err(|e| {
            let message = e.to_string();
            if e.is_application() {
                SyncError::LookupApplication {
                    ip: ip.to_owned(),
                    message,
                }
            } else {
                SyncError::LookupTransport {
                    ip: ip.to_owned(),
                    message,
                }
            }
        })?;

        match hosts.len() {
            0 => Ok(Lookup::NotFound),
            1 => {
                let host = hosts.swap_remove(0);
                Ok(Lookup::Found(MonitoringRecord::from_host(host, ip)))
            }
            count => Err(SyncError::AmbiguousLookup {
                ip: ip.to_owned(),
                count,
            }),
        }
    }

    async fn update_host(&self, update: &HostUpdate) -> Result<(), SyncError> {
        let ids = self.client.update_host(update).await.map_err(|e| {
            let message = e.to_string();
            if e.is_application() {
                SyncError::ApplyApplication {
                    host: update.host.clone(),
                    message,
                }
            } else {
                SyncError::ApplyTransport {
                    host: update.host.clone(),
                    message,
                }
            }
        })?;
        debug!(hostids = ?ids, "host.update acknowledged");
        Ok(())
    }
}

fn startup(e: hostsync_api::Error) -> SyncError {
    SyncError::Startup {
        message: e.to_string(),
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
