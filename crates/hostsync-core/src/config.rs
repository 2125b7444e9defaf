// ── Runtime bridge configuration ──
//
// These types describe *how* to talk to Zabbix and *which* business rules
// apply. They carry credential data and tuning, but never touch disk.
// `hostsync-config` constructs a `BridgeConfig` and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

/// TLS verification strategy for the Zabbix endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Connection and session settings for the Zabbix API.
#[derive(Debug, Clone)]
pub struct ZabbixConfig {
    /// Full JSON-RPC endpoint (`.../api_jsonrpc.php`).
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub tls: TlsVerification,
    /// Per-request timeout. Generous: the API can be slow under load.
    pub timeout: Duration,
    /// Where to write the session token after login, if anywhere.
    pub token_file: Option<PathBuf>,
}

/// Business rules for admission and classification.
///
/// Markers are matched case-insensitively as substrings, except
/// `excluded_tag`, which must equal a (lower-cased) tag name. An empty
/// value disables its check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Visible names containing this marker belong to an unmonitored
    /// business unit.
    pub excluded_name_marker: String,
    /// Clusters whose name contains this marker are never monitored.
    pub excluded_cluster_marker: String,
    /// Machines carrying this tag are about to be decommissioned.
    pub excluded_tag: String,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            excluded_name_marker: "ebay".into(),
            excluded_cluster_marker: "test".into(),
            excluded_tag: "orphaned".into(),
        }
    }
}

/// Chooses a Zabbix proxy for newly provisioned hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRule {
    /// Literal prefix the host address must start with.
    pub address_prefix: String,
    /// Lower-case substring the site name must contain.
    pub site_contains: String,
    /// Proxy address handed to provisioning.
    pub proxy: String,
}

impl ProxyRule {
    pub fn new(address_prefix: &str, site_contains: &str, proxy: &str) -> Self {
        Self {
            address_prefix: address_prefix.into(),
            site_contains: site_contains.into(),
            proxy: proxy.into(),
        }
    }

    /// The proxy layout of the two vCenter sites.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new("172.", "pluto-vcenter", "62.90.18.89"),
            Self::new("172.", "jupiter-vcenter", "80.178.113.59"),
        ]
    }
}

/// Template and host group names preloaded into the reference cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceNames {
    pub templates: Vec<String>,
    pub groups: Vec<String>,
}

impl Default for ReferenceNames {
    fn default() -> Self {
        Self {
            templates: vec![
                "Template OS Windows".into(),
                "Template OS Linux".into(),
                "template cPanel backup".into(),
            ],
            groups: vec![
                "Allwindows".into(),
                "Windows General".into(),
                "Linux servers".into(),
                "Fortigate".into(),
                "Uniq".into(),
                "cPanels".into(),
                "Clients".into(),
            ],
        }
    }
}

/// How new hosts are materialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerConfig {
    /// Executable to run (`ansible-playbook`).
    pub program: PathBuf,
    /// Playbook passed as the final argument.
    pub playbook: PathBuf,
    /// Upper bound for one provisioning run.
    pub timeout: Duration,
}

impl Default for ProvisionerConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ansible-playbook"),
            playbook: PathBuf::from("zabbix_create_host.yml"),
            timeout: Duration::from_secs(600),
        }
    }
}

/// Everything the bridge needs at runtime.
///
/// Built by the binary from `hostsync-config`; core never reads config files.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub zabbix: ZabbixConfig,
    pub policy: Policy,
    pub proxies: Vec<ProxyRule>,
    pub reference: ReferenceNames,
    pub provisioning: ProvisionerConfig,
    /// Events reconciled at the same time. 1 keeps the pipeline fully
    /// sequential; higher values still serialize events per address.
    pub max_concurrent_events: usize,
}
