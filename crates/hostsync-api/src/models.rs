// Zabbix JSON-RPC wire types
//
// Envelope types are crate-private; the host, template and group shapes
// are public because `hostsync-core` converts them into its domain model.
// Zabbix returns every identifier as a JSON string.

use serde::{Deserialize, Serialize};

// ── Envelope ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct RpcRequest<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a P,
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcResponse {
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RpcErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<String>,
}

// ── Reference data ──────────────────────────────────────────────────

/// A template as returned by `template.get` / `selectParentTemplates`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateRef {
    pub templateid: String,
    pub name: String,
}

/// A host group as returned by `hostgroup.get` / `selectGroups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub groupid: String,
    pub name: String,
}

// ── Hosts ───────────────────────────────────────────────────────────

/// A monitored host from `host.get`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZabbixHost {
    pub hostid: String,
    /// Technical host name.
    pub host: String,
    /// Visible name.
    pub name: String,
    /// Zabbix 6.2 renamed the selector output to `hostgroups`.
    #[serde(default, alias = "hostgroups")]
    pub groups: Vec<GroupRef>,
    #[serde(default, rename = "parentTemplates")]
    pub parent_templates: Vec<TemplateRef>,
}

/// Parameters for `host.update`.
///
/// `templates` replaces the linked template set and `groups` replaces the
/// host group set; both carry identifiers only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostUpdate {
    pub hostid: String,
    pub host: String,
    pub name: String,
    pub templates: Vec<TemplateId>,
    pub groups: Vec<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateId {
    pub templateid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupId {
    pub groupid: String,
}

/// Result of `host.update`.
#[derive(Debug, Clone, Deserialize)]
pub struct HostIds {
    pub hostids: Vec<String>,
}
