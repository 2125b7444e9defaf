// ── Inventory event model ──
//
// Wire shape of a NetBox virtual-machine webhook and the normalized
// record derived from it. Optional fields stay `Option` on the wire; the
// record applies one named default per field instead of catching errors
// around nested lookups.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::config::Policy;
use crate::error::SyncError;
use crate::model::profile::RejectReason;

// ── Wire types ───────────────────────────────────────────────────────

/// A NetBox webhook delivery.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryEvent {
    /// `created`, `updated` or `deleted`.
    #[serde(default)]
    pub event: Option<String>,
    /// NetBox formats this as `2024-03-09 17:55:33.329547+00:00`.
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    pub data: VirtualMachine,
}

/// The `data` object of a virtual-machine webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct VirtualMachine {
    pub name: String,
    pub status: Status,
    #[serde(default)]
    pub primary_ip: Option<IpAddressRef>,
    #[serde(default)]
    pub platform: Option<NamedRef>,
    #[serde(default)]
    pub tags: Vec<NamedRef>,
    #[serde(default)]
    pub custom_fields: Option<CustomFields>,
    #[serde(default)]
    pub cluster: Option<NamedRef>,
    #[serde(default)]
    pub site: Option<NamedRef>,
}

/// NetBox renders choice fields as `{"value": ..., "label": ...}`; older
/// exports carry the bare value.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Status {
    Choice { value: String },
    Plain(String),
}

impl Status {
    pub fn value(&self) -> &str {
        match self {
            Self::Choice { value } | Self::Plain(value) => value,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpAddressRef {
    pub address: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomFields {
    #[serde(default)]
    pub vcsa_vm_guest_hostname: Option<String>,
}

impl InventoryEvent {
    /// Parse a webhook body. Invalid JSON or a payload without
    /// `data.name` / `data.status` is malformed input.
    pub fn from_slice(body: &[u8]) -> Result<Self, SyncError> {
        serde_json::from_slice(body).map_err(|e| SyncError::MalformedInput {
            reason: e.to_string(),
        })
    }

    /// The delivery timestamp, if present and parseable.
    pub fn timestamp(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.timestamp.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .or_else(|_| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z"))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc().fixed_offset())
            })
    }
}

// ── InventoryRecord ─────────────────────────────────────────────────

/// One observed virtual machine, normalized for classification.
///
/// Immutable once built; discarded when the event has been reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRecord {
    /// Primary address with any `/prefix` suffix removed. `None` when the
    /// machine has no primary IP.
    pub ip_address: Option<String>,
    pub visible_name: String,
    /// Guest OS hostname reported by vCenter.
    pub host_name: Option<String>,
    /// Lower-cased platform label, empty when unset.
    pub platform: String,
    /// Lower-cased tag names.
    pub tags: BTreeSet<String>,
    /// Lower-cased status value.
    pub status: String,
    pub cluster_name: Option<String>,
    pub site_name: Option<String>,
}

impl InventoryRecord {
    pub fn from_event(event: &InventoryEvent) -> Self {
        let vm = &event.data;
        Self {
            ip_address: vm
                .primary_ip
                .as_ref()
                .and_then(|ip| strip_prefix_length(&ip.address)),
            visible_name: vm.name.clone(),
            host_name: vm
                .custom_fields
                .as_ref()
                .and_then(|cf| cf.vcsa_vm_guest_hostname.clone())
                .filter(|h| !h.trim().is_empty()),
            platform: vm
                .platform
                .as_ref()
                .map(|p| p.name.to_lowercase())
                .unwrap_or_default(),
            tags: vm.tags.iter().map(|t| t.name.to_lowercase()).collect(),
            status: vm.status.value().to_lowercase(),
            cluster_name: vm.cluster.as_ref().map(|c| c.name.clone()),
            site_name: vm.site.as_ref().map(|s| s.name.clone()),
        }
    }

    /// Technical host name for Zabbix: the guest hostname, or the visible
    /// name when vCenter did not report one.
    pub fn effective_host_name(&self) -> &str {
        self.host_name.as_deref().unwrap_or(&self.visible_name)
    }

    /// Admission checks that precede classification, in order: active
    /// status, a primary address, not in an excluded cluster, not tagged
    /// for decommissioning.
    pub fn admit(&self, policy: &Policy) -> Result<(), RejectReason> {
        if self.status != "active" {
            return Err(RejectReason::Inactive);
        }
        if self.ip_address.is_none() {
            return Err(RejectReason::MissingAddress);
        }
        let cluster_marker = policy.excluded_cluster_marker.to_lowercase();
        if !cluster_marker.is_empty()
            && self
                .cluster_name
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&cluster_marker))
        {
            return Err(RejectReason::ExcludedCluster);
        }
        let excluded_tag = policy.excluded_tag.to_lowercase();
        if !excluded_tag.is_empty() && self.tags.contains(&excluded_tag) {
            return Err(RejectReason::OrphanedTag);
        }
        Ok(())
    }
}

fn strip_prefix_length(address: &str) -> Option<String> {
    let ip = address.split('/').next().unwrap_or_default().trim();
    (!ip.is_empty()).then(|| ip.to_owned())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(data: serde_json::Value) -> InventoryEvent {
        serde_json::from_value(json!({
            "event": "updated",
            "timestamp": "2024-03-09 17:55:33.329547+00:00",
            "model": "virtualmachine",
            "data": data,
        }))
        .unwrap()
    }

    fn full_vm() -> serde_json::Value {
        json!({
            "name": "web-cp01",
            "status": { "value": "active", "label": "Active" },
            "primary_ip": { "address": "10.20.30.40/24" },
            "platform": { "name": "Ubuntu 22.04" },
            "tags": [{ "name": "Uniq" }, { "name": "cPanel" }],
            "custom_fields": { "vcsa_vm_guest_hostname": "web-cp01.example.com" },
            "cluster": { "name": "Prod-A" },
            "site": { "name": "Pluto-vCenter" }
        })
    }

    #[test]
    fn normalizes_full_payload() {
        let record = InventoryRecord::from_event(&event(full_vm()));

        assert_eq!(record.ip_address.as_deref(), Some("10.20.30.40"));
        assert_eq!(record.visible_name, "web-cp01");
        assert_eq!(record.host_name.as_deref(), Some("web-cp01.example.com"));
        assert_eq!(record.platform, "ubuntu 22.04");
        assert!(record.tags.contains("uniq"));
        assert!(record.tags.contains("cpanel"));
        assert_eq!(record.status, "active");
        assert_eq!(record.cluster_name.as_deref(), Some("Prod-A"));
        assert_eq!(record.site_name.as_deref(), Some("Pluto-vCenter"));
    }

    #[test]
    fn optional_fields_take_named_defaults() {
        let record = InventoryRecord::from_event(&event(json!({
            "name": "bare-vm",
            "status": "Active",
            "primary_ip": null,
            "platform": null,
            "custom_fields": { "vcsa_vm_guest_hostname": null },
            "cluster": null,
            "site": null
        })));

        assert_eq!(record.ip_address, None);
        assert_eq!(record.host_name, None);
        assert_eq!(record.effective_host_name(), "bare-vm");
        assert_eq!(record.platform, "");
        assert!(record.tags.is_empty());
        assert_eq!(record.status, "active");
        assert_eq!(record.cluster_name, None);
    }

    #[test]
    fn malformed_payloads_are_rejected() {
        let bodies: [&[u8]; 4] = [
            b"not json",
            br#"{"event":"updated"}"#,
            br#"{"data":{"status":{"value":"active"}}}"#,
            br#"{"data":{"name":"x"}}"#,
        ];
        for body in bodies {
            let err = InventoryEvent::from_slice(body).unwrap_err();
            assert_eq!(err.kind(), "malformed_input");
        }
    }

    #[test]
    fn parses_netbox_timestamp() {
        let ev = event(full_vm());
        let ts = ev.timestamp().unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-09T17:55:33.329547+00:00");
    }

    #[test]
    fn admission_order() {
        let policy = Policy::default();
        let base = InventoryRecord::from_event(&event(full_vm()));
        assert_eq!(base.admit(&policy), Ok(()));

        let inactive = InventoryRecord {
            status: "offline".into(),
            ip_address: None,
            ..base.clone()
        };
        assert_eq!(inactive.admit(&policy), Err(RejectReason::Inactive));

        let no_ip = InventoryRecord {
            ip_address: None,
            ..base.clone()
        };
        assert_eq!(no_ip.admit(&policy), Err(RejectReason::MissingAddress));

        let test_cluster = InventoryRecord {
            cluster_name: Some("QA-Test-Cluster".into()),
            ..base.clone()
        };
        assert_eq!(
            test_cluster.admit(&policy),
            Err(RejectReason::ExcludedCluster)
        );

        let mut orphaned = base;
        orphaned.tags.insert("orphaned".into());
        assert_eq!(orphaned.admit(&policy), Err(RejectReason::OrphanedTag));
    }

    #[test]
    fn empty_markers_disable_admission_checks() {
        let policy = Policy {
            excluded_name_marker: String::new(),
            excluded_cluster_marker: String::new(),
            excluded_tag: String::new(),
        };
        let mut record = InventoryRecord::from_event(&event(full_vm()));
        record.cluster_name = Some("Prod".into());
        record.tags.insert(String::new());

        assert_eq!(record.admit(&policy), Ok(()));
    }
}
