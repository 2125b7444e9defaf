// ── API-to-domain type conversions ──
//
// Bridges raw `hostsync_api` response types into `hostsync_core::model`
// types. `host.get` is filtered by address, so the address is supplied by
// the caller instead of being selected from the host's interfaces.

use hostsync_api::{GroupRef, TemplateRef, ZabbixHost};

use crate::model::{MonitoringRecord, RefSet};

impl MonitoringRecord {
    /// Build the domain record for a host returned by an address lookup.
    pub fn from_host(host: ZabbixHost, ip_address: &str) -> Self {
        Self {
            id: host.hostid,
            host_name: host.host,
            visible_name: host.name,
            ip_address: ip_address.to_owned(),
            groups: host.groups.into_iter().collect(),
            templates: host.parent_templates.into_iter().collect(),
        }
    }
}

impl FromIterator<GroupRef> for RefSet {
    fn from_iter<T: IntoIterator<Item = GroupRef>>(iter: T) -> Self {
        iter.into_iter().map(|g| (g.name, g.groupid)).collect()
    }
}

impl FromIterator<TemplateRef> for RefSet {
    fn from_iter<T: IntoIterator<Item = TemplateRef>>(iter: T) -> Self {
        iter.into_iter().map(|t| (t.name, t.templateid)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn host_with_memberships() {
        let host: ZabbixHost = serde_json::from_value(json!({
            "hostid": "10501",
            "host": "web-cp01.example.com",
            "name": "web-cp01",
            "groups": [{ "groupid": "2", "name": "Linux servers" }],
            "parentTemplates": [
                { "templateid": "10001", "name": "Template OS Linux" },
                { "templateid": "10420", "name": "template cPanel backup" }
            ]
        }))
        .unwrap();

        let record = MonitoringRecord::from_host(host, "10.0.0.5");

        assert_eq!(record.id, "10501");
        assert_eq!(record.host_name, "web-cp01.example.com");
        assert_eq!(record.visible_name, "web-cp01");
        assert_eq!(record.ip_address, "10.0.0.5");
        assert_eq!(
            record.templates.iter().collect::<Vec<_>>(),
            vec![
                ("Template OS Linux", Some("10001")),
                ("template cPanel backup", Some("10420")),
            ]
        );
        assert_eq!(
            record.groups.iter().collect::<Vec<_>>(),
            vec![("Linux servers", Some("2"))]
        );
    }
}
