// ── Diff & reconcile ──
//
// Compares a host's current Zabbix state with the desired profile and
// produces the merged target record. Pure; the caller decides whether to
// send anything.

use serde::Serialize;

use crate::model::{InventoryRecord, MonitoringProfile, MonitoringRecord, RefSet};

/// A linked template with this name is never unlinked by reconciliation.
/// It is often attached by hand and losing it would silently stop backups
/// from being monitored.
pub const GUARDED_TEMPLATE: &str = "template cPanel backup";

/// One field that reconciliation rewrote, for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldChange {
    HostName { from: String, to: String },
    VisibleName { from: String, to: String },
    Templates { from: Vec<String>, to: Vec<String> },
    Groups { from: Vec<String>, to: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileResult {
    pub changed: bool,
    pub merged: MonitoringRecord,
    pub templates_changed: bool,
    pub groups_changed: bool,
    pub changes: Vec<FieldChange>,
}

/// Merge the desired state into `existing`.
///
/// - `host_name` and `visible_name` follow the inventory by exact string
///   comparison.
/// - The template set is replaced when the names differ, unless the
///   existing set contains [`GUARDED_TEMPLATE`].
/// - The group set is replaced whenever the names differ.
///
/// Replaced sets carry names only; identifiers are resolved by
/// [`crate::apply::resolve_update`]. Feeding `merged` back in always yields
/// `changed == false`.
pub fn reconcile(
    existing: &MonitoringRecord,
    profile: &MonitoringProfile,
    inv: &InventoryRecord,
) -> ReconcileResult {
    let mut merged = existing.clone();
    let mut changes = Vec::new();

    let host_name = inv.effective_host_name();
    if existing.host_name != host_name {
        changes.push(FieldChange::HostName {
            from: existing.host_name.clone(),
            to: host_name.to_owned(),
        });
        host_name.clone_into(&mut merged.host_name);
    }

    if existing.visible_name != inv.visible_name {
        changes.push(FieldChange::VisibleName {
            from: existing.visible_name.clone(),
            to: inv.visible_name.clone(),
        });
        merged.visible_name.clone_from(&inv.visible_name);
    }

    let templates_changed = !existing.templates.same_names(&profile.templates)
        && !existing.templates.contains(GUARDED_TEMPLATE);
    if templates_changed {
        changes.push(FieldChange::Templates {
            from: owned_names(&existing.templates),
            to: profile.templates.iter().cloned().collect(),
        });
        merged.templates = RefSet::from_names(&profile.templates);
    }

    let groups_changed = !existing.groups.same_names(&profile.groups);
    if groups_changed {
        changes.push(FieldChange::Groups {
            from: owned_names(&existing.groups),
            to: profile.groups.iter().cloned().collect(),
        });
        merged.groups = RefSet::from_names(&profile.groups);
    }

    ReconcileResult {
        changed: !changes.is_empty(),
        merged,
        templates_changed,
        groups_changed,
        changes,
    }
}

fn owned_names(set: &RefSet) -> Vec<String> {
    set.names().map(str::to_owned).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use indexmap::IndexSet;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::classify::classify;
    use crate::config::Policy;

    fn inventory(platform: &str, name: &str, host: &str, tags: &[&str]) -> InventoryRecord {
        InventoryRecord {
            ip_address: Some("10.0.0.5".into()),
            visible_name: name.into(),
            host_name: Some(host.into()),
            platform: platform.into(),
            tags: tags.iter().map(|t| (*t).to_string()).collect::<BTreeSet<_>>(),
            status: "active".into(),
            cluster_name: None,
            site_name: None,
        }
    }

    fn existing(
        host: &str,
        name: &str,
        templates: &[(&str, &str)],
        groups: &[(&str, &str)],
    ) -> MonitoringRecord {
        MonitoringRecord {
            id: "10501".into(),
            host_name: host.into(),
            visible_name: name.into(),
            ip_address: "10.0.0.5".into(),
            templates: templates.iter().copied().collect(),
            groups: groups.iter().copied().collect(),
        }
    }

    #[test]
    fn identical_state_is_a_no_op() {
        let inv = inventory("ubuntu", "web01", "web01.example.com", &[]);
        let profile = classify(&inv, &Policy::default());
        let current = existing(
            "web01.example.com",
            "web01",
            &[("Template OS Linux", "10001")],
            &[("Linux servers", "2")],
        );

        let result = reconcile(&current, &profile, &inv);

        assert!(!result.changed);
        assert!(result.changes.is_empty());
        assert_eq!(result.merged, current);
    }

    #[test]
    fn scalar_drift_is_adopted_verbatim() {
        let inv = inventory("ubuntu", "web01", "web01.example.com", &[]);
        let profile = classify(&inv, &Policy::default());
        let current = existing(
            "WEB01.example.com",
            "web01 ",
            &[("Template OS Linux", "10001")],
            &[("Linux servers", "2")],
        );

        let result = reconcile(&current, &profile, &inv);

        assert!(result.changed);
        assert!(!result.templates_changed);
        assert!(!result.groups_changed);
        assert_eq!(result.merged.host_name, "web01.example.com");
        assert_eq!(result.merged.visible_name, "web01");
        assert_eq!(result.changes.len(), 2);
        // Unchanged sets keep their identifiers.
        assert_eq!(
            result.merged.templates.iter().collect::<Vec<_>>(),
            vec![("Template OS Linux", Some("10001"))]
        );
    }

    #[test]
    fn missing_host_name_falls_back_to_visible_name() {
        let mut inv = inventory("ubuntu", "web01", "", &[]);
        inv.host_name = None;
        let profile = classify(&inv, &Policy::default());
        let current = existing(
            "web01",
            "web01",
            &[("Template OS Linux", "10001")],
            &[("Linux servers", "2")],
        );

        assert!(!reconcile(&current, &profile, &inv).changed);
    }

    #[test]
    fn replaced_sets_drop_identifiers() {
        let inv = inventory("ubuntu", "web01", "web01", &["uniq"]);
        let profile = classify(&inv, &Policy::default());
        let current = existing(
            "web01",
            "web01",
            &[("Template OS Windows", "10081")],
            &[("Linux servers", "2")],
        );

        let result = reconcile(&current, &profile, &inv);

        assert!(result.templates_changed);
        assert!(result.groups_changed);
        assert_eq!(
            result.merged.templates.iter().collect::<Vec<_>>(),
            vec![("Template OS Linux", None)]
        );
        assert_eq!(
            result.merged.groups.iter().collect::<Vec<_>>(),
            vec![("Linux servers", None), ("Uniq", None)]
        );
        assert_eq!(
            result.changes[1],
            FieldChange::Groups {
                from: vec!["Linux servers".into()],
                to: vec!["Linux servers".into(), "Uniq".into()],
            }
        );
    }

    #[test]
    fn guarded_template_is_never_removed() {
        let inv = inventory("windows server 2019", "WIN-APP01", "win-app01", &[]);
        let profile = classify(&inv, &Policy::default());
        assert!(!profile.templates.contains(GUARDED_TEMPLATE));

        let current = existing(
            "win-app01",
            "WIN-APP01",
            &[("Template OS Linux", "10001"), (GUARDED_TEMPLATE, "10420")],
            &[("Allwindows", "5"), ("Windows General", "6")],
        );

        let result = reconcile(&current, &profile, &inv);

        assert!(!result.templates_changed);
        assert!(!result.changed);
        assert!(result.merged.templates.contains(GUARDED_TEMPLATE));
    }

    #[test]
    fn reconcile_reaches_a_fixed_point() {
        let cases = [
            inventory("ubuntu", "web-cp01", "web-cp01.example.com", &["uniq"]),
            inventory("windows 2016", "WIN-SQL", "win-sql", &["cpanel"]),
            inventory("centos", "mail", "mail.example.com", &[]),
        ];
        let starts = [
            existing("old", "old", &[], &[]),
            existing("old", "old", &[(GUARDED_TEMPLATE, "10420")], &[("Clients", "9")]),
            existing(
                "mail.example.com",
                "mail",
                &[("Template OS Linux", "10001")],
                &[("Linux servers", "2")],
            ),
        ];

        for inv in &cases {
            let profile = classify(inv, &Policy::default());
            for start in &starts {
                let first = reconcile(start, &profile, inv);
                let second = reconcile(&first.merged, &profile, inv);
                assert!(!second.changed, "not a fixed point for {}", inv.visible_name);
                assert_eq!(second.merged, first.merged);
            }
        }
    }

    #[test]
    fn group_verdict_ignores_order() {
        let inv = inventory("windows", "WIN-APP01", "win-app01", &["uniq"]);
        let mut profile = classify(&inv, &Policy::default());
        let current = existing(
            "win-app01",
            "WIN-APP01",
            &[("Template OS Windows", "10081")],
            &[("Uniq", "31"), ("Windows General", "6"), ("Allwindows", "5")],
        );

        let forward = reconcile(&current, &profile, &inv).groups_changed;

        let reversed: IndexSet<String> = profile.groups.iter().rev().cloned().collect();
        profile.groups = reversed;
        let backward = reconcile(&current, &profile, &inv).groups_changed;

        assert!(!forward);
        assert_eq!(forward, backward);
    }
}
