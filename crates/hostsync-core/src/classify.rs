// ── Classification ──
//
// Pure mapping from an inventory record to the desired monitoring
// profile. No I/O; identical input always yields an identical profile.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::{Policy, ProxyRule};
use crate::model::{InventoryRecord, MonitoringProfile, OsFamily, RejectReason};

pub const TEMPLATE_WINDOWS: &str = "Template OS Windows";
pub const TEMPLATE_LINUX: &str = "Template OS Linux";
pub const TEMPLATE_CPANEL_BACKUP: &str = "template cPanel backup";

pub const GROUP_ALL_WINDOWS: &str = "Allwindows";
pub const GROUP_WINDOWS_GENERAL: &str = "Windows General";
pub const GROUP_LINUX_SERVERS: &str = "Linux servers";
pub const GROUP_CPANELS: &str = "cPanels";
pub const GROUP_UNIQ: &str = "Uniq";

const LINUX_FAMILY: [&str; 4] = ["linux", "centos", "debian", "ubuntu"];

const TAG_UNIQ: &str = "uniq";
const TAG_CPANEL: &str = "cpanel";

static CPANEL_SERIAL: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"cp\d{2}").unwrap()
});

/// Decide whether `record` is monitored and with which templates and
/// host groups.
///
/// Admission runs first (see [`InventoryRecord::admit`]), so an inactive
/// record is rejected whatever its other fields say. Then, in order: the
/// excluded business-unit marker in the visible name, the OS family from
/// the platform (first match wins), and finally tag-driven additions.
pub fn classify(record: &InventoryRecord, policy: &Policy) -> MonitoringProfile {
    if let Err(reason) = record.admit(policy) {
        return MonitoringProfile::rejected(reason);
    }

    let name = record.visible_name.to_lowercase();
    let marker = policy.excluded_name_marker.to_lowercase();
    if !marker.is_empty() && name.contains(&marker) {
        return MonitoringProfile::rejected(RejectReason::ExcludedName);
    }

    let Some(family) = os_family(&record.platform) else {
        return MonitoringProfile::rejected(RejectReason::UnrecognizedPlatform);
    };

    let mut profile = MonitoringProfile::eligible(family);
    match family {
        OsFamily::Windows => {
            profile.add_template(TEMPLATE_WINDOWS);
            profile.add_group(GROUP_ALL_WINDOWS);
            profile.add_group(GROUP_WINDOWS_GENERAL);
        }
        OsFamily::Linux => {
            profile.add_template(TEMPLATE_LINUX);
            profile.add_group(GROUP_LINUX_SERVERS);
            if looks_like_cpanel(&name) {
                profile.add_template(TEMPLATE_CPANEL_BACKUP);
                profile.add_group(GROUP_CPANELS);
            }
        }
    }

    if record.tags.contains(TAG_UNIQ) {
        profile.add_group(GROUP_UNIQ);
    }
    if record.tags.contains(TAG_CPANEL) {
        profile.add_template(TEMPLATE_CPANEL_BACKUP);
        profile.add_group(GROUP_CPANELS);
    }

    profile
}

fn os_family(platform: &str) -> Option<OsFamily> {
    if platform.contains("windows") {
        Some(OsFamily::Windows)
    } else if LINUX_FAMILY.iter().any(|os| platform.contains(os)) {
        Some(OsFamily::Linux)
    } else {
        None
    }
}

/// cPanel naming convention: ` cp `, `cpanel`, or `cp` followed by two
/// digits. Expects a lower-cased name.
fn looks_like_cpanel(name: &str) -> bool {
    name.contains(" cp ") || name.contains("cpanel") || CPANEL_SERIAL.is_match(name)
}

/// Pick the Zabbix proxy for a new host from its address and site.
///
/// The first matching rule wins. No match yields `None`, which provisioning
/// treats as "monitored directly by the server".
pub fn select_proxy(record: &InventoryRecord, rules: &[ProxyRule]) -> Option<String> {
    let ip = record.ip_address.as_deref()?;
    let site = record.site_name.as_deref()?.to_lowercase();
    rules
        .iter()
        .find(|rule| {
            ip.starts_with(&rule.address_prefix)
                && site.contains(&rule.site_contains.to_lowercase())
        })
        .map(|rule| rule.proxy.clone())
}
