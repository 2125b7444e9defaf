// ── Monitoring profile ──
//
// The desired monitoring state derived purely from classification.

use indexmap::IndexSet;
use serde::Serialize;

/// Why an event was not reconciled.
///
/// All variants except `UnrecognizedPlatform` are policy rejections of
/// well-formed input; an unrecognized platform is reported separately
/// because it usually means the classification rules need extending.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display, strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    Inactive,
    MissingAddress,
    ExcludedCluster,
    OrphanedTag,
    ExcludedName,
    UnrecognizedPlatform,
}

impl RejectReason {
    pub fn is_policy(self) -> bool {
        !matches!(self, Self::UnrecognizedPlatform)
    }

    /// Human-readable explanation for logs and responses.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Inactive => "virtual machine is not active",
            Self::MissingAddress => "virtual machine has no primary IP address",
            Self::ExcludedCluster => "virtual machine is in an excluded cluster",
            Self::OrphanedTag => "virtual machine is tagged for decommissioning",
            Self::ExcludedName => "virtual machine belongs to an unmonitored business unit",
            Self::UnrecognizedPlatform => "no classification matches the platform",
        }
    }
}

/// Operating-system family that selected the base template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OsFamily {
    Windows,
    Linux,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "snake_case")]
pub enum Verdict {
    Eligible,
    Rejected(RejectReason),
}

/// Desired template and host group membership for one host.
///
/// Both collections are insertion-ordered sets: order is kept for the
/// wire, equality ignores it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoringProfile {
    pub templates: IndexSet<String>,
    pub groups: IndexSet<String>,
    pub os_family: Option<OsFamily>,
    pub verdict: Verdict,
}

impl MonitoringProfile {
    pub(crate) fn eligible(os_family: OsFamily) -> Self {
        Self {
            templates: IndexSet::new(),
            groups: IndexSet::new(),
            os_family: Some(os_family),
            verdict: Verdict::Eligible,
        }
    }

    pub(crate) fn rejected(reason: RejectReason) -> Self {
        Self {
            templates: IndexSet::new(),
            groups: IndexSet::new(),
            os_family: None,
            verdict: Verdict::Rejected(reason),
        }
    }

    pub fn is_eligible(&self) -> bool {
        matches!(self.verdict, Verdict::Eligible)
    }

    pub fn rejection(&self) -> Option<RejectReason> {
        match self.verdict {
            Verdict::Eligible => None,
            Verdict::Rejected(reason) => Some(reason),
        }
    }

    pub(crate) fn add_template(&mut self, name: &str) {
        self.templates.insert(name.to_owned());
    }

    pub(crate) fn add_group(&mut self, name: &str) {
        self.groups.insert(name.to_owned());
    }
}
