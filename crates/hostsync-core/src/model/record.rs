// ── Monitoring record ──
//
// The existing state of a host in Zabbix. Identity (`id`) never changes;
// names and memberships may be rewritten by reconciliation.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// A set of named references (templates or host groups).
///
/// Keyed by name, carrying the system-assigned identifier when known.
/// Entries introduced by reconciliation start without one and are resolved
/// against the reference cache before the update is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RefSet(IndexMap<String, Option<String>>);

impl RefSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set of unresolved entries from names.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a String>) -> Self {
        Self(names.into_iter().map(|n| (n.clone(), None)).collect())
    }

    pub fn insert(&mut self, name: impl Into<String>, id: Option<String>) {
        self.0.insert(name.into(), id);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.0.iter().map(|(n, id)| (n.as_str(), id.as_deref()))
    }

    /// Order-independent comparison of the name set against `desired`.
    pub fn same_names(&self, desired: &IndexSet<String>) -> bool {
        self.0.len() == desired.len() && desired.iter().all(|n| self.0.contains_key(n))
    }
}

impl<N: Into<String>, I: Into<String>> FromIterator<(N, I)> for RefSet {
    fn from_iter<T: IntoIterator<Item = (N, I)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(n, id)| (n.into(), Some(id.into())))
                .collect(),
        )
    }
}

/// A host as it currently exists in Zabbix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonitoringRecord {
    pub id: String,
    pub host_name: String,
    pub visible_name: String,
    pub ip_address: String,
    pub groups: RefSet,
    pub templates: RefSet,
}
