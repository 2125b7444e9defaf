// ── Apply ──
//
// Turns a merged record into exactly one `host.update`. Every template and
// group must resolve to an identifier first; the cache is never refreshed
// mid-run, so an unknown name abandons the event.

use serde::Serialize;
use tracing::{error, info};

use hostsync_api::{GroupId, HostUpdate, TemplateId};

use crate::directory::HostDirectory;
use crate::error::{RefKind, SyncError};
use crate::model::{MonitoringRecord, RefSet};
use crate::reference::ReferenceData;

/// A successfully applied update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Applied {
    pub hostid: String,
    pub templates_changed: bool,
    pub groups_changed: bool,
}

/// Build the `host.update` parameters for `merged`, resolving entries that
/// have no identifier yet through `refs`.
pub fn resolve_update(
    merged: &MonitoringRecord,
    refs: &ReferenceData,
) -> Result<HostUpdate, SyncError> {
    let templates = resolve(&merged.templates, RefKind::Template, refs)?
        .into_iter()
        .map(|templateid| TemplateId { templateid })
        .collect();
    let groups = resolve(&merged.groups, RefKind::Group, refs)?
        .into_iter()
        .map(|groupid| GroupId { groupid })
        .collect();

    Ok(HostUpdate {
        hostid: merged.id.clone(),
        host: merged.host_name.clone(),
        name: merged.visible_name.clone(),
        templates,
        groups,
    })
}

fn resolve(set: &RefSet, kind: RefKind, refs: &ReferenceData) -> Result<Vec<String>, SyncError> {
    set.iter()
        .map(|(name, id)| {
            id.or_else(|| refs.id(kind, name))
                .map(str::to_owned)
                .ok_or_else(|| SyncError::UnresolvedReferenceName {
                    kind,
                    name: name.to_owned(),
                })
        })
        .collect()
}

/// Resolve and send the update for `merged`.
pub async fn apply(
    directory: &dyn HostDirectory,
    refs: &ReferenceData,
    merged: &MonitoringRecord,
    templates_changed: bool,
    groups_changed: bool,
) -> Result<Applied, SyncError> {
    let update = resolve_update(merged, refs).inspect_err(|e| {
        error!(
            operator_attention = true,
            hostid = %merged.id,
            error = %e,
            "reference data is missing a name; event abandoned"
        );
    })?;

    directory.update_host(&update).await?;

    info!(
        hostid = %merged.id,
        host = %merged.host_name,
        templates_changed,
        groups_changed,
        "host updated"
    );
    Ok(Applied {
        hostid: merged.id.clone(),
        templates_changed,
        groups_changed,
    })
}
