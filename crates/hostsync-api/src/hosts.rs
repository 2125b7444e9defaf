// Host endpoints
//
// Lookup by interface address and in-place update. Host creation is not
// exposed here: new hosts are materialized by the provisioning tool.

use serde_json::json;
use tracing::debug;

use crate::client::ZabbixClient;
use crate::error::Error;
use crate::models::{HostIds, HostUpdate, ZabbixHost};

impl ZabbixClient {
    /// List hosts with an interface bound to `ip`, including their group
    /// memberships and linked templates.
    ///
    /// `POST host.get` with `filter.ip`, `selectGroups`, `selectParentTemplates`
    pub async fn hosts_by_ip(&self, ip: &str) -> Result<Vec<ZabbixHost>, Error> {
        debug!(ip, "looking up hosts by address");
        self.call(
            "host.get",
            &json!({
                "output": ["hostid", "host", "name"],
                "selectParentTemplates": ["templateid", "name"],
                "selectGroups": ["groupid", "name"],
                "filter": { "ip": ip },
            }),
        )
        .await
    }

    /// Rewrite a host's names, linked templates and groups.
    ///
    /// `POST host.update`; returns the updated host ids.
    pub async fn update_host(&self, update: &HostUpdate) -> Result<Vec<String>, Error> {
        debug!(hostid = %update.hostid, "updating host");
        let ids: HostIds = self.call("host.update", update).await?;
        Ok(ids.hostids)
    }
}
