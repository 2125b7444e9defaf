// Reference data endpoints
//
// Template and host group identifiers looked up by exact name. Used once
// at startup to build the name -> id cache.

use serde_json::json;
use tracing::debug;

use crate::client::ZabbixClient;
use crate::error::Error;
use crate::models::{GroupRef, TemplateRef};

impl ZabbixClient {
    /// Fetch templates whose technical name is one of `names`.
    ///
    /// `POST template.get` with `filter.host`
    pub async fn templates_by_name(&self, names: &[String]) -> Result<Vec<TemplateRef>, Error> {
        debug!(count = names.len(), "fetching template ids");
        self.call(
            "template.get",
            &json!({
                "output": ["templateid", "name"],
                "filter": { "host": names },
            }),
        )
        .await
    }

    /// Fetch host groups whose name is one of `names`.
    ///
    /// `POST hostgroup.get` with `filter.name`
    pub async fn groups_by_name(&self, names: &[String]) -> Result<Vec<GroupRef>, Error> {
        debug!(count = names.len(), "fetching host group ids");
        self.call(
            "hostgroup.get",
            &json!({
                "output": ["groupid", "name"],
                "filter": { "name": names },
            }),
        )
        .await
    }
}
