// ── Reference data cache ──
//
// Name -> identifier maps for templates and host groups. Loaded once at
// startup, then shared read-only behind an `Arc`.

use std::collections::HashMap;

use hostsync_api::ZabbixClient;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ReferenceNames;
use crate::error::RefKind;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceData {
    templates: HashMap<String, String>,
    groups: HashMap<String, String>,
}

impl ReferenceData {
    pub fn new(
        templates: impl IntoIterator<Item = (String, String)>,
        groups: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            templates: templates.into_iter().collect(),
            groups: groups.into_iter().collect(),
        }
    }

    /// Fetch identifiers for every configured name.
    ///
    /// Names the server does not know are logged and left out; resolving
    /// them later fails with `UnresolvedReferenceName`.
    pub async fn load(
        client: &ZabbixClient,
        names: &ReferenceNames,
    ) -> Result<Self, hostsync_api::Error> {
        let templates = client.templates_by_name(&names.templates).await?;
        let groups = client.groups_by_name(&names.groups).await?;

        let data = Self::new(
            templates.into_iter().map(|t| (t.name, t.templateid)),
            groups.into_iter().map(|g| (g.name, g.groupid)),
        );

        for name in data.missing(RefKind::Template, &names.templates) {
            warn!(kind = "template", name, "reference name not found in Zabbix");
        }
        for name in data.missing(RefKind::Group, &names.groups) {
            warn!(kind = "group", name, "reference name not found in Zabbix");
        }

        info!(
            templates = data.templates.len(),
            groups = data.groups.len(),
            "reference data loaded"
        );
        Ok(data)
    }

    pub fn template_id(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }

    pub fn group_id(&self, name: &str) -> Option<&str> {
        self.groups.get(name).map(String::as_str)
    }

    pub fn id(&self, kind: RefKind, name: &str) -> Option<&str> {
        match kind {
            RefKind::Template => self.template_id(name),
            RefKind::Group => self.group_id(name),
        }
    }

    /// The subset of `wanted` with no known identifier.
    pub fn missing<'a>(&self, kind: RefKind, wanted: &'a [String]) -> Vec<&'a str> {
        wanted
            .iter()
            .map(String::as_str)
            .filter(|name| self.id(kind, name).is_none())
            .collect()
    }

    /// Sorted `(name, id)` pairs, for display.
    pub fn entries(&self, kind: RefKind) -> Vec<(&str, &str)> {
        let map = match kind {
            RefKind::Template => &self.templates,
            RefKind::Group => &self.groups,
        };
        let mut entries: Vec<_> = map.iter().map(|(n, id)| (n.as_str(), id.as_str())).collect();
        entries.sort_unstable();
        entries
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use hostsync_api::TransportConfig;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": result,
            "id": 1
        }))
    }

    #[test]
    fn lookup_by_kind() {
        let data = ReferenceData::new(
            [("Template OS Linux".to_string(), "10001".to_string())],
            [("Uniq".to_string(), "31".to_string())],
        );

        assert_eq!(data.id(RefKind::Template, "Template OS Linux"), Some("10001"));
        assert_eq!(data.id(RefKind::Group, "Uniq"), Some("31"));
        assert_eq!(data.id(RefKind::Group, "Template OS Linux"), None);

        let wanted = vec!["Uniq".to_string(), "Clients".to_string()];
        assert_eq!(data.missing(RefKind::Group, &wanted), vec!["Clients"]);
    }

    #[tokio::test]
    async fn load_keeps_what_the_server_knows() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "user.login" })))
            .respond_with(rpc_result(json!("token")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "template.get" })))
            .respond_with(rpc_result(json!([
                { "templateid": "10001", "name": "Template OS Linux" }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "hostgroup.get" })))
            .respond_with(rpc_result(json!([
                { "groupid": "2", "name": "Linux servers" },
                { "groupid": "31", "name": "Uniq" }
            ])))
            .mount(&server)
            .await;

        let url = format!("{}/api_jsonrpc.php", server.uri()).parse().unwrap();
        let client = ZabbixClient::new(url, &TransportConfig::default()).unwrap();
        client
            .login("svc", &SecretString::from("pw".to_string()))
            .await
            .unwrap();

        let data = ReferenceData::load(&client, &ReferenceNames::default())
            .await
            .unwrap();

        assert_eq!(data.template_id("Template OS Linux"), Some("10001"));
        assert_eq!(data.template_id("Template OS Windows"), None);
        assert_eq!(
            data.entries(RefKind::Group),
            vec![("Linux servers", "2"), ("Uniq", "31")]
        );
    }
}
