//! `hostsync check`: verify connectivity and reference data.

use std::collections::BTreeMap;

use serde::Serialize;

use hostsync_config::Config;
use hostsync_core::{RefKind, ZabbixDirectory};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Report<'a> {
    url: String,
    templates: BTreeMap<&'a str, &'a str>,
    groups: BTreeMap<&'a str, &'a str>,
    missing_templates: Vec<&'a str>,
    missing_groups: Vec<&'a str>,
}

pub async fn handle(cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let bridge = hostsync_config::to_bridge_config(cfg)?;
    let url = bridge.zabbix.url.to_string();

    let directory = ZabbixDirectory::connect(&bridge.zabbix)
        .await
        .map_err(|e| CliError::ConnectionFailed {
            url: url.clone(),
            message: e.to_string(),
        })?;
    let loaded = directory.load_reference_data(&bridge.reference).await;
    directory.disconnect().await;
    let refs = loaded.map_err(|e| CliError::ConnectionFailed {
        url: url.clone(),
        message: e.to_string(),
    })?;

    let report = Report {
        url,
        templates: refs.entries(RefKind::Template).into_iter().collect(),
        groups: refs.entries(RefKind::Group).into_iter().collect(),
        missing_templates: refs.missing(RefKind::Template, &bridge.reference.templates),
        missing_groups: refs.missing(RefKind::Group, &bridge.reference.groups),
    };
    output::print_output(&output::render(global.output, &report)?, global.quiet);

    let missing: Vec<&str> = report
        .missing_templates
        .iter()
        .chain(&report.missing_groups)
        .copied()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(CliError::IncompleteReference {
            count: missing.len(),
            names: missing.join(", "),
        })
    }
}
