//! `hostsync classify`: run admission, classification and proxy selection
//! on a saved webhook payload.

use std::io::Read;

use serde::Serialize;

use hostsync_config::Config;
use hostsync_core::{InventoryEvent, InventoryRecord, MonitoringProfile, classify, select_proxy};

use crate::cli::{ClassifyArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Report {
    record: InventoryRecord,
    host_name: String,
    profile: MonitoringProfile,
    proxy: Option<String>,
}

pub fn handle(args: &ClassifyArgs, cfg: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let body = if args.payload.as_os_str() == "-" {
        let mut buf = Vec::new();
        std::io::stdin().read_to_end(&mut buf)?;
        buf
    } else {
        std::fs::read(&args.payload)?
    };

    let event = InventoryEvent::from_slice(&body)?;
    let record = InventoryRecord::from_event(&event);
    let profile = classify(&record, &cfg.policy.rules());
    let proxy = profile
        .is_eligible()
        .then(|| select_proxy(&record, &cfg.proxies))
        .flatten();

    let report = Report {
        host_name: record.effective_host_name().to_owned(),
        record,
        profile,
        proxy,
    };
    output::print_output(&output::render(global.output, &report)?, global.quiet);
    Ok(())
}
