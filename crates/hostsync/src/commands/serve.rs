//! `hostsync serve`: log in, load reference data, run the receiver.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use hostsync_config::Config;
use hostsync_core::{AnsibleProvisioner, Pipeline, SyncError, ZabbixDirectory};

use crate::cli::ServeArgs;
use crate::error::CliError;
use crate::server;

pub async fn handle(args: &ServeArgs, cfg: &Config) -> Result<(), CliError> {
    let address = match args.listen.as_deref() {
        Some(listen) => hostsync_config::parse_listen_addr(listen)?,
        None => cfg.listen_addr()?,
    };
    let bridge = hostsync_config::to_bridge_config(cfg)?;

    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| CliError::Bind {
            address: address.to_string(),
            source,
        })?;

    let connection_failed = |e: SyncError| CliError::ConnectionFailed {
        url: bridge.zabbix.url.to_string(),
        message: e.to_string(),
    };
    let directory = Arc::new(
        ZabbixDirectory::connect(&bridge.zabbix)
            .await
            .map_err(connection_failed)?,
    );
    let refs = match directory.load_reference_data(&bridge.reference).await {
        Ok(refs) => Arc::new(refs),
        Err(e) => {
            directory.disconnect().await;
            return Err(connection_failed(e));
        }
    };

    let provisioner = Arc::new(AnsibleProvisioner::new(bridge.provisioning.clone()));
    let pipeline =
        Arc::new(Pipeline::new(directory.clone(), provisioner, refs).configured(&bridge));
    info!(
        max_concurrent_events = bridge.max_concurrent_events,
        "pipeline ready"
    );

    let served = server::serve(listener, pipeline, shutdown_signal()).await;

    info!("shutting down");
    directory.disconnect().await;
    served.map_err(CliError::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
