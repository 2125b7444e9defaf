// ── Event pipeline ──
//
// Drives one inventory event from receipt to a terminal outcome:
//
//   Received -> Classified -> Rejected
//                          -> LookupPending -> NotFound -> Provisioning -> Done
//                                           -> Found -> Reconciling -> NoChange
//                                                                   -> Updating -> Done
//
// Any error ends the event in Failed. Nothing persists between events.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::apply::{Applied, apply};
use crate::classify::{classify, select_proxy};
use crate::config::{BridgeConfig, Policy, ProxyRule};
use crate::directory::{HostDirectory, Lookup};
use crate::error::SyncError;
use crate::model::{InventoryEvent, InventoryRecord, MonitoringProfile, RejectReason};
use crate::provision::{ProvisionRequest, Provisioner};
use crate::reconcile::reconcile;
use crate::reference::ReferenceData;

/// Terminal result of a successfully processed event.
#[derive(Debug, Clone, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    /// Well-formed but not monitored.
    Rejected(RejectReason),
    /// The host already matches the desired state; nothing was sent.
    NoChange { hostid: String },
    Updated(Applied),
    /// The host did not exist and was handed to provisioning.
    Provisioned(ProvisionRequest),
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// One-line description for responses and logs.
    pub fn detail(&self) -> String {
        match self {
            Self::Rejected(reason) => format!("{reason}: {}", reason.describe()),
            Self::NoChange { hostid } => format!("host {hostid} already up to date"),
            Self::Updated(applied) => format!(
                "host {} updated (templates changed: {}, groups changed: {})",
                applied.hostid, applied.templates_changed, applied.groups_changed
            ),
            Self::Provisioned(req) => format!("host {} provisioned", req.visible_name),
        }
    }
}

#[derive(Debug, Clone, Copy, strum::Display)]
#[strum(serialize_all = "snake_case")]
enum Stage {
    Classified,
    LookupPending,
    Provisioning,
    Reconciling,
    Updating,
}

// ── EventGate ────────────────────────────────────────────────────

/// Bounds concurrent events and serializes events for the same address.
struct EventGate {
    permits: Semaphore,
    keys: DashMap<String, Arc<Mutex<()>>>,
}

impl EventGate {
    fn new(max_concurrent: usize) -> Self {
        Self {
            permits: Semaphore::new(max_concurrent.max(1)),
            keys: DashMap::new(),
        }
    }

    async fn run<F: Future>(&self, key: &str, work: F) -> F::Output {
        let lock = Arc::clone(self.keys.entry(key.to_owned()).or_default().value());
        let output = {
            let _key = lock.lock().await;
            // The semaphore is never closed.
            let _permit = self.permits.acquire().await.ok();
            work.await
        };
        drop(lock);
        self.keys.remove_if(key, |_, m| Arc::strong_count(m) == 1);
        output
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.keys.len()
    }
}

// ── Pipeline ─────────────────────────────────────────────────────

pub struct Pipeline {
    directory: Arc<dyn HostDirectory>,
    provisioner: Arc<dyn Provisioner>,
    refs: Arc<ReferenceData>,
    policy: Policy,
    proxies: Vec<ProxyRule>,
    gate: EventGate,
}

impl Pipeline {
    /// A pipeline with default policy and proxy rules that runs one event
    /// at a time.
    pub fn new(
        directory: Arc<dyn HostDirectory>,
        provisioner: Arc<dyn Provisioner>,
        refs: Arc<ReferenceData>,
    ) -> Self {
        Self {
            directory,
            provisioner,
            refs,
            policy: Policy::default(),
            proxies: ProxyRule::defaults(),
            gate: EventGate::new(1),
        }
    }

    /// Take policy, proxy rules and concurrency from `config`.
    #[must_use]
    pub fn configured(mut self, config: &BridgeConfig) -> Self {
        self.policy = config.policy.clone();
        self.proxies = config.proxies.clone();
        self.gate = EventGate::new(config.max_concurrent_events);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_proxies(mut self, proxies: Vec<ProxyRule>) -> Self {
        self.proxies = proxies;
        self
    }

    #[must_use]
    pub fn with_max_concurrent_events(mut self, max: usize) -> Self {
        self.gate = EventGate::new(max);
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Reconcile one event. Rejections are `Ok`; every `Err` abandons the
    /// event without retry.
    pub async fn handle(&self, event: &InventoryEvent) -> Result<Outcome, SyncError> {
        let record = InventoryRecord::from_event(event);
        let span = info_span!(
            "event",
            id = %Uuid::new_v4(),
            name = %record.visible_name,
            ip = record.ip_address.as_deref().unwrap_or("-"),
            kind = event.event.as_deref().unwrap_or("-"),
        );

        async {
            debug!(timestamp = ?event.timestamp(), "event received");
            let result = self.run(&record).await;
            match &result {
                Ok(outcome) => info!(outcome = outcome.kind(), "{}", outcome.detail()),
                Err(e) if e.is_operator_attention() => {
                    warn!(error = %e, kind = e.kind(), operator_attention = true, "event failed");
                }
                Err(e) => warn!(error = %e, kind = e.kind(), "event failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, record: &InventoryRecord) -> Result<Outcome, SyncError> {
        let profile = classify(record, &self.policy);
        debug!(stage = %Stage::Classified, profile = ?profile);
        if let Some(reason) = profile.rejection() {
            return Ok(Outcome::Rejected(reason));
        }
        let Some(ip) = record.ip_address.as_deref() else {
            return Ok(Outcome::Rejected(RejectReason::MissingAddress));
        };

        self.gate
            .run(ip, self.sync_host(ip, record, &profile))
            .await
    }

    async fn sync_host(
        &self,
        ip: &str,
        record: &InventoryRecord,
        profile: &MonitoringProfile,
    ) -> Result<Outcome, SyncError> {
        debug!(stage = %Stage::LookupPending);
        match self.directory.find_by_ip(ip).await? {
            Lookup::NotFound => {
                debug!(stage = %Stage::Provisioning);
                let request = ProvisionRequest {
                    host_name: record.effective_host_name().to_owned(),
                    visible_name: record.visible_name.clone(),
                    proxy_address: select_proxy(record, &self.proxies),
                    ip_address: ip.to_owned(),
                    templates: profile.templates.iter().cloned().collect(),
                    groups: profile.groups.iter().cloned().collect(),
                };
                self.provisioner.provision(&request).await?;
                Ok(Outcome::Provisioned(request))
            }
            Lookup::Found(existing) => {
                debug!(stage = %Stage::Reconciling, hostid = %existing.id);
                let result = reconcile(&existing, profile, record);
                if !result.changed {
                    return Ok(Outcome::NoChange {
                        hostid: existing.id,
                    });
                }

                debug!(stage = %Stage::Updating, changes = ?result.changes);
                let applied = apply(
                    self.directory.as_ref(),
                    &self.refs,
                    &result.merged,
                    result.templates_changed,
                    result.groups_changed,
                )
                .await?;
                Ok(Outcome::Updated(applied))
            }
        }
    }
}
