// ── Provisioning collaborator ──
//
// New hosts are not created through the API directly: an Ansible playbook
// does it, so interfaces, proxies and macros stay defined in one place.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::config::ProvisionerConfig;
use crate::error::SyncError;

/// Longest diagnostic output carried in an error.
const MAX_OUTPUT: usize = 4096;

/// Everything provisioning needs to create one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionRequest {
    pub host_name: String,
    pub visible_name: String,
    /// `None` when the host is monitored by the server directly.
    pub proxy_address: Option<String>,
    pub ip_address: String,
    pub templates: Vec<String>,
    pub groups: Vec<String>,
}

impl ProvisionRequest {
    /// Variables handed to the playbook. An absent proxy is sent as an
    /// empty string.
    pub fn extra_vars(&self) -> serde_json::Value {
        json!({
            "host_name": self.host_name,
            "visible_name": self.visible_name,
            "proxy": self.proxy_address.as_deref().unwrap_or_default(),
            "ip": self.ip_address,
            "link_templates": self.templates,
            "host_groups": self.groups,
        })
    }
}

#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Create the host. Success or [`SyncError::ProvisioningFailure`]
    /// carrying the tool's diagnostic output; never retried.
    async fn provision(&self, request: &ProvisionRequest) -> Result<(), SyncError>;
}

// ── AnsibleProvisioner ───────────────────────────────────────────

/// Runs `<program> -e <json vars> <playbook>`.
#[derive(Debug, Clone)]
pub struct AnsibleProvisioner {
    config: ProvisionerConfig,
}

impl AnsibleProvisioner {
    pub fn new(config: ProvisionerConfig) -> Self {
        Self { config }
    }

    fn failure(request: &ProvisionRequest, status: impl Into<String>, output: String) -> SyncError {
        SyncError::ProvisioningFailure {
            host: request.visible_name.clone(),
            status: status.into(),
            output,
        }
    }
}

#[async_trait]
impl Provisioner for AnsibleProvisioner {
    async fn provision(&self, request: &ProvisionRequest) -> Result<(), SyncError> {
        let vars = request.extra_vars().to_string();
        info!(
            host = %request.visible_name,
            playbook = %self.config.playbook.display(),
            "starting provisioning playbook"
        );
        debug!(vars = %vars, "playbook variables");

        let child = Command::new(&self.config.program)
            .arg("-e")
            .arg(&vars)
            .arg(&self.config.playbook)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Self::failure(
                    request,
                    "spawn failed",
                    format!("{}: {e}", self.config.program.display()),
                )
            })?;

        let output = tokio::time::timeout(self.config.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                Self::failure(
                    request,
                    format!("timed out after {}s", self.config.timeout.as_secs()),
                    String::new(),
                )
            })?
            .map_err(|e| Self::failure(request, "wait failed", e.to_string()))?;

        if output.status.success() {
            info!(host = %request.visible_name, "host provisioned");
            return Ok(());
        }

        let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostics.push_str(&String::from_utf8_lossy(&output.stderr));
        let err = Self::failure(request, output.status.to_string(), tail(&diagnostics));
        error!(host = %request.visible_name, error = %err, "provisioning failed");
        Err(err)
    }
}

/// Last `MAX_OUTPUT` bytes of `s`, on a char boundary.
fn tail(s: &str) -> String {
    let s = s.trim();
    if s.len() <= MAX_OUTPUT {
        return s.to_owned();
    }
    let mut start = s.len() - MAX_OUTPUT;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_owned()
}
