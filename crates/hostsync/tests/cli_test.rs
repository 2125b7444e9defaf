//! Integration tests for the `hostsync` binary.
//!
//! Argument parsing, completions, offline classification and config
//! inspection -- nothing here needs a Zabbix server.
#![allow(clippy::unwrap_used)]

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// A `hostsync` command isolated from the caller's config and credentials.
fn hostsync_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("hostsync");
    cmd.env("HOME", "/tmp/hostsync-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/hostsync-cli-test-nonexistent")
        .env_remove("HOSTSYNC_CONFIG")
        .env_remove("ZABBIX_USERNAME")
        .env_remove("ZABBIX_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn temp_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn webhook(status: &str, platform: &str, name: &str, ip: &str, site: &str) -> String {
    serde_json::json!({
        "event": "updated",
        "timestamp": "2024-03-09 17:55:33.329547+00:00",
        "model": "virtualmachine",
        "data": {
            "name": name,
            "status": { "value": status, "label": status },
            "primary_ip": { "address": format!("{ip}/24") },
            "platform": { "name": platform },
            "tags": [{ "name": "Uniq" }],
            "custom_fields": { "vcsa_vm_guest_hostname": null },
            "cluster": { "name": "Prod" },
            "site": { "name": site }
        }
    })
    .to_string()
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = hostsync_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_lists_commands() {
    hostsync_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("serve")
            .and(predicate::str::contains("classify"))
            .and(predicate::str::contains("check"))
            .and(predicate::str::contains("completions")),
    );
}

#[test]
fn test_version_flag() {
    hostsync_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("hostsync"));
}

#[test]
fn test_completions_bash() {
    hostsync_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── classify ────────────────────────────────────────────────────────

#[test]
fn test_classify_linux_cpanel_with_proxy() {
    let payload = temp_file(
        ".json",
        &webhook("active", "Ubuntu 22.04", "web-cp01", "172.16.4.20", "Pluto-vCenter"),
    );

    let output = hostsync_cmd()
        .args(["classify", payload.path().to_str().unwrap()])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["host_name"], "web-cp01");
    assert_eq!(report["record"]["ip_address"], "172.16.4.20");
    assert_eq!(
        report["profile"]["templates"],
        serde_json::json!(["Template OS Linux", "template cPanel backup"])
    );
    assert_eq!(
        report["profile"]["groups"],
        serde_json::json!(["Linux servers", "cPanels", "Uniq"])
    );
    assert_eq!(report["profile"]["verdict"]["verdict"], "eligible");
    assert_eq!(report["proxy"], "62.90.18.89");
}

#[test]
fn test_classify_inactive_from_stdin() {
    let output = hostsync_cmd()
        .args(["classify", "-"])
        .write_stdin(webhook("offline", "Windows Server 2019", "WIN-APP01", "10.0.0.5", "hq"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let report = stdout_json(&output);
    assert_eq!(report["profile"]["verdict"]["reason"], "inactive");
    assert_eq!(report["proxy"], serde_json::Value::Null);
}

#[test]
fn test_classify_yaml_output() {
    let payload = temp_file(
        ".json",
        &webhook("active", "Windows Server 2019", "WIN-APP01", "10.0.0.5", "hq"),
    );

    hostsync_cmd()
        .args(["-o", "yaml", "classify", payload.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("Template OS Windows")
                .and(predicate::str::contains("os_family: windows")),
        );
}

#[test]
fn test_classify_malformed_payload() {
    let payload = temp_file(".json", r#"{"data":{"name":"x"}}"#);

    hostsync_cmd()
        .args(["classify", payload.path().to_str().unwrap()])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Malformed event"));
}

#[test]
fn test_classify_respects_configured_policy() {
    let config = temp_file(".toml", "[policy]\nexcluded_name_marker = \"lab\"\n");
    let payload = temp_file(".json", &webhook("active", "debian", "LAB-db01", "10.0.0.7", "hq"));

    let output = hostsync_cmd()
        .args([
            "--config",
            config.path().to_str().unwrap(),
            "classify",
            payload.path().to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["profile"]["verdict"]["reason"], "excluded_name");
}

// ── config ──────────────────────────────────────────────────────────

#[test]
fn test_config_path_explicit() {
    hostsync_cmd()
        .args(["--config", "/etc/hostsync/custom.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/etc/hostsync/custom.toml"));
}

#[test]
fn test_config_show_masks_password() {
    let config = temp_file(
        ".toml",
        "[zabbix]\nurl = \"https://zabbix.example.com/api_jsonrpc.php\"\nusername = \"svc\"\npassword = \"hunter2\"\n",
    );

    hostsync_cmd()
        .args(["--config", config.path().to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("zabbix.example.com")
                .and(predicate::str::contains("0.0.0.0:17777"))
                .and(predicate::str::contains("hunter2").not()),
        );
}

#[test]
fn test_config_show_missing_file() {
    hostsync_cmd()
        .args([
            "--config",
            "/tmp/hostsync-cli-test-nonexistent/none.toml",
            "config",
            "show",
        ])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not found"));
}

// ── serve ───────────────────────────────────────────────────────────

#[test]
fn test_serve_rejects_bad_listen_address() {
    hostsync_cmd()
        .args(["serve", "--listen", "localhost"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("listen.address"));
}

// ── check ───────────────────────────────────────────────────────────

#[test]
fn test_check_without_credentials() {
    let config = temp_file(
        ".toml",
        "[zabbix]\nurl = \"https://zabbix.example.com/api_jsonrpc.php\"\n",
    );

    hostsync_cmd()
        .args(["--config", config.path().to_str().unwrap(), "check"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("credentials"));
}
