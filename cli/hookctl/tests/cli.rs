//! End-to-end runs of the hookctl binary.

use std::path::Path;
use std::process::{Command, Output};

use relay_testing::client_hello;

const RULES: &str = r#"
[sniff]
max_prefix_len = 512

[[rules]]
match = "suffix"
pattern = "blocked.example"
action = "ban"

[[rules]]
match = "exact"
pattern = "api.example.com"
protocol = "tls"
action = 2
"#;

fn hookctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hookctl"))
        .args(args)
        .env_remove("RELAY_HOOK_RULES")
        .env_remove("RUST_LOG")
        .env("NO_COLOR", "1")
        .output()
        .unwrap()
}

fn write(dir: &Path, name: &str, contents: &[u8]) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_check_valid_rules() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "rules.toml", RULES.as_bytes());

    let out = hookctl(&["check", &rules, "--format", "json"]);
    assert!(out.status.success());

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["max_prefix_len"], 512);
    assert_eq!(report["rules"].as_array().unwrap().len(), 2);
    assert_eq!(report["rules"][0]["action"], "ban");
}

#[test]
fn test_check_invalid_rules_fails() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(
        dir.path(),
        "rules.toml",
        b"[[rules]]\nmatch = \"exact\"\naction = 1\n",
    );

    let out = hookctl(&["check", &rules]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("rule #1"));
}

#[test]
fn test_decide_selects_remote() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "rules.toml", RULES.as_bytes());
    let capture = write(dir.path(), "hello.bin", &client_hello("api.example.com"));

    let out = hookctl(&[
        "decide",
        &capture,
        "--rules",
        &rules,
        "--max-remote-idx",
        "2",
        "--format",
        "json",
    ]);
    assert!(out.status.success());

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["remote_idx"], 2);
    assert_eq!(report["rule_position"], 2);
    assert_eq!(report["key"]["host"], "api.example.com");
}

#[test]
fn test_decide_hex_input_banned() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "rules.toml", RULES.as_bytes());
    let hex_text = hex::encode(client_hello("cdn.blocked.example"));
    let capture = write(dir.path(), "hello.hex", hex_text.as_bytes());

    let out = hookctl(&[
        "decide", &capture, "--hex", "--rules", &rules, "--format", "json",
    ]);
    assert!(out.status.success());

    let report: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["remote_idx"], -1);
    assert_eq!(report["decision"], "banned");
    assert_eq!(report["banned"], true);
}

#[test]
fn test_prefix_len_from_rules() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "rules.toml", RULES.as_bytes());

    let out = hookctl(&["prefix-len", "--rules", &rules]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "512");
}
