//! Binary-level tests for the edgeranges CLI.
//!
//! Each test writes its own config pointing the file store into a temp dir,
//! so nothing touches /etc or /var.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use edgeranges::store::{CacheStore, CacheValue, FileStore};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENV_OVERRIDES: [&str; 4] = [
    "EDGERANGES_CACHE_STORE",
    "EDGERANGES_CACHE_TTL",
    "EDGERANGES_HTTP_TIMEOUT",
    "EDGERANGES_HTTP_USER_AGENT",
];

fn run_edgeranges(args: &[&str]) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_edgeranges"));
    for var in ENV_OVERRIDES {
        cmd.env_remove(var);
    }
    cmd.args(args).output().expect("Failed to execute edgeranges")
}

/// Write a config with a file store inside `dir`; `extra` is appended verbatim
fn write_config(dir: &TempDir, extra: &str) -> (PathBuf, PathBuf) {
    let cache_path = dir.path().join("cache.json");
    let config_path = dir.path().join("config.yaml");
    let yaml = format!(
        "cache:\n  store: file\n  path: {}\n{}",
        cache_path.display(),
        extra
    );
    std::fs::write(&config_path, yaml).unwrap();
    (config_path, cache_path)
}

fn seed(cache_path: &Path, keys: &[(&str, &[&str])]) {
    let store = FileStore::open(cache_path).unwrap();
    for (key, ranges) in keys {
        let ranges = ranges.iter().map(|s| s.to_string()).collect();
        store.forever(key, CacheValue::Ranges(ranges)).unwrap();
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

#[test]
fn test_version_command() {
    let output = run_edgeranges(&["version"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains(&format!("edgeranges {}", env!("CARGO_PKG_VERSION"))));
}

#[test]
fn test_help_lists_commands() {
    let output = run_edgeranges(&["--help"]);
    assert!(output.status.success());
    let text = stdout(&output);
    for command in ["refresh", "cache-info", "clear", "ranges"] {
        assert!(text.contains(command), "missing {} in help", command);
    }
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let (config_path, _) = write_config(&dir, "http:\n  timeout: 0\n");

    let output = run_edgeranges(&["cache-info", "-c", config_path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("timeout"));
}

#[test]
fn test_cache_info_on_empty_cache() {
    let dir = TempDir::new().unwrap();
    let (config_path, _) = write_config(&dir, "");

    let output = run_edgeranges(&["cache-info", "-c", config_path.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Store:       file"));
    assert!(text.contains("status: missing"));
}

#[test]
fn test_cache_info_json() {
    let dir = TempDir::new().unwrap();
    let (config_path, cache_path) =
        write_config(&dir, "fallback:\n  ipv4:\n    - 173.245.48.0/20\n");
    seed(&cache_path, &[("edgeranges:ips:v4:current", &["1.1.1.1/32", "10.0.0.0/8"])]);

    let output = run_edgeranges(&["cache-info", "--json", "-c", config_path.to_str().unwrap()]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["store"], "file");
    assert_eq!(json["segments"]["current"]["v4"]["present"], true);
    assert_eq!(json["segments"]["current"]["v4"]["count"], 2);
    assert_eq!(json["segments"]["last_good"]["v4"]["present"], false);
    assert_eq!(json["fallback"]["ipv4_count"], 1);
}

#[test]
fn test_clear_current_only() {
    let dir = TempDir::new().unwrap();
    let (config_path, cache_path) = write_config(&dir, "");
    seed(
        &cache_path,
        &[
            ("edgeranges:ips:v4:current", &["1.1.1.1/32"]),
            ("edgeranges:ips:v4:last_good", &["1.1.1.1/32"]),
        ],
    );

    let output = run_edgeranges(&["clear", "--current", "-c", config_path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Total keys cleared: 3"));

    let store = FileStore::open(&cache_path).unwrap();
    assert!(!store.has("edgeranges:ips:v4:current").unwrap());
    assert!(store.has("edgeranges:ips:v4:last_good").unwrap());
}

#[test]
fn test_clear_both_tiers() {
    let dir = TempDir::new().unwrap();
    let (config_path, cache_path) = write_config(&dir, "");
    seed(&cache_path, &[("edgeranges:ips:last_good", &["1.1.1.1/32"])]);

    let output = run_edgeranges(&["clear", "-c", config_path.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Total keys cleared: 6"));

    let store = FileStore::open(&cache_path).unwrap();
    assert!(!store.has("edgeranges:ips:last_good").unwrap());
}

#[test]
fn test_ranges_falls_back_to_config() {
    let dir = TempDir::new().unwrap();
    let (config_path, _) = write_config(
        &dir,
        "auto_fetch:\n  enabled: false\nfallback:\n  ipv4:\n    - 173.245.48.0/20\n    - 103.21.244.0/22\n",
    );

    let output = run_edgeranges(&["ranges", "v4", "--json", "-c", config_path.to_str().unwrap()]);
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["kind"], "v4");
    assert_eq!(json["source"], "fallback");
    assert_eq!(
        json["ranges"],
        serde_json::json!(["173.245.48.0/20", "103.21.244.0/22"])
    );
}

#[test]
fn test_ranges_plain_output() {
    let dir = TempDir::new().unwrap();
    let (config_path, cache_path) = write_config(&dir, "");
    seed(
        &cache_path,
        &[("edgeranges:ips:current", &["1.1.1.1/32", "2606:4700::/32"])],
    );

    let output = run_edgeranges(&["ranges", "-c", config_path.to_str().unwrap()]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), "1.1.1.1/32\n2606:4700::/32\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_against_mock_upstream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ips-v4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("1.1.1.1/32\n10.0.0.0/8\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ips-v6"))
        .respond_with(ResponseTemplate::new(200).set_body_string("2606:4700::/32\n"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let extra = format!(
        "http:\n  endpoints:\n    ipv4: {uri}/ips-v4\n    ipv6: {uri}/ips-v6\n",
        uri = server.uri()
    );
    let (config_path, cache_path) = write_config(&dir, &extra);

    let output = run_edgeranges(&["refresh", "-c", config_path.to_str().unwrap()]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("refreshed successfully"));
    assert!(text.contains("All (current or fallback): 3"));

    let store = FileStore::open(&cache_path).unwrap();
    assert!(store.has("edgeranges:ips:last_good").unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_refresh_failure_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let extra = format!(
        "http:\n  retry:\n    attempts: 1\n  endpoints:\n    ipv4: {uri}/ips-v4\n    ipv6: {uri}/ips-v6\n",
        uri = server.uri()
    );
    let (config_path, cache_path) = write_config(&dir, &extra);

    let output = run_edgeranges(&["refresh", "-c", config_path.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to refresh"));

    let store = FileStore::open(&cache_path).unwrap();
    assert!(!store.has("edgeranges:ips:current").unwrap());
}
