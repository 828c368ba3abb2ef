//! Binary-level tests. Stdout is not a TTY here, so every command emits JSON.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

struct Registry {
    dir: TempDir,
    db: PathBuf,
}

impl Registry {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let db = dir.path().join("registry.db");
        Self { dir, db }
    }

    fn initialized() -> Self {
        let registry = Self::new();
        registry.ok(&["init"]);
        registry
    }

    fn cmd(&self, args: &[&str]) -> Command {
        let mut cmd = Command::cargo_bin("apireg").unwrap();
        cmd.env_remove("APIREG_DB")
            .env_remove("APIREG_TEST_DB")
            .env_remove("APIREG_FETCH_TIMEOUT_SECS")
            .env_remove("APIREG_REFRESH_MODE")
            .env_remove("RUST_LOG")
            .env("HOME", self.dir.path())
            .env("APIREG_ACTOR", "cli-test")
            .arg("--db")
            .arg(&self.db)
            .args(args);
        cmd
    }

    /// Run, expect success, parse stdout as JSON.
    fn ok(&self, args: &[&str]) -> Value {
        let output = self.cmd(args).assert().success().get_output().stdout.clone();
        serde_json::from_slice(&output).unwrap()
    }

    /// Run, expect `code`, parse the structured error from stderr.
    fn fails(&self, args: &[&str], code: i32) -> Value {
        let output = self.cmd(args).assert().code(code).get_output().stderr.clone();
        let stderr = String::from_utf8(output).unwrap();
        let line = stderr
            .lines()
            .rev()
            .find(|l| l.starts_with('{'))
            .unwrap_or_else(|| panic!("no JSON error in stderr: {stderr}"));
        serde_json::from_str(line).unwrap()
    }

    fn add_contract(&self, name: &str, spec_url: Option<&str>) -> String {
        let mut args = vec![
            "contract",
            "add",
            name,
            "--base-url",
            "https://api.internal",
            "--team",
            "platform",
        ];
        if let Some(url) = spec_url {
            args.extend(["--spec-url", url]);
        }
        self.ok(&args)["id"].as_str().unwrap().to_string()
    }

    fn db_path(&self) -> &Path {
        &self.db
    }
}

/// Serve `body` as JSON to the next `requests` connections.
fn serve_json(body: &'static str, requests: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/openapi.json", listener.local_addr().unwrap());

    std::thread::spawn(move || {
        for stream in listener.incoming().take(requests) {
            let Ok(mut stream) = stream else { continue };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });

    url
}

const DOC: &str = r#"{"openapi":"3.0.0","paths":{"/users":{"get":{"summary":"List all users"},"post":{"summary":"Create user"}}}}"#;

#[test]
fn test_version() {
    let registry = Registry::new();
    let out = registry.ok(&["version"]);
    assert_eq!(out["version"], env!("CARGO_PKG_VERSION"));
    assert!(out["schemaVersion"].as_i64().unwrap() >= 1);
    assert_eq!(out["documentFormats"][0], "openapi 3.x");
}

#[test]
fn test_init_then_reinit() {
    let registry = Registry::new();

    let out = registry.ok(&["init"]);
    assert_eq!(out["recreated"], false);
    assert!(registry.db_path().exists());

    let err = registry.fails(&["init"], 2);
    assert_eq!(err["error"]["code"], "ALREADY_INITIALIZED");

    let out = registry.ok(&["init", "--force"]);
    assert_eq!(out["recreated"], true);
}

#[test]
fn test_commands_require_init() {
    let registry = Registry::new();
    let err = registry.fails(&["contract", "list"], 2);
    assert_eq!(err["error"]["code"], "NOT_INITIALIZED");
    assert!(err["error"]["hint"].as_str().unwrap().contains("apireg init"));
}

#[test]
fn test_contract_lifecycle() {
    let registry = Registry::initialized();
    let id = registry.add_contract("Users", None);
    assert!(id.starts_with("api_"));

    let list = registry.ok(&["contract", "list"]);
    assert_eq!(list["count"], 1);
    assert_eq!(list["contracts"][0]["name"], "Users");
    assert_eq!(list["contracts"][0]["lifecycle"], "DRAFT");

    let shown = registry.ok(&["contract", "lifecycle", &id, "live"]);
    assert_eq!(shown["lifecycle"], "ACTIVE");
    assert_eq!(shown["endpointCount"], 0);

    let err = registry.fails(
        &["contract", "add", "Users", "--base-url", "https://x", "--team", "platform"],
        5,
    );
    assert_eq!(err["error"]["code"], "DUPLICATE_CONTRACT");

    let err = registry.fails(&["contract", "show", "api_nope"], 3);
    assert_eq!(err["error"]["code"], "CONTRACT_NOT_FOUND");
}

#[test]
fn test_set_spec_url_validates_scheme() {
    let registry = Registry::initialized();
    let id = registry.add_contract("Users", None);

    let err = registry.fails(&["contract", "set-spec-url", &id, "ftp://host/spec.json"], 4);
    assert_eq!(err["error"]["code"], "INVALID_ARGUMENT");

    let shown = registry.ok(&["contract", "set-spec-url", &id, "https://host/spec.json"]);
    assert_eq!(shown["openApiUrl"], "https://host/spec.json");

    let shown = registry.ok(&["contract", "set-spec-url", &id, "--clear"]);
    assert!(shown["openApiUrl"].is_null());
}

#[test]
fn test_endpoint_add_list_remove() {
    let registry = Registry::initialized();
    let id = registry.add_contract("Users", None);

    let added = registry.ok(&["endpoint", "add", &id, "get", "/users", "-d", "List users"]);
    assert_eq!(added["method"], "GET");
    assert_eq!(added["description"], "List users");
    let endpoint_id = added["id"].as_str().unwrap().to_string();

    let err = registry.fails(&["endpoint", "add", &id, "GET", "/users"], 5);
    assert_eq!(err["error"]["code"], "DUPLICATE_ENDPOINT");

    let err = registry.fails(&["endpoint", "add", &id, "HEAD", "/users"], 4);
    assert_eq!(err["error"]["code"], "INVALID_ARGUMENT");

    let err = registry.fails(&["endpoint", "add", &id, "GET", "users"], 4);
    assert_eq!(err["error"]["code"], "INVALID_ARGUMENT");

    let list = registry.ok(&["endpoint", "list", &id]);
    assert_eq!(list["count"], 1);

    let removed = registry.ok(&["endpoint", "remove", &id, &endpoint_id]);
    assert_eq!(removed["removed"], endpoint_id.as_str());
    let err = registry.fails(&["endpoint", "remove", &id, &endpoint_id], 3);
    assert_eq!(err["error"]["code"], "ENDPOINT_NOT_FOUND");
}

#[test]
fn test_import_without_spec_url() {
    let registry = Registry::initialized();
    let id = registry.add_contract("Users", None);

    let err = registry.fails(&["sync", "import", &id], 6);
    assert_eq!(err["error"]["code"], "NO_SPEC_URL");

    let runs = registry.ok(&["sync", "runs", &id]);
    assert_eq!(runs["count"], 1);
    assert_eq!(runs["runs"][0]["status"], "FAILED");
}

#[test]
fn test_invalid_mode_is_rejected_before_anything_runs() {
    let registry = Registry::initialized();
    let id = registry.add_contract("Users", None);

    let err = registry.fails(&["sync", "import", &id, "--mode", "replce"], 4);
    assert_eq!(err["error"]["code"], "INVALID_MODE");
    assert!(err["error"]["message"].as_str().unwrap().contains("replace"));

    let runs = registry.ok(&["sync", "runs", &id]);
    assert_eq!(runs["count"], 0);
}

#[test]
fn test_zero_timeout_is_rejected() {
    let registry = Registry::initialized();
    let id = registry.add_contract("Users", None);
    let err = registry.fails(&["sync", "preview", &id, "--timeout", "0"], 4);
    assert_eq!(err["error"]["code"], "INVALID_ARGUMENT");
}

#[test]
fn test_preview_then_import_over_http() {
    let registry = Registry::initialized();
    let url = serve_json(DOC, 2);
    let id = registry.add_contract("Users", Some(&url));
    registry.ok(&["endpoint", "add", &id, "GET", "/users", "-d", "List users"]);
    registry.ok(&["endpoint", "add", &id, "DELETE", "/users/{id}"]);

    let diff = registry.ok(&["sync", "preview", &id]);
    assert_eq!(diff["added"].as_array().unwrap().len(), 1);
    assert_eq!(diff["removed"].as_array().unwrap().len(), 1);
    assert_eq!(diff["changed"][0]["changeDescription"], "Changed: description");
    assert_eq!(registry.ok(&["sync", "runs", &id])["count"], 0);

    let result = registry.ok(&["sync", "import", &id, "--mode", "replace"]);
    assert_eq!(result["addedCount"], 1);
    assert_eq!(result["updatedCount"], 1);
    assert_eq!(result["deletedCount"], 1);
    assert_eq!(result["breaksDetected"], true);
    assert_eq!(result["breakingChanges"][0]["type"], "REMOVED_ENDPOINT");

    let endpoints = registry.ok(&["endpoint", "list", &id]);
    assert_eq!(endpoints["count"], 2);

    let changelog = registry.ok(&["changelog", "list", &id]);
    assert_eq!(changelog["count"], 1);
    assert_eq!(changelog["entries"][0]["summary"], "Synced from OpenAPI: +1 ~1 -1");

    let runs = registry.ok(&["sync", "runs", &id]);
    let run_id = runs["runs"][0]["id"].as_str().unwrap().to_string();
    let run = registry.ok(&["sync", "show", &run_id]);
    assert_eq!(run["status"], "SUCCESS");
    assert_eq!(run["mode"], "REPLACE");
    assert_eq!(run["breakingChanges"][0]["path"], "/users/{id}");
}

#[test]
fn test_refresh_all_reports_failures() {
    let registry = Registry::initialized();
    let url = serve_json(DOC, 1);
    registry.add_contract("Users", Some(&url));

    // Nothing listens on port 9 locally, so this one fails
    registry.add_contract("Billing", Some("http://127.0.0.1:9/openapi.json"));
    registry.add_contract("Legacy", None);

    let summary = registry.ok(&["sync", "refresh-all", "--timeout", "5"]);
    assert_eq!(summary["totalApis"], 2);
    assert_eq!(summary["succeeded"], 1);
    assert_eq!(summary["failed"], 1);
    assert_eq!(summary["failures"][0]["apiName"], "Billing");
}

#[test]
fn test_unknown_sync_run() {
    let registry = Registry::initialized();
    let err = registry.fails(&["sync", "show", "run_missing"], 3);
    assert_eq!(err["error"]["code"], "SYNC_RUN_NOT_FOUND");
}

#[test]
fn test_contract_list_filters() {
    let registry = Registry::initialized();
    let users = registry.add_contract("Users", None);
    registry.ok(&[
        "contract", "add", "Billing", "--base-url", "https://pay.internal", "--team", "finance",
        "-d", "Invoices",
    ]);
    registry.ok(&["contract", "lifecycle", &users, "active"]);

    let by_text = registry.ok(&["contract", "list", "--query", "INVOICE"]);
    assert_eq!(by_text["count"], 1);
    assert_eq!(by_text["contracts"][0]["name"], "Billing");

    let by_team = registry.ok(&["contract", "list", "--team", "Platform"]);
    assert_eq!(by_team["count"], 1);
    assert_eq!(by_team["contracts"][0]["id"], users.as_str());

    let by_stage = registry.ok(&["contract", "list", "--lifecycle", "draft"]);
    assert_eq!(by_stage["count"], 1);
    assert_eq!(by_stage["contracts"][0]["name"], "Billing");

    let none = registry.ok(&["contract", "list", "--query", "users", "--team", "finance"]);
    assert_eq!(none["count"], 0);

    let err = registry.fails(&["contract", "list", "--lifecycle", "gone"], 4);
    assert_eq!(err["error"]["code"], "INVALID_ARGUMENT");
}

#[test]
fn test_changelog_add() {
    let registry = Registry::initialized();
    let id = registry.add_contract("Users", None);

    let entry = registry.ok(&[
        "changelog", "add", &id, "--type", "deprecated", "--summary", "Sunset v1 search",
        "--breaking", "--released-at", "2024-03-01T12:00:00Z",
    ]);
    assert_eq!(entry["breaking"], true);
    assert_eq!(entry["releasedAt"], 1_709_294_400_000_i64);

    registry.ok(&["changelog", "add", &id, "-t", "fixed", "-s", "Pagination off by one"]);

    let list = registry.ok(&["changelog", "list", &id]);
    assert_eq!(list["count"], 2);
    assert_eq!(list["entries"][0]["summary"], "Pagination off by one");
    assert_eq!(list["entries"][1]["summary"], "Sunset v1 search");

    let err = registry.fails(&["changelog", "add", &id, "-t", "renamed", "-s", "x"], 4);
    assert_eq!(err["error"]["code"], "INVALID_ARGUMENT");

    let err = registry.fails(&["changelog", "add", "api_nope", "-t", "fixed", "-s", "x"], 3);
    assert_eq!(err["error"]["code"], "CONTRACT_NOT_FOUND");
}

#[test]
fn test_mode_synonyms_are_not_modes() {
    let registry = Registry::initialized();
    let id = registry.add_contract("Users", Some("http://127.0.0.1:9/openapi.json"));

    for word in ["overwrite", "full", "mirror"] {
        let err = registry.fails(&["sync", "import", &id, "--mode", word], 4);
        assert_eq!(err["error"]["code"], "INVALID_MODE");
    }
    assert_eq!(registry.ok(&["sync", "runs", &id])["count"], 0);
}
