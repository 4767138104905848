//! End-to-end runs of the catalog-merge binary.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn write_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("catalog-merge.toml");
    fs::write(
        &path,
        format!(
            "[store]\ndir = \"{}\"\n\n[upstream]\naccess_token = \"shpat_secret\"\n",
            dir.join("store").display()
        ),
    )
    .unwrap();
    path
}

fn run(home: &Path, config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_catalog-merge"))
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(config)
        .args(args)
        .output()
        .unwrap()
}

#[test]
fn test_create_list_delete_roundtrip() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let out = run(temp.path(), &config, &["--json", "create", "tee-red", "tee-blue"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let created: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let out = run(temp.path(), &config, &["primary-of", "tee-blue"]);
    assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "tee-red");

    let out = run(temp.path(), &config, &["--json", "hidden"]);
    let hidden: Vec<String> = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(hidden, vec!["tee-blue"]);

    let out = run(temp.path(), &config, &["delete", &id]);
    assert!(out.status.success());

    let out = run(temp.path(), &config, &["--json", "list"]);
    let listed: Vec<serde_json::Value> = serde_json::from_slice(&out.stdout).unwrap();
    assert!(listed.is_empty());
}

#[test]
fn test_rejected_create_exits_one_with_payload() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    assert!(run(temp.path(), &config, &["create", "p", "s"]).status.success());
    let out = run(temp.path(), &config, &["--json", "create", "s", "p"]);

    assert_eq!(out.status.code(), Some(1));
    let payload: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(payload["code"], "VALIDATION");
    assert!(payload["message"].as_str().unwrap().contains("already merged"));
}

#[test]
fn test_invalid_config_exits_two() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("bad.toml");
    fs::write(&config, "[cache]\nttl_seconds = 0\n").unwrap();

    let out = run(temp.path(), &config, &["list"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_corrupt_store_exits_three() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    fs::create_dir_all(temp.path().join("store")).unwrap();
    fs::write(temp.path().join("store/merges.json"), "{ not json").unwrap();

    let out = run(temp.path(), &config, &["--json", "list"]);
    assert_eq!(out.status.code(), Some(3));
    let payload: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(payload["code"], "STORE_UNAVAILABLE");
}

#[test]
fn test_status_redacts_access_token() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let out = run(temp.path(), &config, &["--json", "status"]);
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(!stdout.contains("shpat_secret"));
    let status: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(
        status["effective_config"]["config"]["upstream"]["access_token"],
        "[REDACTED]"
    );
    assert_eq!(status["directives"], 0);
}

#[test]
fn test_colors_from_captured_payload() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/resolver");

    let out = run(
        temp.path(),
        &config,
        &[
            "--json",
            "colors",
            "--images",
            fixtures.join("images.json").to_str().unwrap(),
            "--variants",
            fixtures.join("variants.json").to_str().unwrap(),
        ],
    );
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    let red = stdout.find("\"Red\"").unwrap();
    let navy = stdout.find("\"Navy\"").unwrap();
    let olive = stdout.find("\"Olive\"").unwrap();
    assert!(red < navy && navy < olive);
}

#[test]
fn test_store_dir_flag_overrides_config_file() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());
    let override_dir = temp.path().join("override");
    let override_arg = override_dir.to_str().unwrap();

    let out = run(
        temp.path(),
        &config,
        &["--store-dir", override_arg, "create", "tee-red", "tee-blue"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(override_dir.join("merges.json").exists());
    assert!(!temp.path().join("store/merges.json").exists());

    let out = run(temp.path(), &config, &["--store-dir", override_arg, "--json", "status"]);
    let status: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(status["effective_config"]["config"]["store"]["dir"], override_arg);
    let sources = status["effective_config"]["sources"].as_array().unwrap();
    assert_eq!(sources.last().unwrap()["origin"], "cli");
    assert_eq!(status["directives"], 1);
}

#[test]
fn test_invalid_cache_ttl_flag_exits_two() {
    let temp = TempDir::new().unwrap();
    let config = write_config(temp.path());

    let out = run(temp.path(), &config, &["--cache-ttl", "0", "list"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn test_colors_from_unconfigured_admin_api_is_upstream_unavailable() {
    let temp = TempDir::new().unwrap();
    // Token only, no store domain.
    let config = write_config(temp.path());
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/resolver");

    let out = run(
        temp.path(),
        &config,
        &[
            "--json",
            "colors",
            "--product",
            "gid://shopify/Product/42",
            "--variants",
            fixtures.join("variants.json").to_str().unwrap(),
        ],
    );

    assert_eq!(out.status.code(), Some(1));
    let payload: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(payload["code"], "UPSTREAM_UNAVAILABLE");
}
