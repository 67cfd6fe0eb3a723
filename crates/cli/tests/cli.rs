use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Config with a local site target and a CNBlogs target, state inside `dir`
fn write_config(dir: &TempDir) -> PathBuf {
    let content = format!(
        r#"[general]
state_db_path = "{state}"

[platforms.local]
home = "https://site.example.com"
api_url = "{site}"
posid_key = "local-post-id"

[platforms.cnblogs]
home = "https://www.cnblogs.com/me"
api_url = "http://127.0.0.1:9/metaweblog/me"
username = "me"
password_env = "BLOG_BRIDGE_TEST_CNBLOGS_PW"
posid_key = "cnblogs-post-id"
"#,
        state = dir.path().join("state.sqlite").display(),
        site = dir.path().join("site").display(),
    );
    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    path
}

fn write_post(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("hello.md");
    fs::write(&path, "# Hello World\n\nFirst post.\n").expect("write post");
    path
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("blog-bridge");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("[platforms.cnblogs]"));
    assert!(content.contains("posid_key"));
}

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# mine").expect("write config");

    let mut cmd = cargo_bin_cmd!("blog-bridge");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine");
}

#[test]
fn publish_to_local_site_outputs_json() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_config(&dir);
    let post = write_post(&dir);

    let mut cmd = cargo_bin_cmd!("blog-bridge");
    let output = cmd
        .arg("--config")
        .arg(&config)
        .args(["publish", "--platform", "local", "--json", "--file"])
        .arg(&post)
        .output()
        .expect("run publish");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let result = &value[0];
    assert_eq!(result["platform_key"], "local");
    assert_eq!(result["success"], true);
    assert_eq!(result["remote_post_id"], "hello");
    assert_eq!(result["preview_url"], "https://site.example.com/hello.md");

    let written = fs::read_to_string(dir.path().join("site/hello.md")).expect("post written");
    assert!(written.contains("First post."));
    assert!(written.contains("slug: \"hello-world\""));
}

#[test]
fn status_shows_slug_after_publish() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_config(&dir);
    let post = write_post(&dir);

    cargo_bin_cmd!("blog-bridge")
        .arg("--config")
        .arg(&config)
        .args(["publish", "--platform", "local", "--file"])
        .arg(&post)
        .assert()
        .success();

    let output = cargo_bin_cmd!("blog-bridge")
        .env("BLOG_BRIDGE_TEST_CNBLOGS_PW", "secret")
        .arg("--config")
        .arg(&config)
        .args(["status", "--json", "--id", "hello"])
        .output()
        .expect("run status");

    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["document_id"], "hello");
    assert_eq!(value["meta"]["custom-slug"], "hello-world");

    let platforms = value["platforms"].as_array().expect("platforms");
    let cnblogs = platforms
        .iter()
        .find(|p| p["platform_key"] == "cnblogs")
        .expect("cnblogs status");
    assert_eq!(cnblogs["published"], false);
    assert_eq!(cnblogs["uses_document_id"], false);

    let local_site = platforms
        .iter()
        .find(|p| p["platform_key"] == "local")
        .expect("local status");
    assert_eq!(local_site["uses_document_id"], true);
}

#[test]
fn publish_to_unknown_platform_fails() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_config(&dir);
    let post = write_post(&dir);

    cargo_bin_cmd!("blog-bridge")
        .arg("--config")
        .arg(&config)
        .args(["publish", "--platform", "medium", "--file"])
        .arg(&post)
        .assert()
        .failure()
        .stdout(predicate::str::contains("not configured"));
}

#[test]
fn delete_without_mapping_suggests_publishing_first() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_config(&dir);

    cargo_bin_cmd!("blog-bridge")
        .env("BLOG_BRIDGE_TEST_CNBLOGS_PW", "secret")
        .arg("--config")
        .arg(&config)
        .args(["delete", "--id", "hello", "--platform", "cnblogs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("publish it first"));
}

#[test]
fn force_delete_without_mapping_or_secret_succeeds() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_config(&dir);

    cargo_bin_cmd!("blog-bridge")
        .env_remove("BLOG_BRIDGE_TEST_CNBLOGS_PW")
        .arg("--config")
        .arg(&config)
        .args(["delete", "--id", "hello", "--platform", "cnblogs", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("local mapping for hello removed"));
}

#[test]
fn doctor_reports_missing_secret() {
    let dir = TempDir::new().expect("temp dir");
    let config = write_config(&dir);

    let output = cargo_bin_cmd!("blog-bridge")
        .env_remove("BLOG_BRIDGE_TEST_CNBLOGS_PW")
        .arg("--config")
        .arg(&config)
        .args(["doctor", "--json"])
        .output()
        .expect("run doctor");

    assert!(!output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["overall"], "error");
    assert_eq!(value["platforms"]["cnblogs"]["status"], "error");
    assert_eq!(value["platforms"]["local"]["status"], "ok");
}
