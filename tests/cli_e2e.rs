//! End-to-end CLI tests for the genwiki binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Binary with config, data and credentials isolated under `home`.
fn genwiki(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("genwiki").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("HOME", home)
        .env("NO_COLOR", "1")
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(home: &Path, contents: &str) {
    let dir = home.join("config").join("genwiki");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), contents).unwrap();
}

#[test]
fn test_binary_help_displays_usage() {
    let home = tempfile::tempdir().unwrap();
    genwiki(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("An encyclopedia where every word is a link"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = tempfile::tempdir().unwrap();
    genwiki(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("genwiki"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = tempfile::tempdir().unwrap();
    genwiki(home.path())
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_config_show_reports_defaults() {
    let home = tempfile::tempdir().unwrap();
    genwiki(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config_file = not found (using defaults)"))
        .stdout(predicate::str::contains("api_key = missing"))
        .stdout(predicate::str::contains(
            "api_base_url = https://generativelanguage.googleapis.com",
        ))
        .stdout(predicate::str::contains("persist = true"))
        .stdout(predicate::str::contains("log_level = warn"));
}

#[test]
fn test_config_show_applies_file_and_flags() {
    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        "definition_model = \"custom-model\" # quick\nverbosity = \"verbose\"\nfeedback_url = \"\"\n",
    );
    genwiki(home.path())
        .env("GEMINI_API_KEY", "secret")
        .args(["config", "show", "--no-persist", "-L", "ja"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config_file = loaded"))
        .stdout(predicate::str::contains("api_key = set"))
        .stdout(predicate::str::contains("secret").not())
        .stdout(predicate::str::contains("definition_model = custom-model"))
        .stdout(predicate::str::contains("persist = false"))
        .stdout(predicate::str::contains("language = ja"))
        .stdout(predicate::str::contains("verbosity = verbose"))
        .stdout(predicate::str::contains("log_level = debug"));
}

#[test]
fn test_invalid_config_file_fails_with_line_number() {
    let home = tempfile::tempdir().unwrap();
    write_config(home.path(), "persist = true\ncolour = \"blue\"\n");
    genwiki(home.path())
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_define_without_api_key_fails() {
    let home = tempfile::tempdir().unwrap();
    genwiki(home.path())
        .args(["define", "Entropy", "--no-persist", "-q"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("API_KEY is not configured"));
}

#[test]
fn test_interactive_session_reads_commands_until_quit() {
    let home = tempfile::tempdir().unwrap();
    genwiki(home.path())
        .arg("--no-persist")
        .write_stdin(":help\n:fly\n:quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("genwiki - an infinite encyclopedia"))
        .stdout(predicate::str::contains(":w <n>"))
        .stderr(predicate::str::contains("Unknown command ':fly'"));
}

#[test]
fn test_interactive_session_ends_on_eof() {
    let home = tempfile::tempdir().unwrap();
    genwiki(home.path())
        .arg("--no-persist")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Try:"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_define_streams_definition_from_api() {
    let server = MockServer::start().await;
    let frame = json!({
        "candidates": [{
            "content": { "parts": [{ "text": "Entropy measures disorder." }] },
            "groundingMetadata": { "groundingChunks": [
                { "web": { "uri": "https://physics.example/entropy", "title": "Physics" } }
            ]}
        }]
    });
    Mock::given(method("POST"))
        .and(path(
            "/v1beta/models/gemini-flash-lite-latest:streamGenerateContent",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(format!("data: {frame}\n\n"), "text/event-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let home = tempfile::tempdir().unwrap();
    write_config(
        home.path(),
        &format!("api_base_url = \"{}\"\ngeolocation_url = \"\"\n", server.uri()),
    );
    let home_path = home.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        genwiki(&home_path)
            .env("GEMINI_API_KEY", "k")
            .args(["define", "Entropy", "--no-persist"])
            .assert()
    })
    .await
    .unwrap();

    assert
        .success()
        .stdout(predicate::str::contains("Entropy measures disorder."))
        .stdout(predicate::str::contains("[1] Physics https://physics.example/entropy"))
        .stdout(predicate::str::contains("Generated in"));
}
