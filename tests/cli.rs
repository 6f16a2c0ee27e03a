use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const ENV_VARS: &[&str] = &[
    "DOCENHANCER_PROVIDER",
    "DOCENHANCER_MODEL",
    "DOCENHANCER_API_KEY",
    "DOCENHANCER_ENDPOINT",
    "DOCENHANCER_LANGUAGE",
    "DOCENHANCER_LOG",
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
];

const MODULE: &str = r#""""Geometry helpers."""

def area(r):
    """Area of a circle."""
    return 3.14159 * r * r
"#;

/// The binary, isolated from the user's configuration and environment.
fn docenhancer(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("docenhancer").unwrap();
    cmd.current_dir(dir)
        .env("HOME", dir)
        .env("XDG_CONFIG_HOME", dir.join(".config"));
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    docenhancer(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("enhance"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("index"));
}

#[test]
fn test_enhance_without_provider_is_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("geometry.py"), MODULE).unwrap();

    docenhancer(dir.path())
        .args(["enhance", "--module", "geometry.py"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ConfigurationError:"));

    assert!(!dir.path().join("docs").exists());
}

#[test]
fn test_enhance_rejects_unknown_provider() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("geometry.py"), MODULE).unwrap();

    docenhancer(dir.path())
        .args([
            "enhance",
            "--module",
            "geometry.py",
            "--provider",
            "mock",
            "--model",
            "mock-model",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ConfigurationError: unknown provider 'mock'"));
}

#[test]
fn test_cloud_provider_requires_key() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("geometry.py"), MODULE).unwrap();

    docenhancer(dir.path())
        .args([
            "enhance",
            "--module",
            "geometry.py",
            "--provider",
            "openai",
            "--model",
            "gpt-4o-mini",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}

#[test]
fn test_key_for_another_provider_is_never_sent() {
    let mut server = mockito::Server::new();
    let any_call = server
        .mock("POST", mockito::Matcher::Any)
        .expect(0)
        .create();

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("geometry.py"), MODULE).unwrap();
    fs::write(
        dir.path().join(".docenhancer.toml"),
        "[provider]\nname = \"openai\"\nmodel = \"gpt-4o-mini\"\napi_key = \"sk-openai-secret\"\n",
    )
    .unwrap();

    let endpoint = server.url();
    docenhancer(dir.path())
        .args([
            "enhance",
            "--module",
            "geometry.py",
            "--provider",
            "anthropic",
            "--model",
            "claude-3-5-haiku-latest",
            "--endpoint",
            endpoint.as_str(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ConfigurationError:"))
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));

    any_call.assert();
    assert!(!dir.path().join("docs").exists());
}

#[test]
fn test_project_config_supplies_provider() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("geometry.py"), MODULE).unwrap();
    fs::write(
        dir.path().join(".docenhancer.toml"),
        "[provider]\nname = \"anthropic\"\nmodel = \"claude-3-5-haiku-latest\"\n",
    )
    .unwrap();

    // The file is picked up: the error is now about the missing key.
    docenhancer(dir.path())
        .args(["enhance", "--module", "geometry.py"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ANTHROPIC_API_KEY"));
}

#[test]
fn test_parse_error_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("broken.py"), "def broken(:\n    pass\n").unwrap();

    docenhancer(dir.path())
        .args([
            "enhance",
            "--module",
            "broken.py",
            "--provider",
            "local",
            "--model",
            "llama3.2",
            "--endpoint",
            "http://127.0.0.1:9",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ParseError:"))
        .stderr(predicate::str::contains("broken.py:1:"));
}

#[test]
fn test_unreachable_provider_still_writes_page() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("geometry.py"), MODULE).unwrap();

    docenhancer(dir.path())
        .args([
            "enhance",
            "--module",
            "geometry.py",
            "--provider",
            "local",
            "--model",
            "llama3.2",
            "--endpoint",
            "http://127.0.0.1:9",
            "--timeout",
            "5",
            "--no-run-examples",
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("ProviderError:"))
        .stderr(predicate::str::contains("geometry.area"));

    let page = fs::read_to_string(dir.path().join("docs").join("geometry.py.md")).unwrap();
    assert!(page.starts_with("# Documentation for `geometry` [en]"));
    assert!(page.contains("## Function: `area`"));
    assert!(!page.contains("**Summary**"));
}

#[test]
fn test_search_empty_docs_dir() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();

    docenhancer(dir.path())
        .args(["search", "--query", "circle area"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("IndexEmptyError:"));
}

#[test]
fn test_search_missing_docs_dir() {
    let dir = tempfile::tempdir().unwrap();

    docenhancer(dir.path())
        .args(["search", "--query", "circle area", "--docs-dir", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IOError:"));
}

#[test]
fn test_index_status_without_index() {
    let dir = tempfile::tempdir().unwrap();

    docenhancer(dir.path())
        .args(["index", "--status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No index found"));
}
