use assert_cmd::Command;
use predicates::prelude::*;

fn naqra() -> Command {
    Command::cargo_bin("naqra").unwrap()
}

#[test]
fn test_help_lists_commands() {
    naqra()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("resolve"))
        .stdout(predicate::str::contains("check"));
}

#[test]
fn test_version() {
    naqra()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_run_help_mentions_token_env() {
    naqra()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TELEGRAM_TOKEN"));
}

#[test]
fn test_unknown_subcommand_fails() {
    naqra()
        .arg("transcribe")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_resolve_without_url_fails() {
    naqra().arg("resolve").assert().failure().stderr(predicate::str::contains("<URL>"));
}

#[test]
fn test_run_without_token_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");

    naqra()
        .env_remove("TELEGRAM_TOKEN")
        .args(["run", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("token"));
    assert!(config.exists());
}

#[test]
fn test_config_show_reads_given_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    let yaml = "telegram:\n  channel_id: \"@naqra\"\napp:\n  min_quality: 720\n";
    std::fs::write(&config, yaml).unwrap();

    naqra()
        .args(["config", "--show", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("@naqra"))
        .stdout(predicate::str::contains("720p"));
}
