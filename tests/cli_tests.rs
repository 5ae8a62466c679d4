use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

/// Fresh working directory with an empty source and no replica
fn workspace() -> Result<TempDir> {
    let temp_dir = TempDir::new()?;
    fs::create_dir(temp_dir.path().join("source"))?;
    Ok(temp_dir)
}

fn mirrorsync(dir: &TempDir) -> Result<Command> {
    let mut cmd = Command::cargo_bin("mirrorsync")?;
    cmd.current_dir(dir.path())
        .env_remove("RUST_LOG")
        .env_remove(mirrorsync::CONFIG_ENV_VAR);
    Ok(cmd)
}

#[test]
fn test_once_mirrors_and_exits() -> Result<()> {
    let dir = workspace()?;
    fs::write(dir.path().join("source/a.txt"), "hi")?;

    mirrorsync(&dir)?
        .args(["-s", "source", "-r", "replica", "--once"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Pass 1: 1 created"));

    assert_eq!(fs::read(dir.path().join("replica/a.txt"))?, b"hi");
    Ok(())
}

#[test]
fn test_default_log_file_records_events() -> Result<()> {
    let dir = workspace()?;
    fs::write(dir.path().join("source/a.txt"), "hi")?;

    mirrorsync(&dir)?
        .args(["-s", "source", "-r", "replica", "--once"])
        .assert()
        .success()
        .stdout(predicate::str::contains("file-created"));

    let log = fs::read_to_string(dir.path().join(mirrorsync::DEFAULT_LOG_FILE))?;
    assert!(log.contains("Synchronization initialized with"));
    assert!(log.contains("file-created"));
    assert!(!log.contains("\u{1b}["), "file log must not carry ANSI colors");
    Ok(())
}

#[test]
fn test_log_file_is_truncated_at_startup() -> Result<()> {
    let dir = workspace()?;
    fs::write(dir.path().join("sync.log"), "stale line from an older run\n")?;

    mirrorsync(&dir)?
        .args(["-s", "source", "-r", "replica", "-l", "sync.log", "--once"])
        .assert()
        .success();

    let log = fs::read_to_string(dir.path().join("sync.log"))?;
    assert!(!log.contains("stale line"));
    assert!(log.contains("Synchronization initialized with"));
    Ok(())
}

#[test]
fn test_quiet_still_logs_every_mutation_to_file() -> Result<()> {
    let dir = workspace()?;
    fs::write(dir.path().join("source/a.txt"), "hi")?;

    mirrorsync(&dir)?
        .args(["-s", "source", "-r", "replica", "--once", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains("file-created").not());

    let log = fs::read_to_string(dir.path().join(mirrorsync::DEFAULT_LOG_FILE))?;
    assert!(log.contains("Synchronization initialized with"));
    assert!(log.contains("file-created"));
    Ok(())
}

#[test]
fn test_log_file_inside_source_is_refused() -> Result<()> {
    let dir = workspace()?;

    mirrorsync(&dir)?
        .args(["-s", "source", "-r", "replica", "-l", "source/logs.txt", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("outside both"));

    assert!(!dir.path().join("source/logs.txt").exists());
    assert!(!dir.path().join("replica").exists());
    Ok(())
}

#[test]
fn test_missing_source_fails_fast() -> Result<()> {
    let dir = TempDir::new()?;

    mirrorsync(&dir)?
        .args(["-s", "missing", "-r", "replica", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    assert!(!dir.path().join("replica").exists());
    assert!(!dir.path().join(mirrorsync::DEFAULT_LOG_FILE).exists());
    Ok(())
}

#[test]
fn test_create_source_flag() -> Result<()> {
    let dir = TempDir::new()?;

    mirrorsync(&dir)?
        .args(["-s", "missing", "-r", "replica", "--once", "--create-source"])
        .assert()
        .success();

    assert!(dir.path().join("missing").is_dir());
    assert!(dir.path().join("replica").is_dir());
    Ok(())
}

#[test]
fn test_requires_both_roots() -> Result<()> {
    let dir = workspace()?;

    mirrorsync(&dir)?
        .args(["-s", "source", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--replica"));
    Ok(())
}

#[test]
fn test_invalid_interval_rejected() -> Result<()> {
    let dir = workspace()?;

    mirrorsync(&dir)?
        .args(["-s", "source", "-r", "replica", "--interval=0", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("positive"));
    Ok(())
}

#[test]
fn test_config_file_from_environment() -> Result<()> {
    let dir = workspace()?;
    fs::write(dir.path().join("source/from-config.txt"), "cfg")?;
    let config_path = dir.path().join("mirrorsync.toml");
    fs::write(
        &config_path,
        "[sync]\nsource = \"source\"\nreplica = \"replica\"\n\n[logging]\nfile = \"cfg.log\"\n",
    )?;

    mirrorsync(&dir)?
        .env(mirrorsync::CONFIG_ENV_VAR, &config_path)
        .arg("--once")
        .assert()
        .success();

    assert!(dir.path().join("replica/from-config.txt").exists());
    assert!(dir.path().join("cfg.log").exists());
    Ok(())
}

#[test]
fn test_scheduler_keeps_running_passes() -> Result<()> {
    let dir = workspace()?;
    fs::write(dir.path().join("source/a.txt"), "hi")?;

    // Killed by the timeout; only the output matters here
    let output = mirrorsync(&dir)?
        .args(["-s", "source", "-r", "replica", "-i", "0.2", "-v"])
        .timeout(Duration::from_millis(1500))
        .output()?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Pass 1: 1 created"), "{stderr}");
    assert!(stderr.contains("Pass 2: Already in sync"), "{stderr}");
    assert!(dir.path().join("replica/a.txt").exists());
    Ok(())
}

#[test]
fn test_completions() -> Result<()> {
    let dir = TempDir::new()?;

    mirrorsync(&dir)?
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("mirrorsync"));
    Ok(())
}
