//! Detached agents carrying out a swap after the committing process moves on.
//!
//! These tests start real `sh` and native agents, so they only run on Unix. Each one
//! polls until the agent has removed its helper artifact, which is the last step of
//! every plan.

#![cfg(unix)]

use anyhow::{Result, bail};
use assert_cmd::Command;
use predicates::prelude::*;
use selfswap::test_utils::{InstallFixture, build_zip};
use selfswap::upgrade::{AgentKind, DeferredExecutor, UpdatePlanner};
use serial_test::serial;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

use super::write_version_page;

fn wait_until_gone(path: &Path) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(20);
    while path.exists() {
        if Instant::now() > deadline {
            bail!("agent did not finish: {} still exists", path.display());
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    Ok(())
}

fn seed_installation(fixture: &InstallFixture) -> Result<()> {
    fixture.install_file("app", "#!/bin/sh\necho old\n")?;
    fixture.install_file("assets/logo.svg", "<svg/>")?;
    fixture.install_file("it's quoted.txt", "apostrophe")?;
    fixture.stage_file("app", "#!/bin/sh\necho new\n")?;
    fixture.stage_file("assets/logo.svg", "<svg version=\"2\"/>")?;
    Ok(())
}

#[test]
#[serial]
fn test_shell_agent_swaps_installation() -> Result<()> {
    let fixture = InstallFixture::new()?;
    seed_installation(&fixture)?;

    let planner = UpdatePlanner::new(fixture.root()).with_helper_name(AgentKind::Shell.helper_file_name());
    let plan = planner.plan(fixture.staging(), None, true)?;
    let receipt = DeferredExecutor::new(AgentKind::Shell).with_delay(Duration::ZERO).commit(&plan)?;

    assert_eq!(receipt.kind, AgentKind::Shell);
    assert!(receipt.pid > 0);
    wait_until_gone(&receipt.helper_path)?;
    wait_until_gone(fixture.staging())?;

    assert_eq!(std::fs::read_to_string(fixture.root().join("app"))?, "#!/bin/sh\necho new\n");
    assert!(!fixture.root().join("it's quoted.txt").exists());

    let backup = plan.backup_dir.unwrap();
    assert_eq!(std::fs::read_to_string(backup.join("it's quoted.txt"))?, "apostrophe");
    assert_eq!(std::fs::read_to_string(backup.join("assets/logo.svg"))?, "<svg/>");
    Ok(())
}

#[test]
#[serial]
fn test_native_agent_swaps_installation() -> Result<()> {
    let fixture = InstallFixture::new()?;
    seed_installation(&fixture)?;

    let planner = UpdatePlanner::new(fixture.root()).with_helper_name(AgentKind::Native.helper_file_name());
    let plan = planner.plan(fixture.staging(), None, false)?;
    let receipt = DeferredExecutor::new(AgentKind::Native)
        .with_delay(Duration::ZERO)
        .with_agent_binary(assert_cmd::cargo::cargo_bin("selfswap"))
        .commit(&plan)?;

    wait_until_gone(&receipt.helper_path)?;
    // The temporary agent copy deletes itself once the plan has run.
    wait_until_gone(&receipt.program)?;

    assert_eq!(std::fs::read_to_string(fixture.root().join("assets/logo.svg"))?, "<svg version=\"2\"/>");
    assert!(!fixture.staging().exists());
    assert_eq!(fixture.root_entries()?, vec!["app".to_string(), "assets".to_string()]);
    Ok(())
}

#[test]
#[serial]
fn test_apply_commits_and_relaunches() -> Result<()> {
    let remote = TempDir::new()?;
    let page = remote.path().join("downloads.html");
    write_version_page(&page, "3.0");
    let archive = remote.path().join("app-3.0.zip");
    build_zip(&archive, &[("app.sh", "#!/bin/sh\necho relaunched > launched.txt\n"), ("VERSION", "3.0")])?;

    let fixture = InstallFixture::new()?;
    fixture.install_file("app.sh", "#!/bin/sh\n")?;
    fixture.install_file("VERSION", "2.9")?;

    Command::cargo_bin("selfswap")?
        .env("SELFSWAP_CONFIG", remote.path().join("missing-config.toml"))
        .env("SELFSWAP_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .arg("apply")
        .arg("--root")
        .arg(fixture.root())
        .args(["--current", "2.9", "--restart", "app.sh", "--agent", "shell", "--delay", "0"])
        .arg("--url")
        .arg(&page)
        .arg("--archive")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("Update agent started"));

    wait_until_gone(&fixture.root().join(AgentKind::Shell.helper_file_name()))?;
    wait_until_gone(fixture.staging())?;
    assert_eq!(std::fs::read_to_string(fixture.root().join("VERSION"))?, "3.0");

    // The relaunched program runs in the install root.
    let marker = fixture.root().join("launched.txt");
    let deadline = Instant::now() + Duration::from_secs(20);
    while !marker.exists() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(100));
    }
    assert_eq!(std::fs::read_to_string(marker)?, "relaunched\n");
    Ok(())
}

#[test]
#[serial]
fn test_relative_install_root_is_committed_absolute() -> Result<()> {
    let fixture = InstallFixture::new()?;
    seed_installation(&fixture)?;

    let original_dir = std::env::current_dir()?;
    std::env::set_current_dir(fixture.root())?;
    let planned = UpdatePlanner::new(".")
        .with_helper_name(AgentKind::Shell.helper_file_name())
        .plan(Path::new("update-staging"), None, false);
    std::env::set_current_dir(original_dir)?;
    let plan = planned?;

    assert!(plan.install_root.is_absolute());
    let receipt = DeferredExecutor::new(AgentKind::Shell).with_delay(Duration::ZERO).commit(&plan)?;
    assert!(receipt.helper_path.is_absolute());

    wait_until_gone(&receipt.helper_path)?;
    wait_until_gone(fixture.staging())?;
    assert_eq!(std::fs::read_to_string(fixture.root().join("app"))?, "#!/bin/sh\necho new\n");
    Ok(())
}

#[test]
#[serial]
fn test_apply_with_relative_root() -> Result<()> {
    let remote = TempDir::new()?;
    let page = remote.path().join("downloads.html");
    write_version_page(&page, "1.1");
    let archive = remote.path().join("app-1.1.zip");
    build_zip(&archive, &[("VERSION", "1.1")])?;

    let fixture = InstallFixture::new()?;
    fixture.install_file("VERSION", "1.0")?;

    Command::cargo_bin("selfswap")?
        .current_dir(fixture.root())
        .env("SELFSWAP_CONFIG", remote.path().join("missing-config.toml"))
        .env("SELFSWAP_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .args(["apply", "--root", ".", "--current", "1.0", "--agent", "shell", "--delay", "0", "--no-backup"])
        .arg("--url")
        .arg(&page)
        .arg("--archive")
        .arg(&archive)
        .assert()
        .success();

    wait_until_gone(&fixture.root().join(AgentKind::Shell.helper_file_name()))?;
    wait_until_gone(fixture.staging())?;
    assert_eq!(std::fs::read_to_string(fixture.root().join("VERSION"))?, "1.1");
    Ok(())
}
