//! Tests for the `selfswap` binary.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use selfswap::test_utils::{InstallFixture, build_zip};
use selfswap::upgrade::{AgentKind, OperationPlan, UpdatePlanner};
use std::path::Path;
use tempfile::TempDir;

use super::write_version_page;

/// A `selfswap` invocation isolated from the user's config file and terminal.
fn selfswap(scratch: &Path) -> Command {
    let mut cmd = Command::cargo_bin("selfswap").unwrap();
    cmd.env("SELFSWAP_CONFIG", scratch.join("missing-config.toml"))
        .env("SELFSWAP_NO_PROGRESS", "1")
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_compare_reports_direction() -> Result<()> {
    let scratch = TempDir::new()?;

    selfswap(scratch.path())
        .args(["compare", "1.0.3", "1.0.10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("remote version 1.0.10 is higher than current version 1.0.3"));

    selfswap(scratch.path())
        .args(["compare", "2.0", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("equals"));

    selfswap(scratch.path())
        .args(["compare", "3.1", "3.0.9"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is lower than"));
    Ok(())
}

#[test]
fn test_compare_invalid_version_fails() -> Result<()> {
    let scratch = TempDir::new()?;

    selfswap(scratch.path())
        .args(["compare", "1.0", "1.0-beta"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("InvalidFormat"))
        .stderr(predicate::str::contains("remote version string '1.0-beta'"));
    Ok(())
}

#[test]
fn test_check_against_local_page() -> Result<()> {
    let scratch = TempDir::new()?;
    let page = scratch.path().join("downloads.html");
    write_version_page(&page, "2.4.1");
    let url = format!("file://{}", page.display());

    selfswap(scratch.path())
        .args(["check", "--current", "2.4", "--url", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available: 2.4 -> 2.4.1"));

    selfswap(scratch.path())
        .args(["check", "--current", "2.4.1.0", "--url", &url])
        .assert()
        .success()
        .stdout(predicate::str::contains("You are on the latest version"));
    Ok(())
}

#[test]
fn test_check_missing_marker_is_not_found() -> Result<()> {
    let scratch = TempDir::new()?;
    let page = scratch.path().join("downloads.html");
    write_version_page(&page, "2.4.1");

    selfswap(scratch.path())
        .args(["check", "--current", "2.4", "--element-id", "release"])
        .arg("--url")
        .arg(&page)
        .assert()
        .failure()
        .stderr(predicate::str::contains("NotFound"))
        .stderr(predicate::str::contains("release"));
    Ok(())
}

#[test]
fn test_check_without_url_explains_what_is_missing() -> Result<()> {
    let scratch = TempDir::new()?;

    selfswap(scratch.path())
        .args(["check", "--current", "1.0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--url"));
    Ok(())
}

#[test]
fn test_fetch_unpacks_archive() -> Result<()> {
    let scratch = TempDir::new()?;
    let archive = scratch.path().join("app.zip");
    build_zip(&archive, &[("app", "#!/bin/sh\n"), ("lib/", ""), ("lib/core.so", "bytes")])?;
    let destination = scratch.path().join("out/staging");

    selfswap(scratch.path())
        .arg("fetch")
        .arg(&archive)
        .arg(&destination)
        .assert()
        .success()
        .stdout(predicate::str::contains("Unpacked 2 files and 1 directories"));

    assert_eq!(std::fs::read_to_string(destination.join("lib/core.so"))?, "bytes");
    Ok(())
}

#[test]
fn test_fetch_missing_archive_fails() -> Result<()> {
    let scratch = TempDir::new()?;

    selfswap(scratch.path())
        .arg("fetch")
        .arg(scratch.path().join("nope.zip"))
        .arg(scratch.path().join("staging"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("FetchError"));
    Ok(())
}

#[test]
fn test_plan_text_and_json() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "old")?;
    fixture.install_dir("plugins")?;
    fixture.stage_executable("app", "new")?;

    selfswap(fixture.root())
        .arg("plan")
        .arg("--root")
        .arg(fixture.root())
        .args(["--restart", "app", "--agent", "shell"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Update plan for"))
        .stdout(predicate::str::contains("delete directory"))
        .stdout(predicate::str::contains("remove helper"));

    let output = selfswap(fixture.root())
        .arg("plan")
        .arg("--root")
        .arg(fixture.root())
        .args(["--no-backup", "--agent", "native", "--format", "json"])
        .output()?;
    assert!(output.status.success());

    let plan = OperationPlan::from_json(std::str::from_utf8(&output.stdout)?)?;
    assert_eq!(plan.backup_dir, None);
    assert_eq!(plan.shape(), vec!["delete", "delete", "copy_contents", "remove_staging", "remove_helper"]);
    assert_eq!(plan.helper_path, fixture.root().join(AgentKind::Native.helper_file_name()));
    Ok(())
}

#[test]
fn test_plan_without_staging_fails_validation() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "old")?;

    selfswap(fixture.root())
        .arg("plan")
        .arg("--root")
        .arg(fixture.root())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ValidationError"))
        .stderr(predicate::str::contains("staging directory does not exist"));
    Ok(())
}

#[test]
fn test_plan_rejects_staging_nested_in_install_entry() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "old")?;
    fixture.install_file("updates/v2/app", "new")?;

    selfswap(fixture.root())
        .arg("plan")
        .arg("--root")
        .arg(fixture.root())
        .args(["--staging", "updates/v2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("staging directory is nested inside an installed directory"));

    assert_eq!(std::fs::read_to_string(fixture.root().join("updates/v2/app"))?, "new");
    Ok(())
}

#[test]
fn test_plan_leaves_installation_untouched() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "old")?;
    fixture.install_file("data/db", "rows")?;
    fixture.stage_file("app", "new")?;
    let before = fixture.root_entries()?;

    selfswap(fixture.root()).arg("plan").arg("--root").arg(fixture.root()).assert().success();

    assert_eq!(fixture.root_entries()?, before);
    assert_eq!(std::fs::read_to_string(fixture.root().join("app"))?, "old");
    Ok(())
}

#[test]
fn test_backups_listing() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "old")?;

    selfswap(fixture.root())
        .arg("backups")
        .arg("--root")
        .arg(fixture.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("No backups in"));

    fixture.install_dir("UpdaterBackup_20240102030405000001")?;
    fixture.install_dir("Snapshot_20240102030405000001")?;

    selfswap(fixture.root())
        .arg("backups")
        .arg("--root")
        .arg(fixture.root())
        .assert()
        .success()
        .stdout(predicate::str::contains("UpdaterBackup_20240102030405000001"))
        .stdout(predicate::str::contains("2024-01-02 03:04:05"))
        .stdout(predicate::str::contains("Snapshot_").not());

    selfswap(fixture.root())
        .arg("backups")
        .arg("--root")
        .arg(fixture.root())
        .args(["--prefix", "Snapshot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Snapshot_20240102030405000001"));
    Ok(())
}

#[test]
fn test_apply_dry_run_stages_and_plans() -> Result<()> {
    let remote = TempDir::new()?;
    let page = remote.path().join("downloads.html");
    write_version_page(&page, "1.1");
    let archive = remote.path().join("app-1.1.zip");
    build_zip(&archive, &[("app", "#!/bin/sh\necho 1.1\n"), ("README", "v1.1")])?;

    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "#!/bin/sh\necho 1.0\n")?;
    fixture.install_file("README", "v1.0")?;

    selfswap(remote.path())
        .arg("apply")
        .arg("--root")
        .arg(fixture.root())
        .args(["--current", "1.0", "--restart", "app", "--agent", "shell", "--delay", "3", "--dry-run"])
        .arg("--url")
        .arg(&page)
        .arg("--archive")
        .arg(&archive)
        .assert()
        .success()
        .stdout(predicate::str::contains("remote version 1.1 is higher than current version 1.0"))
        .stdout(predicate::str::contains("wait 3s"))
        .stdout(predicate::str::contains("launch"))
        .stdout(predicate::str::contains("Dry run: nothing committed"));

    assert_eq!(std::fs::read_to_string(fixture.staging().join("README"))?, "v1.1");
    assert_eq!(std::fs::read_to_string(fixture.root().join("README"))?, "v1.0");
    assert!(!fixture.root().join(AgentKind::Shell.helper_file_name()).exists());
    Ok(())
}

#[test]
fn test_apply_stops_when_up_to_date() -> Result<()> {
    let remote = TempDir::new()?;
    let page = remote.path().join("downloads.html");
    write_version_page(&page, "1.0");

    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "old")?;

    selfswap(remote.path())
        .arg("apply")
        .arg("--root")
        .arg(fixture.root())
        .args(["--current", "1.0.0"])
        .arg("--url")
        .arg(&page)
        .arg("--archive")
        .arg(remote.path().join("never-downloaded.zip"))
        .assert()
        .success()
        .stdout(predicate::str::contains("Already on the latest version (1.0.0)"));

    assert!(!fixture.staging().exists());
    Ok(())
}

#[test]
fn test_agent_runs_serialized_plan() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "old")?;
    fixture.install_file("obsolete.txt", "gone soon")?;
    fixture.stage_file("app", "new")?;

    let planner = UpdatePlanner::new(fixture.root()).with_helper_name(AgentKind::Native.helper_file_name());
    let plan = planner.plan(fixture.staging(), None, true)?;
    let helper = fixture.root().join(AgentKind::Native.helper_file_name());
    std::fs::write(&helper, plan.to_json()?)?;

    selfswap(fixture.root()).arg("agent").arg(&helper).assert().success();

    assert_eq!(std::fs::read_to_string(fixture.root().join("app"))?, "new");
    assert!(!fixture.root().join("obsolete.txt").exists());
    assert!(!helper.exists());
    assert!(!fixture.staging().exists());
    let backup = plan.backup_dir.unwrap();
    assert_eq!(std::fs::read_to_string(backup.join("obsolete.txt"))?, "gone soon");
    Ok(())
}

#[test]
fn test_agent_with_unreadable_plan_fails() -> Result<()> {
    let scratch = TempDir::new()?;
    let helper = scratch.path().join("selfswap-plan.json");
    std::fs::write(&helper, "{ not json")?;

    selfswap(scratch.path())
        .arg("agent")
        .arg(&helper)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid plan"));
    Ok(())
}
