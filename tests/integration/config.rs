//! Config file discovery and the precedence of flags over `[update]` settings.

use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use selfswap::config::{AgentSetting, UpdaterConfig};
use selfswap::test_utils::{InstallFixture, build_zip};
use selfswap::upgrade::OperationPlan;
use tempfile::TempDir;

use super::write_version_page;

fn selfswap() -> Command {
    let mut cmd = Command::cargo_bin("selfswap").unwrap();
    cmd.env("SELFSWAP_NO_PROGRESS", "1").env("NO_COLOR", "1").env_remove("SELFSWAP_CONFIG");
    cmd
}

#[tokio::test]
async fn test_check_reads_update_section() -> Result<()> {
    let temp = TempDir::new()?;
    let page = temp.path().join("downloads.html");
    write_version_page(&page, "5.2");

    let mut config = UpdaterConfig::default();
    config.update.version_url = Some(page.display().to_string());
    config.update.current_version = Some("5.1.9".to_string());
    let config_path = temp.path().join("selfswap.toml");
    config.save_to(&config_path).await?;

    selfswap()
        .arg("--config")
        .arg(&config_path)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("Update available: 5.1.9 -> 5.2"));

    // Flags win over the file.
    selfswap()
        .arg("--config")
        .arg(&config_path)
        .args(["check", "--current", "5.2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("You are on the latest version (5.2, remote 5.2)"));
    Ok(())
}

#[test]
fn test_config_env_var_is_honoured() -> Result<()> {
    let temp = TempDir::new()?;
    let page = temp.path().join("downloads.html");
    std::fs::write(&page, "<p>\n<span class=\"v\" id=\"build-version\">7.0.1</span>\n</p>\n")?;

    let config_path = temp.path().join("env.toml");
    std::fs::write(
        &config_path,
        format!(
            "[update]\nversion_url = '{}'\nelement_id = \"build-version\"\ncurrent_version = \"7.0.1\"\n",
            page.display()
        ),
    )?;

    selfswap()
        .env("SELFSWAP_CONFIG", &config_path)
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("You are on the latest version (7.0.1, remote 7.0.1)"));
    Ok(())
}

#[tokio::test]
async fn test_plan_uses_configured_staging_and_prefix() -> Result<()> {
    let outside = TempDir::new()?;
    let archive = outside.path().join("app.zip");
    build_zip(&archive, &[("app", "new")])?;

    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "old")?;
    let staging = fixture.root().join("incoming");
    selfswap().arg("fetch").arg(&archive).arg(&staging).assert().success();

    let mut config = UpdaterConfig::default();
    config.update.staging_dir = "incoming".to_string();
    config.update.backup_prefix = "Rollback".to_string();
    config.update.agent = AgentSetting::Batch;
    let config_path = outside.path().join("selfswap.toml");
    config.save_to(&config_path).await?;

    let output = selfswap()
        .arg("--config")
        .arg(&config_path)
        .arg("plan")
        .arg("--root")
        .arg(fixture.root())
        .args(["--format", "json"])
        .output()?;
    assert!(output.status.success());

    let plan = OperationPlan::from_json(std::str::from_utf8(&output.stdout)?)?;
    assert_eq!(plan.staging_dir, staging);
    assert_eq!(plan.shape(), vec!["backup", "delete", "copy_contents", "remove_staging", "remove_helper"]);
    let backup_name = plan.backup_dir.unwrap().file_name().unwrap().to_string_lossy().into_owned();
    assert!(backup_name.starts_with("Rollback_"));
    assert!(plan.helper_path.ends_with("selfswap-agent.bat"));
    Ok(())
}

#[test]
fn test_invalid_config_is_reported() -> Result<()> {
    let temp = TempDir::new()?;
    let config_path = temp.path().join("broken.toml");
    std::fs::write(&config_path, "[update\nversion_url = 3")?;

    selfswap()
        .arg("--config")
        .arg(&config_path)
        .args(["check", "--current", "1.0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("config"));
    Ok(())
}
