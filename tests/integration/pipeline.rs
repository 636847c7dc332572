use anyhow::Result;
use selfswap::core::{Precondition, UpdateError};
use selfswap::test_utils::{InstallFixture, build_zip, init_test_logging};
use selfswap::upgrade::{
    AgentKind, ArchiveFetcher, DeferredExecutor, OperationPlan, PlanRunner, RemoteVersionProbe, Step,
    UpdatePlanner, list_backups,
};
use selfswap::version::{VersionComparison, compare};
use std::time::Duration;
use tempfile::TempDir;

use super::write_version_page;

/// Probe a local page, stage a local archive, plan and run the swap in-process.
#[tokio::test]
async fn test_full_pipeline_with_runner() -> Result<()> {
    init_test_logging(None);
    let remote = TempDir::new()?;
    let page = remote.path().join("downloads.html");
    write_version_page(&page, "1.1");
    let archive = remote.path().join("app-1.1.zip");
    build_zip(&archive, &[("app", "#!/bin/sh\necho 1.1\n"), ("data/", ""), ("data/table.csv", "new")])?;

    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "#!/bin/sh\necho 1.0.9\n")?;
    fixture.install_file("data/table.csv", "old")?;
    fixture.install_file("notes.txt", "user notes")?;

    let version = RemoteVersionProbe::new()?.fetch(&page.display().to_string(), "version").await?;
    assert_eq!(version, "1.1");
    assert_eq!(compare("1.0.9", &version)?, VersionComparison::Higher);

    ArchiveFetcher::new()?
        .with_progress(false)
        .fetch_and_stage(&archive.display().to_string(), fixture.staging())
        .await?;

    let planner = UpdatePlanner::new(fixture.root()).with_helper_name(AgentKind::Native.helper_file_name());
    let plan = planner.plan(fixture.staging(), None, true)?;
    let prepared = DeferredExecutor::new(AgentKind::Native).with_delay(Duration::ZERO).write_helper(&plan)?;

    let loaded = OperationPlan::from_json(&std::fs::read_to_string(&prepared.helper_path)?)?;
    PlanRunner::new(&loaded).run()?;

    let backup = plan.backup_dir.clone().unwrap();
    assert_eq!(std::fs::read_to_string(fixture.root().join("data/table.csv"))?, "new");
    assert_eq!(std::fs::read_to_string(backup.join("data/table.csv"))?, "old");
    assert_eq!(std::fs::read_to_string(backup.join("notes.txt"))?, "user notes");
    assert!(!fixture.root().join("notes.txt").exists());
    assert!(!fixture.staging().exists());
    assert!(!prepared.helper_path.exists());

    let backups = list_backups(fixture.root(), "UpdaterBackup")?;
    assert_eq!(backups.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_traversal_archive_is_rejected_before_planning() -> Result<()> {
    let remote = TempDir::new()?;
    let archive = remote.path().join("evil.zip");
    build_zip(&archive, &[("app", "new"), ("../../outside.txt", "gotcha")])?;

    let fixture = InstallFixture::new()?;
    fixture.install_file("app", "old")?;

    let err = ArchiveFetcher::new()?
        .with_progress(false)
        .fetch_and_stage(&archive.display().to_string(), fixture.staging())
        .await
        .unwrap_err();

    assert!(matches!(err, UpdateError::Extract { .. }));
    assert!(!fixture.root().parent().unwrap().join("outside.txt").exists());
    Ok(())
}

#[test]
fn test_plan_ordering_holds_for_nested_installations() -> Result<()> {
    let fixture = InstallFixture::new()?;
    for name in ["bin/app", "lib/a.so", "lib/b.so", "share/doc/readme", "config.ini"] {
        fixture.install_file(name, "old")?;
    }
    fixture.stage_executable("bin/app", "new")?;

    let plan = UpdatePlanner::new(fixture.root()).plan(fixture.staging(), Some("bin/app"), true)?;
    let labels = plan.shape();

    let last_backup = labels.iter().rposition(|l| *l == "backup").unwrap();
    let first_delete = labels.iter().position(|l| *l == "delete").unwrap();
    let last_delete = labels.iter().rposition(|l| *l == "delete").unwrap();
    let copy_in = labels.iter().position(|l| *l == "copy_contents").unwrap();

    assert!(last_backup < first_delete);
    assert!(last_delete < copy_in);
    assert_eq!(labels[labels.len() - 2], "launch");
    assert_eq!(labels[labels.len() - 1], "remove_helper");
    assert_eq!(plan.launch_target(), Some(fixture.root().join("bin/app").as_path()));
    assert!(matches!(plan.steps[0], Step::Backup { .. }));
    Ok(())
}

#[test]
fn test_planner_refuses_empty_install_root() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.stage_file("app", "new")?;

    let err = UpdatePlanner::new(fixture.root()).plan(fixture.staging(), None, true).unwrap_err();
    assert!(matches!(
        err,
        UpdateError::Validation {
            precondition: Precondition::InstallRootEmpty,
            ..
        }
    ));
    Ok(())
}

#[test]
fn test_compare_properties() -> Result<()> {
    let versions = ["0", "0.0.1", "1", "1.0", "1.0.0.1", "2", "2.10", "2.9.9", "10.0"];
    for a in versions {
        assert_eq!(compare(a, a)?, VersionComparison::Equal);
        for b in versions {
            assert_eq!(compare(a, b)?, compare(b, a)?.reverse(), "{a} vs {b}");
        }
    }
    assert_eq!(compare("2.9.9", "2.10")?, VersionComparison::Higher);
    Ok(())
}
