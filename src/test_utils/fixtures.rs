//! Test fixtures for install roots, staging directories and update archives.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::constants::DEFAULT_STAGING_DIR;

/// A temporary install root with a staging directory inside it.
///
/// The temporary directory is removed when the fixture is dropped.
pub struct InstallFixture {
    temp: TempDir,
    staging: PathBuf,
}

impl InstallFixture {
    /// Create an empty install root. The staging directory is not created until
    /// something is staged.
    pub fn new() -> Result<Self> {
        let temp = TempDir::new().context("Failed to create temp dir")?;
        let staging = temp.path().join(DEFAULT_STAGING_DIR);
        Ok(Self {
            temp,
            staging,
        })
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    /// Write a file of the current installation, creating parent directories.
    pub fn install_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        write_file(&self.root().join(relative), content)
    }

    /// Create an (empty) directory of the current installation.
    pub fn install_dir(&self, relative: &str) -> Result<PathBuf> {
        let path = self.root().join(relative);
        fs::create_dir_all(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(path)
    }

    /// Write a file into the staging directory.
    pub fn stage_file(&self, relative: &str, content: &str) -> Result<PathBuf> {
        write_file(&self.staging.join(relative), content)
    }

    /// Write an executable into the staging directory (mode 0755 on Unix).
    pub fn stage_executable(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.stage_file(relative, content)?;
        make_executable(&path)?;
        Ok(path)
    }

    /// Sorted names of the entries directly under the install root.
    pub fn root_entries(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.root())? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

fn write_file(path: &Path, content: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path.to_path_buf())
}

fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}

/// Write a zip archive at `dest`.
///
/// Entries ending in `/` become directory entries; the rest are files with the given
/// contents. Files whose name ends in `.sh` or has no extension are marked 0755.
pub fn build_zip(dest: &Path, entries: &[(&str, &str)]) -> Result<()> {
    let file = fs::File::create(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
    let mut zip = ZipWriter::new(file);

    for (name, content) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, SimpleFileOptions::default())?;
            continue;
        }
        let executable = name.ends_with(".sh") || !name.rsplit('/').next().unwrap_or(name).contains('.');
        let mode = if executable { 0o755 } else { 0o644 };
        zip.start_file(*name, SimpleFileOptions::default().unix_permissions(mode))?;
        zip.write_all(content.as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}
