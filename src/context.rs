// File: ./src/context.rs
/*! Application context abstraction for filesystem paths.

`AppContext` tells the rest of the program where the configuration lives.
Two implementations are provided:

- `StandardContext`: uses `directories::ProjectDirs`, or an explicit
  override root.
- `TestContext`: a unique temporary directory that is removed on drop.
*/

use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub trait AppContext: std::fmt::Debug {
    fn get_config_dir(&self) -> Result<PathBuf>;

    fn get_config_file_path(&self) -> Result<PathBuf> {
        Ok(self.get_config_dir()?.join("config.toml"))
    }
}

// --- Production Implementation ---

#[derive(Clone, Debug)]
pub struct StandardContext {
    override_root: Option<PathBuf>,
}

impl StandardContext {
    /// When `override_root` is `Some(path)`, the config directory is `path/config`.
    pub fn new(override_root: Option<PathBuf>) -> Self {
        Self { override_root }
    }

    fn get_proj_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("org", "ical2rem", "ical2rem")
    }
}

impl AppContext for StandardContext {
    // Read-only lookup: nothing is created, a missing directory just means no config.
    fn get_config_dir(&self) -> Result<PathBuf> {
        if let Some(root) = &self.override_root {
            return Ok(root.join("config"));
        }
        let proj = Self::get_proj_dirs()
            .with_context(|| "Could not determine the configuration directory")?;
        Ok(proj.config_dir().to_path_buf())
    }
}

// --- Test Implementation ---

#[derive(Clone, Debug)]
pub struct TestContext {
    pub root: PathBuf,
}

impl TestContext {
    /// Creates a new TestContext backed by a unique temporary directory.
    pub fn new() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let root = std::env::temp_dir().join(format!("ical2rem_test_{}", uuid));
        std::fs::create_dir_all(&root).expect("failed to create TestContext temp dir");
        Self { root }
    }

    /// Writes `contents` as the config file and returns its path.
    pub fn write_config(&self, contents: &str) -> Result<PathBuf> {
        let path = self.get_config_file_path()?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write test config {:?}", path))?;
        Ok(path)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl AppContext for TestContext {
    fn get_config_dir(&self) -> Result<PathBuf> {
        let p = self.root.join("config");
        std::fs::create_dir_all(&p)?;
        Ok(p)
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        // Best-effort cleanup; ignore errors.
        let _ = std::fs::remove_dir_all(&self.root);
    }
}
