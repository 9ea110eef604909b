//! Store abstraction for nestview's on-disk state.
//!
//! A store is the `.nestview/` directory next to a scene. It holds the
//! document database, the config file and the append-only event logs.

use std::path::{Path, PathBuf};

/// Directory name of a nestview store inside a project.
pub const STORE_DIR: &str = ".nestview";

/// Store handle representing one open document's workspace.
///
/// All document state (objects, selection, the persisted view stack) is
/// scoped to a store. Opening a different store is the equivalent of loading
/// a different document.
#[derive(Debug, Clone)]
pub struct Store {
    /// Absolute path to the store root directory (`<project>/.nestview`)
    pub root: PathBuf,
}

impl Store {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store rooted at `<project_dir>/.nestview`.
    pub fn for_project(project_dir: &Path) -> Self {
        Self::new(project_dir.join(STORE_DIR))
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.toml")
    }
}
