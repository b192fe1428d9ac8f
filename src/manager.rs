//! Binding between a mounted root and the loader plugin.
//!
//! A [`ModuleManager`] holds a shared reference to one [`RootContext`] and
//! resolves sibling modules from an explicit base path. It performs no I/O
//! when constructed and never mutates itself afterwards.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::LoaderError;
use crate::root::{RootContext, RootLocator, DEFAULT_MODULES_DIR};

/// Manager bound to a single mounted root.
#[derive(Debug, Clone)]
pub struct ModuleManager {
    root: Arc<dyn RootContext>,
    modules_dir: PathBuf,
}

impl ModuleManager {
    /// Bind to `root`, resolving modules under `<root>/modules`.
    pub fn new(root: Arc<dyn RootContext>) -> Self {
        let modules_dir = root.path().join(DEFAULT_MODULES_DIR);
        Self { root, modules_dir }
    }

    /// Use `dir` as the base path for sibling modules. Relative paths are
    /// taken relative to the root.
    pub fn with_modules_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.modules_dir = self.root.path().join(dir);
        self
    }

    /// Mount `root` directly and bind to it.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::RootNotFound`] if `root` is not a marked
    /// directory, or a host error if mounting fails.
    pub fn from_root_path(locator: &RootLocator, root: &Path) -> Result<Self, LoaderError> {
        tracing::info!(root = %root.display(), "creating module manager from root path");
        Ok(Self::new(locator.mount_from_known_path(root)?))
    }

    /// Walk up from `start` to the nearest root and bind to it.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::RootNotFound`] if no ancestor is marked, or a
    /// host error if mounting fails.
    pub fn find(locator: &RootLocator, start: &Path) -> Result<Self, LoaderError> {
        Ok(Self::new(locator.locate(start)?))
    }

    /// Bind to the root found from the caller's own file location.
    ///
    /// # Errors
    ///
    /// Same as [`RootLocator::mount_from_caller_location`].
    pub fn from_caller_location(
        locator: &RootLocator,
        caller_file: &Path,
    ) -> Result<Self, LoaderError> {
        Ok(Self::new(locator.mount_from_caller_location(caller_file)?))
    }

    /// The bound root.
    pub fn root(&self) -> &Arc<dyn RootContext> {
        &self.root
    }

    /// Base path for sibling modules.
    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Directory of the sibling module `name`.
    pub fn module_path(&self, name: &str) -> PathBuf {
        self.modules_dir.join(name)
    }

    /// Whether the root reports `name` as enabled.
    pub fn is_module_enabled(&self, name: &str) -> bool {
        self.root.check_module_status(name)
    }

    /// Ask the root to recompute metadata for every module.
    ///
    /// This mutates the host's status table.
    ///
    /// # Errors
    ///
    /// Returns the host's error unchanged.
    pub fn refresh_metadata(&self) -> Result<usize, LoaderError> {
        self.root.refresh_all_metadata().map_err(LoaderError::Host)
    }
}
