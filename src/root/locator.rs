//! Upward root discovery and mount caching.
//!
//! [`find_root`] walks from a start path towards the filesystem root and
//! stops at the first directory carrying the root marker. [`RootLocator`]
//! composes that walk with a [`RootMounter`] and keeps one mount per
//! canonical root path, so every caller resolving into the same root shares
//! the same [`RootContext`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use super::{is_root_dir, RootContext, RootMounter};
use crate::config::LocatorConfig;
use crate::error::LoaderError;

/// Ancestor levels between a caller's own file and the directory the walk
/// starts from, for the `<root>/modules/<module>/<dir>/<file>` layout.
pub const CALLER_ROOT_DEPTH: usize = 3;

/// Find the nearest directory at or above `start` containing the root marker.
///
/// `start` is canonicalized first; a path that does not exist is made
/// absolute lexically instead. The filesystem root itself is tested too.
///
/// # Errors
///
/// Returns [`LoaderError::RootNotFound`] when no ancestor carries the marker.
pub fn find_root(start: &Path) -> Result<PathBuf, LoaderError> {
    let origin = resolve_start(start)?;
    for dir in origin.ancestors() {
        if is_root_dir(dir) {
            debug!(start = %start.display(), root = %dir.display(), "root marker found");
            // The lexical fallback may still contain symlinks; the marked
            // directory exists, so it can be canonicalized.
            return Ok(std::fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf()));
        }
    }
    Err(LoaderError::RootNotFound {
        start: start.to_path_buf(),
    })
}

/// Canonical form of `start`, or its absolute lexical form when missing.
fn resolve_start(start: &Path) -> Result<PathBuf, LoaderError> {
    match std::fs::canonicalize(start) {
        Ok(path) => Ok(path),
        Err(_) => std::path::absolute(start).map_err(|_| LoaderError::RootNotFound {
            start: start.to_path_buf(),
        }),
    }
}

/// Resolves start paths to mounted roots.
pub struct RootLocator {
    mounter: Arc<dyn RootMounter>,
    caller_depth: usize,
    /// Mounted roots keyed by canonical path. `None` disables caching.
    mounts: Option<RwLock<HashMap<PathBuf, Arc<dyn RootContext>>>>,
}

impl std::fmt::Debug for RootLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootLocator")
            .field("caller_depth", &self.caller_depth)
            .field("cached_mounts", &self.mounted_count())
            .finish()
    }
}

impl RootLocator {
    /// Create a locator with the default caller depth and mount caching on.
    pub fn new(mounter: impl RootMounter + 'static) -> Self {
        Self {
            mounter: Arc::new(mounter),
            caller_depth: CALLER_ROOT_DEPTH,
            mounts: Some(RwLock::new(HashMap::new())),
        }
    }

    /// Create a locator from the `[locator]` config section.
    pub fn from_config(mounter: impl RootMounter + 'static, config: &LocatorConfig) -> Self {
        let locator = Self::new(mounter).with_caller_depth(config.caller_depth);
        if config.cache_mounts {
            locator
        } else {
            locator.without_cache()
        }
    }

    /// Override the ancestor depth used by [`Self::mount_from_caller_location`].
    pub fn with_caller_depth(mut self, depth: usize) -> Self {
        self.caller_depth = depth;
        self
    }

    /// Mount on every call instead of sharing one mount per root.
    pub fn without_cache(mut self) -> Self {
        self.mounts = None;
        self
    }

    /// Ancestor depth used by [`Self::mount_from_caller_location`].
    pub fn caller_depth(&self) -> usize {
        self.caller_depth
    }

    /// Walk up from `start` and mount the nearest marked directory.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::RootNotFound`] when no ancestor is marked, or a
    /// host error if mounting fails.
    pub fn locate(&self, start: &Path) -> Result<Arc<dyn RootContext>, LoaderError> {
        let root = find_root(start)?;
        self.mount_cached(root)
    }

    /// Run [`Self::locate`] on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`Self::locate`]; a panicked or cancelled walk surfaces as a
    /// host error.
    pub async fn locate_async(
        self: Arc<Self>,
        start: PathBuf,
    ) -> Result<Arc<dyn RootContext>, LoaderError> {
        tokio::task::spawn_blocking(move || self.locate(&start))
            .await
            .map_err(|e| LoaderError::Host(anyhow::anyhow!("root discovery task failed: {e}")))?
    }

    /// Mount `root` directly without walking.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::RootNotFound`] when `root` does not exist or
    /// lacks the marker, or a host error if mounting fails.
    pub fn mount_from_known_path(&self, root: &Path) -> Result<Arc<dyn RootContext>, LoaderError> {
        if !root.is_dir() || !is_root_dir(root) {
            return Err(LoaderError::RootNotFound {
                start: root.to_path_buf(),
            });
        }
        let canonical = std::fs::canonicalize(root).map_err(|e| {
            LoaderError::Host(anyhow::anyhow!(
                "failed to canonicalize root {}: {e}",
                root.display()
            ))
        })?;
        self.mount_cached(canonical)
    }

    /// Walk up from the directory `caller_depth` levels above `caller_file`.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::RootNotFound`] when `caller_file` has fewer
    /// ancestors than the configured depth or no marked ancestor exists.
    pub fn mount_from_caller_location(
        &self,
        caller_file: &Path,
    ) -> Result<Arc<dyn RootContext>, LoaderError> {
        let caller = resolve_start(caller_file)?;
        let Some(start) = caller.ancestors().nth(self.caller_depth) else {
            return Err(LoaderError::RootNotFound {
                start: caller_file.to_path_buf(),
            });
        };
        info!(
            caller = %caller.display(),
            start = %start.display(),
            depth = self.caller_depth,
            "resolving root from caller location"
        );
        self.locate(start)
    }

    /// [`Self::mount_from_caller_location`] anchored at the running executable.
    ///
    /// # Errors
    ///
    /// Returns a host error if the executable path is unavailable, otherwise
    /// the same errors as [`Self::mount_from_caller_location`].
    pub fn mount_from_current_exe(&self) -> Result<Arc<dyn RootContext>, LoaderError> {
        let exe = std::env::current_exe().map_err(|e| {
            LoaderError::Host(anyhow::anyhow!("cannot determine current executable: {e}"))
        })?;
        self.mount_from_caller_location(&exe)
    }

    /// Number of roots currently held in the mount cache.
    pub fn mounted_count(&self) -> usize {
        match &self.mounts {
            Some(mounts) => match mounts.read() {
                Ok(map) => map.len(),
                Err(e) => {
                    warn!(error = %e, "root mount cache lock poisoned in mounted_count");
                    0
                }
            },
            None => 0,
        }
    }

    fn mount_cached(&self, root: PathBuf) -> Result<Arc<dyn RootContext>, LoaderError> {
        let Some(mounts) = &self.mounts else {
            info!(root = %root.display(), "mounting root");
            return self.mounter.mount(&root).map_err(LoaderError::from);
        };

        match mounts.read() {
            Ok(map) => {
                if let Some(existing) = map.get(&root) {
                    debug!(root = %root.display(), "reusing mounted root");
                    return Ok(Arc::clone(existing));
                }
            }
            Err(e) => warn!(error = %e, "root mount cache lock poisoned in mount_cached"),
        }

        info!(root = %root.display(), "mounting root");
        let mounted = self.mounter.mount(&root)?;

        match mounts.write() {
            // A concurrent caller may have mounted the same root meanwhile;
            // the first mount stored wins.
            Ok(mut map) => Ok(Arc::clone(map.entry(root).or_insert(mounted))),
            Err(e) => {
                warn!(error = %e, "root mount cache lock poisoned, returning uncached mount");
                Ok(mounted)
            }
        }
    }
}
