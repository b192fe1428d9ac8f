//! Root context contracts and discovery.
//!
//! A directory is an AIVK root iff it directly contains the [`ROOT_MARKER`]
//! entry. The marker is only tested for presence; its contents belong to the
//! host and are never read or written here.
//!
//! The host runtime owns the mounted root. This crate sees it through the
//! [`RootContext`] trait and obtains new mounts through a [`RootMounter`].

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

pub mod local;
pub mod locator;

pub use local::{
    LocalMounter, LocalRoot, ModuleManifest, ModuleMeta, DEFAULT_MODULES_DIR, MODULE_MANIFEST_FILE,
};
pub use locator::{find_root, RootLocator, CALLER_ROOT_DEPTH};

/// Reserved entry name marking a directory as the project root.
pub const ROOT_MARKER: &str = ".aivk";

/// Returns `true` when `dir` directly contains the root marker.
///
/// The marker entry itself is tested, so a symlink counts even when its
/// target is missing.
pub fn is_root_dir(dir: &Path) -> bool {
    std::fs::symlink_metadata(dir.join(ROOT_MARKER)).is_ok()
}

/// A mounted project root, owned by the host runtime.
///
/// Implementations must tolerate concurrent readers: the host may refresh the
/// status table while other modules are loading.
pub trait RootContext: Send + Sync + Debug {
    /// Canonical absolute path of the root directory.
    fn path(&self) -> &Path;

    /// Whether the named module is present and enabled.
    fn check_module_status(&self, name: &str) -> bool;

    /// Recompute status metadata for every module under the root.
    ///
    /// This mutates the host's status table. The returned count of refreshed
    /// modules is informational.
    ///
    /// # Errors
    ///
    /// Returns a host-defined error if the metadata cannot be recomputed.
    fn refresh_all_metadata(&self) -> anyhow::Result<usize>;
}

/// Mounts a root context at a directory already known to carry the marker.
pub trait RootMounter: Send + Sync {
    /// Mount the root at `path`.
    ///
    /// # Errors
    ///
    /// Returns a host-defined error if the directory cannot be mounted.
    fn mount(&self, path: &Path) -> anyhow::Result<Arc<dyn RootContext>>;
}

impl<F> RootMounter for F
where
    F: Fn(&Path) -> anyhow::Result<Arc<dyn RootContext>> + Send + Sync,
{
    fn mount(&self, path: &Path) -> anyhow::Result<Arc<dyn RootContext>> {
        self(path)
    }
}
