//! Filesystem-backed [`RootContext`] for hosts without their own root type.
//!
//! Module status lives in `<root>/<modules_dir>/<module>/module.toml`. The
//! status table is built at mount time and rebuilt by every
//! [`RootContext::refresh_all_metadata`] call. Directories without a
//! manifest are not modules; unparsable manifests are skipped with a warning.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{is_root_dir, RootContext, RootMounter, ROOT_MARKER};
use crate::config::LoaderSettings;

/// Manifest file name inside each module directory.
pub const MODULE_MANIFEST_FILE: &str = "module.toml";

/// Default modules directory, relative to the root.
pub const DEFAULT_MODULES_DIR: &str = "modules";

/// Contents of a module's `module.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleManifest {
    /// Module name. Defaults to the directory name.
    #[serde(default)]
    pub name: Option<String>,
    /// Module version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// Whether the host should load this module.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

fn default_version() -> String {
    "0.0.0".to_owned()
}

fn default_enabled() -> bool {
    true
}

/// One row of the status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMeta {
    /// Module name.
    pub name: String,
    /// Module version string.
    pub version: String,
    /// Whether the module is enabled.
    pub enabled: bool,
    /// Free-form description.
    pub description: String,
    /// Module directory.
    pub dir: PathBuf,
    /// When this row was last recomputed.
    pub refreshed_at: DateTime<Utc>,
}

/// A root mounted from the local filesystem.
pub struct LocalRoot {
    path: PathBuf,
    modules_dir: PathBuf,
    modules: RwLock<BTreeMap<String, ModuleMeta>>,
    refreshes: AtomicU64,
}

impl std::fmt::Debug for LocalRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = match self.modules.read() {
            Ok(modules) => modules.len(),
            Err(_) => 0,
        };
        f.debug_struct("LocalRoot")
            .field("path", &self.path)
            .field("modules_dir", &self.modules_dir)
            .field("module_count", &count)
            .finish()
    }
}

impl LocalRoot {
    /// Mount `path` with modules under [`DEFAULT_MODULES_DIR`].
    ///
    /// # Errors
    ///
    /// Returns an error if `path` lacks the root marker or the modules
    /// directory cannot be read.
    pub fn mount(path: &Path) -> anyhow::Result<Arc<Self>> {
        Self::mount_with_modules_dir(path, Path::new(DEFAULT_MODULES_DIR))
    }

    /// Mount `path` with modules under `modules_dir` (relative to the root
    /// unless absolute).
    ///
    /// # Errors
    ///
    /// Returns an error if `path` lacks the root marker or the modules
    /// directory cannot be read.
    pub fn mount_with_modules_dir(path: &Path, modules_dir: &Path) -> anyhow::Result<Arc<Self>> {
        if !is_root_dir(path) {
            anyhow::bail!(
                "{} is not an AIVK root: missing {ROOT_MARKER}",
                path.display()
            );
        }
        let path = std::fs::canonicalize(path)
            .with_context(|| format!("failed to canonicalize root {}", path.display()))?;
        let modules_dir = path.join(modules_dir);

        let root = Self {
            path,
            modules_dir,
            modules: RwLock::new(BTreeMap::new()),
            refreshes: AtomicU64::new(0),
        };
        let table = root.scan()?;
        let count = table.len();
        if let Ok(mut modules) = root.modules.write() {
            *modules = table;
        }

        info!(root = %root.path.display(), count, "local root mounted");
        Ok(Arc::new(root))
    }

    /// Directory scanned for module manifests.
    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }

    /// Status row for `name`, if present.
    pub fn module(&self, name: &str) -> Option<ModuleMeta> {
        match self.modules.read() {
            Ok(modules) => modules.get(name).cloned(),
            Err(e) => {
                warn!(error = %e, "module status lock poisoned in module");
                None
            }
        }
    }

    /// All status rows, ordered by module name.
    pub fn modules(&self) -> Vec<ModuleMeta> {
        match self.modules.read() {
            Ok(modules) => modules.values().cloned().collect(),
            Err(e) => {
                warn!(error = %e, "module status lock poisoned in modules");
                Vec::new()
            }
        }
    }

    /// Number of completed metadata refreshes since mount.
    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    fn scan(&self) -> anyhow::Result<BTreeMap<String, ModuleMeta>> {
        let mut table = BTreeMap::new();
        if !self.modules_dir.is_dir() {
            debug!(dir = %self.modules_dir.display(), "modules directory missing");
            return Ok(table);
        }

        let mut dirs = std::fs::read_dir(&self.modules_dir)
            .with_context(|| format!("failed to read {}", self.modules_dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect::<Vec<_>>();
        dirs.sort();

        let now = Utc::now();
        for dir in dirs {
            let manifest_path = dir.join(MODULE_MANIFEST_FILE);
            if !manifest_path.is_file() {
                continue;
            }
            let manifest = match load_manifest(&manifest_path) {
                Ok(manifest) => manifest,
                Err(e) => {
                    warn!(
                        path = %manifest_path.display(),
                        error = %e,
                        "skipping invalid module manifest"
                    );
                    continue;
                }
            };

            let dir_name = dir.file_name().and_then(|n| n.to_str()).map(str::to_owned);
            let Some(name) = manifest.name.clone().or(dir_name) else {
                warn!(dir = %dir.display(), "skipping module with non-utf8 directory name");
                continue;
            };

            if table.contains_key(&name) {
                warn!(
                    module = %name,
                    dir = %dir.display(),
                    "duplicate module name, keeping first"
                );
                continue;
            }
            table.insert(
                name.clone(),
                ModuleMeta {
                    name,
                    version: manifest.version,
                    enabled: manifest.enabled,
                    description: manifest.description,
                    dir,
                    refreshed_at: now,
                },
            );
        }
        Ok(table)
    }
}

impl RootContext for LocalRoot {
    fn path(&self) -> &Path {
        &self.path
    }

    fn check_module_status(&self, name: &str) -> bool {
        self.module(name).is_some_and(|meta| meta.enabled)
    }

    fn refresh_all_metadata(&self) -> anyhow::Result<usize> {
        let table = self.scan()?;
        let count = table.len();
        match self.modules.write() {
            Ok(mut modules) => *modules = table,
            Err(e) => anyhow::bail!("module status lock poisoned during refresh: {e}"),
        }
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        debug!(root = %self.path.display(), count, "module metadata refreshed");
        Ok(count)
    }
}

/// Mounts [`LocalRoot`]s with a fixed modules directory.
#[derive(Debug, Clone)]
pub struct LocalMounter {
    modules_dir: PathBuf,
}

impl LocalMounter {
    /// Create a mounter scanning `modules_dir` under each root.
    pub fn new(modules_dir: impl Into<PathBuf>) -> Self {
        Self {
            modules_dir: modules_dir.into(),
        }
    }

    /// Mounter scanning the `[loader]` modules directory, the same base path
    /// [`crate::LoaderLifecycle`] hands to its module manager.
    pub fn from_settings(settings: &LoaderSettings) -> Self {
        Self::new(settings.modules_dir.clone())
    }

    /// Directory scanned under each mounted root.
    pub fn modules_dir(&self) -> &Path {
        &self.modules_dir
    }
}

impl Default for LocalMounter {
    fn default() -> Self {
        Self::new(DEFAULT_MODULES_DIR)
    }
}

impl RootMounter for LocalMounter {
    fn mount(&self, path: &Path) -> anyhow::Result<Arc<dyn RootContext>> {
        let root: Arc<dyn RootContext> =
            LocalRoot::mount_with_modules_dir(path, &self.modules_dir)?;
        Ok(root)
    }
}

/// Load and parse a module manifest.
fn load_manifest(path: &Path) -> anyhow::Result<ModuleManifest> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read manifest at {}: {e}", path.display()))?;
    let manifest: ModuleManifest = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("failed to parse manifest at {}: {e}", path.display()))?;
    Ok(manifest)
}
