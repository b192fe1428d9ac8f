//! Module lifecycle hooks and the per-attempt state machine.
//!
//! The host calls the hooks at fixed points in a module's life. Every hook
//! is a suspension point for the host, is invoked sequentially per instance
//! and surfaces its own typed error. Only [`Lifecycle::on_load`] carries
//! logic: it gates loading on the companion module's status.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::LoaderSettings;
use crate::error::LoaderError;
use crate::manager::ModuleManager;
use crate::root::RootContext;

/// The five host-invoked lifecycle points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    /// Module is being loaded.
    Load,
    /// Module is being unloaded.
    Unload,
    /// Module is being installed.
    Install,
    /// Module is being uninstalled.
    Uninstall,
    /// Module is being updated.
    Update,
}

impl Hook {
    /// Stable name used in log events.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "on_load",
            Self::Unload => "on_unload",
            Self::Install => "on_install",
            Self::Uninstall => "on_uninstall",
            Self::Update => "on_update",
        }
    }
}

impl std::fmt::Display for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Load state of a module within one host session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleState {
    /// Not loaded.
    #[default]
    Unloaded,
    /// `on_load` succeeded.
    Loaded,
    /// `on_load` failed. Retrying is the orchestrator's decision.
    Failed,
}

impl ModuleState {
    /// State after running `hook` from `self`.
    ///
    /// Install, uninstall and update never transition. A failed hook other
    /// than load leaves the state untouched.
    pub fn after(self, hook: Hook, succeeded: bool) -> Self {
        match (hook, succeeded) {
            (Hook::Load, true) => Self::Loaded,
            (Hook::Load, false) => Self::Failed,
            (Hook::Unload, true) if self == Self::Loaded => Self::Unloaded,
            _ => self,
        }
    }
}

/// Lifecycle hooks invoked by the host orchestrator.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    /// Validate the root and bind the module.
    async fn on_load(&self, root: &Arc<dyn RootContext>) -> Result<(), LoaderError>;
    /// Release the module.
    async fn on_unload(&self, root: &Arc<dyn RootContext>) -> Result<(), LoaderError>;
    /// One-time installation.
    async fn on_install(&self, root: &Arc<dyn RootContext>) -> Result<(), LoaderError>;
    /// Removal.
    async fn on_uninstall(&self, root: &Arc<dyn RootContext>) -> Result<(), LoaderError>;
    /// In-place update while loaded.
    async fn on_update(&self, root: &Arc<dyn RootContext>) -> Result<(), LoaderError>;
}

/// Lifecycle of the loader plugin.
#[derive(Debug, Clone)]
pub struct LoaderLifecycle {
    companion: String,
    modules_dir: PathBuf,
}

impl Default for LoaderLifecycle {
    fn default() -> Self {
        Self::from_settings(&LoaderSettings::default())
    }
}

impl LoaderLifecycle {
    /// Lifecycle gated on `companion`, with the default modules directory.
    pub fn new(companion: impl Into<String>) -> Self {
        Self {
            companion: companion.into(),
            modules_dir: LoaderSettings::default().modules_dir,
        }
    }

    /// Lifecycle configured from the `[loader]` section.
    pub fn from_settings(settings: &LoaderSettings) -> Self {
        Self {
            companion: settings.companion.clone(),
            modules_dir: settings.modules_dir.clone(),
        }
    }

    /// Name of the module gating `on_load`.
    pub fn companion(&self) -> &str {
        &self.companion
    }
}

#[async_trait]
impl Lifecycle for LoaderLifecycle {
    async fn on_load(&self, root: &Arc<dyn RootContext>) -> Result<(), LoaderError> {
        if !root.check_module_status(&self.companion) {
            info!(
                module = %self.companion,
                root = %root.path().display(),
                "companion module disabled, aborting load"
            );
            return Err(LoaderError::ModuleDisabled(self.companion.clone()));
        }

        let manager = ModuleManager::new(Arc::clone(root)).with_modules_dir(&self.modules_dir);

        // Best-effort: the refreshed count and any failure do not affect the load.
        match manager.refresh_metadata() {
            Ok(count) => debug!(count, "module metadata refreshed on load"),
            Err(e) => warn!(error = %e, "module metadata refresh failed, continuing load"),
        }

        info!(
            module = %self.companion,
            modules_dir = %manager.modules_dir().display(),
            "module loaded"
        );
        Ok(())
    }

    async fn on_unload(&self, _root: &Arc<dyn RootContext>) -> Result<(), LoaderError> {
        info!(module = %self.companion, "module unloaded");
        Ok(())
    }

    async fn on_install(&self, _root: &Arc<dyn RootContext>) -> Result<(), LoaderError> {
        info!(module = %self.companion, "module installed");
        Ok(())
    }

    async fn on_uninstall(&self, _root: &Arc<dyn RootContext>) -> Result<(), LoaderError> {
        info!(module = %self.companion, "module uninstalled");
        Ok(())
    }

    async fn on_update(&self, _root: &Arc<dyn RootContext>) -> Result<(), LoaderError> {
        info!(module = %self.companion, "module updating");
        Ok(())
    }
}
