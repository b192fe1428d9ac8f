//! Plugin entry object called by the host runtime.
//!
//! This is the only layer that swallows errors. Each hook runs the wrapped
//! [`Lifecycle`], logs any failure and reports the resulting
//! [`ModuleState`], so one broken module cannot take the host down.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info};

use crate::config::LoaderConfig;
use crate::error::LoaderError;
use crate::lifecycle::{Hook, Lifecycle, LoaderLifecycle, ModuleState};
use crate::root::RootContext;

/// Host-facing plugin entry.
#[derive(Debug)]
pub struct Entry<L = LoaderLifecycle> {
    lifecycle: L,
    state: Mutex<ModuleState>,
}

impl Entry<LoaderLifecycle> {
    /// Entry for the loader lifecycle configured from `config`.
    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(LoaderLifecycle::from_settings(&config.loader))
    }
}

impl Default for Entry<LoaderLifecycle> {
    fn default() -> Self {
        Self::new(LoaderLifecycle::default())
    }
}

impl<L: Lifecycle> Entry<L> {
    /// Wrap `lifecycle`; the module starts out unloaded.
    pub fn new(lifecycle: L) -> Self {
        Self {
            lifecycle,
            state: Mutex::new(ModuleState::Unloaded),
        }
    }

    /// The wrapped lifecycle.
    pub fn lifecycle(&self) -> &L {
        &self.lifecycle
    }

    /// Current module state.
    pub fn state(&self) -> ModuleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Host `_onLoad`.
    pub async fn on_load(&self, root: &Arc<dyn RootContext>) -> ModuleState {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            root = %root.path().display(),
            "aivk loader starting"
        );
        self.run(Hook::Load, self.lifecycle.on_load(root)).await
    }

    /// Host `_onUnload`.
    pub async fn on_unload(&self, root: &Arc<dyn RootContext>) -> ModuleState {
        self.run(Hook::Unload, self.lifecycle.on_unload(root)).await
    }

    /// Host `_onInstall`.
    pub async fn on_install(&self, root: &Arc<dyn RootContext>) -> ModuleState {
        self.run(Hook::Install, self.lifecycle.on_install(root))
            .await
    }

    /// Host `_onUninstall`.
    pub async fn on_uninstall(&self, root: &Arc<dyn RootContext>) -> ModuleState {
        self.run(Hook::Uninstall, self.lifecycle.on_uninstall(root))
            .await
    }

    /// Host `_onUpdate`.
    pub async fn on_update(&self, root: &Arc<dyn RootContext>) -> ModuleState {
        self.run(Hook::Update, self.lifecycle.on_update(root)).await
    }

    async fn run(
        &self,
        hook: Hook,
        fut: impl Future<Output = Result<(), LoaderError>>,
    ) -> ModuleState {
        let result = fut.await;
        match &result {
            Ok(()) => {}
            Err(e) if e.is_expected_abort() => info!(hook = %hook, reason = %e, "hook aborted"),
            Err(e) => error!(hook = %hook, error = %e, "hook failed"),
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = state.after(hook, result.is_ok());
        *state
    }
}
