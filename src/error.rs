//! Error taxonomy for root discovery and module lifecycle.
//!
//! Two failure kinds are owned by this crate: a missing root and a disabled
//! companion module. Anything raised by the host (mount failures, a broken
//! status table) passes through [`LoaderError::Host`] untouched.

use std::path::PathBuf;

/// Errors surfaced by the locator, the module manager and lifecycle hooks.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// No directory from the start path up to the filesystem root carries the
    /// root marker.
    #[error("no AIVK root found from {}", start.display())]
    RootNotFound {
        /// The path the search started from.
        start: PathBuf,
    },

    /// The companion module is absent or disabled in the root's status table.
    #[error("module '{0}' is disabled")]
    ModuleDisabled(String),

    /// Failure raised by the host runtime, propagated unchanged.
    #[error(transparent)]
    Host(#[from] anyhow::Error),
}

impl LoaderError {
    /// Returns `true` for aborts that are part of normal operation rather
    /// than bugs or infrastructure failures.
    pub fn is_expected_abort(&self) -> bool {
        matches!(self, Self::ModuleDisabled(_))
    }
}
