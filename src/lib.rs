//! AIVK loader: root discovery and module lifecycle binding.
//!
//! Finds the project root (the nearest ancestor directory carrying a `.aivk`
//! marker), mounts it, and binds a module manager that the host runtime
//! drives through five lifecycle hooks.
//!
//! See `DESIGN.md` for the architecture notes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

pub mod root;

pub mod entry;
pub mod lifecycle;
pub mod manager;

pub use entry::Entry;
pub use error::LoaderError;
pub use lifecycle::{Hook, Lifecycle, LoaderLifecycle, ModuleState};
pub use manager::ModuleManager;
pub use root::{RootContext, RootLocator, RootMounter, ROOT_MARKER};
