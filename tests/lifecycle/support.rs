//! In-memory root double shared by lifecycle tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aivk_loader::RootContext;

/// Root with a fixed status table that counts metadata refreshes.
#[derive(Debug)]
pub struct StubRoot {
    path: PathBuf,
    status: HashMap<String, bool>,
    refreshes: AtomicUsize,
    fail_refresh: bool,
}

impl StubRoot {
    /// Root reporting `status` for the listed modules; others are absent.
    pub fn new(status: &[(&str, bool)]) -> Self {
        Self {
            path: PathBuf::from("/stub/root"),
            status: status
                .iter()
                .map(|(name, enabled)| ((*name).to_owned(), *enabled))
                .collect(),
            refreshes: AtomicUsize::new(0),
            fail_refresh: false,
        }
    }

    /// Make every refresh fail.
    pub fn failing_refresh(mut self) -> Self {
        self.fail_refresh = true;
        self
    }

    /// Number of refresh calls, failed ones included.
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

impl RootContext for StubRoot {
    fn path(&self) -> &Path {
        &self.path
    }

    fn check_module_status(&self, name: &str) -> bool {
        self.status.get(name).copied().unwrap_or(false)
    }

    fn refresh_all_metadata(&self) -> anyhow::Result<usize> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh {
            anyhow::bail!("status table unavailable");
        }
        Ok(self.status.len())
    }
}

/// Wrap a stub as the trait object the hooks take, keeping a typed handle.
pub fn as_root(stub: StubRoot) -> (Arc<StubRoot>, Arc<dyn RootContext>) {
    let typed = Arc::new(stub);
    let root: Arc<dyn RootContext> = Arc::clone(&typed) as Arc<dyn RootContext>;
    (typed, root)
}
