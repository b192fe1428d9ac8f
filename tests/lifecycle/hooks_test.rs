//! Tests for `src/lifecycle.rs`: loader lifecycle hooks.

use std::sync::Arc;

use tempfile::TempDir;

use aivk_loader::config::LoaderConfig;
use aivk_loader::root::{LocalMounter, LocalRoot, RootContext, MODULE_MANIFEST_FILE, ROOT_MARKER};
use aivk_loader::{Lifecycle, LoaderError, LoaderLifecycle, ModuleManager, RootLocator};

use crate::support::{as_root, StubRoot};

#[tokio::test]
async fn on_load_with_disabled_companion_fails_without_refresh() {
    let (stub, root) = as_root(StubRoot::new(&[("loader", false)]));
    let lifecycle = LoaderLifecycle::default();

    let err = lifecycle
        .on_load(&root)
        .await
        .expect_err("disabled companion must abort load");
    match err {
        LoaderError::ModuleDisabled(name) => assert_eq!(name, "loader"),
        other => panic!("expected ModuleDisabled, got {other:?}"),
    }
    assert_eq!(stub.refreshes(), 0, "no refresh on abort");
}

#[tokio::test]
async fn on_load_with_absent_companion_fails_without_refresh() {
    let (stub, root) = as_root(StubRoot::new(&[("chat", true)]));
    let lifecycle = LoaderLifecycle::default();

    let err = lifecycle
        .on_load(&root)
        .await
        .expect_err("absent companion");
    assert!(err.is_expected_abort());
    assert_eq!(stub.refreshes(), 0);
}

#[tokio::test]
async fn on_load_with_enabled_companion_refreshes_once() {
    let (stub, root) = as_root(StubRoot::new(&[("loader", true)]));
    let lifecycle = LoaderLifecycle::default();

    lifecycle.on_load(&root).await.expect("load should succeed");
    assert_eq!(stub.refreshes(), 1);
}

#[tokio::test]
async fn on_load_ignores_refresh_failure() {
    let (stub, root) = as_root(StubRoot::new(&[("loader", true)]).failing_refresh());
    let lifecycle = LoaderLifecycle::default();

    lifecycle
        .on_load(&root)
        .await
        .expect("refresh failure must not abort load");
    assert_eq!(stub.refreshes(), 1);
}

#[tokio::test]
async fn on_load_gates_on_configured_companion() {
    let (_stub, root) = as_root(StubRoot::new(&[("loader", false), ("bridge", true)]));

    LoaderLifecycle::new("bridge")
        .on_load(&root)
        .await
        .expect("bridge is enabled");

    let err = LoaderLifecycle::new("loader")
        .on_load(&root)
        .await
        .expect_err("loader is disabled");
    assert!(matches!(err, LoaderError::ModuleDisabled(ref name) if name == "loader"));
}

#[tokio::test]
async fn passive_hooks_succeed_in_any_order() {
    for enabled in [true, false] {
        let (stub, root) = as_root(StubRoot::new(&[("loader", enabled)]));
        let lifecycle = LoaderLifecycle::default();

        lifecycle.on_update(&root).await.expect("update");
        lifecycle.on_uninstall(&root).await.expect("uninstall");
        lifecycle.on_install(&root).await.expect("install");
        lifecycle.on_unload(&root).await.expect("unload");
        lifecycle.on_update(&root).await.expect("update again");

        assert_eq!(stub.refreshes(), 0, "only on_load refreshes");
    }
}

#[tokio::test]
async fn disabled_loader_on_local_root_has_no_side_effects() {
    let dir = TempDir::new().expect("should create temp dir");
    std::fs::write(dir.path().join(ROOT_MARKER), b"").expect("write marker");
    let module_dir = dir.path().join("modules").join("loader");
    std::fs::create_dir_all(&module_dir).expect("mkdir");
    std::fs::write(module_dir.join(MODULE_MANIFEST_FILE), "enabled = false").expect("manifest");

    let local = LocalRoot::mount(dir.path()).expect("root should mount");
    let root: Arc<dyn RootContext> = Arc::clone(&local) as Arc<dyn RootContext>;

    let err = LoaderLifecycle::default()
        .on_load(&root)
        .await
        .expect_err("disabled loader");
    assert_eq!(err.to_string(), "module 'loader' is disabled");
    assert_eq!(local.refresh_count(), 0);
}

#[tokio::test]
async fn enabled_loader_on_local_root_refreshes_metadata() {
    let dir = TempDir::new().expect("should create temp dir");
    std::fs::write(dir.path().join(ROOT_MARKER), b"").expect("write marker");
    let module_dir = dir.path().join("modules").join("loader");
    std::fs::create_dir_all(&module_dir).expect("mkdir");
    std::fs::write(module_dir.join(MODULE_MANIFEST_FILE), "enabled = true").expect("manifest");

    let local = LocalRoot::mount(dir.path()).expect("root should mount");
    let root: Arc<dyn RootContext> = Arc::clone(&local) as Arc<dyn RootContext>;

    LoaderLifecycle::default()
        .on_load(&root)
        .await
        .expect("enabled loader loads");
    assert_eq!(local.refresh_count(), 1);
}

#[tokio::test]
async fn configured_modules_dir_drives_status_table_and_manager() {
    let dir = TempDir::new().expect("should create temp dir");
    std::fs::write(dir.path().join(ROOT_MARKER), b"").expect("write marker");
    let module_dir = dir.path().join("plugins").join("loader");
    std::fs::create_dir_all(&module_dir).expect("mkdir");
    std::fs::write(module_dir.join(MODULE_MANIFEST_FILE), "enabled = true").expect("manifest");

    let default_root = LocalRoot::mount(dir.path()).expect("root should mount");
    assert!(!default_root.check_module_status("loader"));

    let config = LoaderConfig::from_toml("[loader]\nmodules_dir = \"plugins\"\n").expect("parse");
    let mounter = LocalMounter::from_settings(&config.loader);
    assert_eq!(mounter.modules_dir(), config.loader.modules_dir.as_path());

    let locator = RootLocator::new(mounter);
    let root = locator.locate(dir.path()).expect("root found");
    assert!(root.check_module_status("loader"));

    LoaderLifecycle::from_settings(&config.loader)
        .on_load(&root)
        .await
        .expect("loader is enabled under plugins/");

    let manager = ModuleManager::new(Arc::clone(&root));
    let manager = manager.with_modules_dir(&config.loader.modules_dir);
    let manifest = manager.module_path("loader").join(MODULE_MANIFEST_FILE);
    assert!(manifest.is_file());
}
