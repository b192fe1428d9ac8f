//! Tests for `src/logging.rs`.

use aivk_loader::config::LoggingConfig;
use aivk_loader::logging::{init_console, init_console_from, init_file, LoggingGuard};

#[test]
fn logging_guard_is_send() {
    fn assert_send<T: Send>() {}
    assert_send::<LoggingGuard>();
}

#[test]
fn init_file_creates_logs_dir_and_tolerates_existing_subscriber() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let logs_dir = tmp.path().join("logs");
    assert!(!logs_dir.exists());

    let first = init_file(&logs_dir, "debug").expect("first init");
    assert!(logs_dir.exists(), "logs directory should be created");

    // The global subscriber can only be set once per process; later calls
    // must report that instead of failing.
    let second = init_file(&logs_dir, "debug").expect("second init");
    assert!(!second.installed());
    assert!(!init_console("info"));
    drop(first);
}

#[test]
fn init_console_from_config_leaves_a_subscriber_installed() {
    let config = LoggingConfig {
        level: "debug".to_owned(),
    };
    // Installation order across tests is not fixed; either this call or an
    // earlier one owns the global subscriber afterwards.
    init_console_from(&config);
    assert!(tracing::dispatcher::has_been_set());
}
