use std::sync::Arc;
use std::time::Duration;

use assert_cmd::Command;
use predicates::prelude::*;
use sui_card_reader::config::DEFAULT_CACHE_NAMESPACE;
use sui_view_cache::{DurableStore, FsKvStorage, KvStorage, ManualClock};
use tempfile::TempDir;

const CARD_ENV: [&str; 6] = [
    "CARD_PACKAGE_ID",
    "CARD_REGISTRY_ID",
    "CARD_REGISTRY_VERSION",
    "CARD_MODULE",
    "CARD_CACHE_DIR",
    "CARD_CACHE_QUOTA_BYTES",
];

fn card_reader() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("card-reader").unwrap();
    for var in CARD_ENV {
        cmd.env_remove(var);
    }
    cmd.env_remove("SUI_RPC_URL");
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    card_reader()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("count"))
        .stdout(predicate::str::contains("owner"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("cache"));
}

#[test]
fn test_query_without_registry_fails() {
    card_reader()
        .arg("count")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--package-id"));
}

#[test]
fn test_invalid_search_kind_rejected() {
    card_reader()
        .args(["search", "color", "blue"])
        .assert()
        .failure();
}

#[test]
fn test_cache_command_requires_dir() {
    card_reader()
        .args(["cache", "clear-expired"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--cache-dir"));
}

#[test]
fn test_cache_clear_expired_removes_old_entries() {
    let dir = TempDir::new().unwrap();
    let storage = FsKvStorage::new(dir.path()).unwrap();
    // Written at the epoch with a one-second TTL: long expired by now.
    let store = DurableStore::new(storage, DEFAULT_CACHE_NAMESPACE, Arc::new(ManualClock::new(0)));
    assert!(store.set("card", "1", &"stale", Duration::from_secs(1)));

    card_reader()
        .arg("--cache-dir")
        .arg(dir.path())
        .args(["cache", "clear-expired"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\": 1"));

    assert!(store.storage().keys().unwrap().is_empty());
}

#[test]
fn test_cache_clear_empties_namespace() {
    let dir = TempDir::new().unwrap();
    let storage = FsKvStorage::new(dir.path()).unwrap();
    let store = DurableStore::new(storage, DEFAULT_CACHE_NAMESPACE, Arc::new(ManualClock::new(0)));
    assert!(store.set("count", "total", &4u64, Duration::from_secs(300)));
    assert!(store.set("admin", "0x1", &true, Duration::from_secs(1800)));

    card_reader()
        .arg("--cache-dir")
        .arg(dir.path())
        .args(["cache", "clear"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"removed\": 2"));
}
