//! The durable tier shared across reader instances through the filesystem.

mod common;

use std::sync::Arc;
use std::time::Duration;

use card_reader_types::TtlPolicy;
use common::{address, clock, config, ids, reader_with, MockInspectClient};
use sui_card_reader::{CacheScope, CardCaches};
use sui_view_cache::{Clock, FsKvStorage, KvStorage, ManualClock};
use tempfile::TempDir;

fn durable_caches(dir: &TempDir, clock: &Arc<ManualClock>) -> Arc<CardCaches> {
    let storage: Arc<dyn KvStorage> = Arc::new(FsKvStorage::new(dir.path()).unwrap());
    let clock: Arc<dyn Clock> = clock.clone();
    Arc::new(CardCaches::new(clock, TtlPolicy::default()).with_durable(storage, "cards_test"))
}

#[tokio::test]
async fn test_durable_entries_survive_a_new_reader() {
    let dir = TempDir::new().unwrap();
    let clock = clock();

    let first = reader_with(MockInspectClient::with_cards(3, |_| 2), config(), durable_caches(&dir, &clock));
    first.get_all(false).await;
    first.get_user_cards(&address(2), false).await;

    // A fresh process: empty memory tier, registry unreachable.
    let second = reader_with(MockInspectClient::new(), config(), durable_caches(&dir, &clock));
    second.fetcher().client().fail_function("get_total_cards");

    let card = second.fetcher().fetch_card(2, false).await.unwrap();
    assert_eq!(card.name, "Card 2");
    assert_eq!(second.count(false).await.unwrap(), 3);
    let owned = second.get_user_cards(&address(2), false).await;
    assert_eq!(ids(&owned), vec![1, 2, 3]);
    assert_eq!(second.fetcher().client().calls("get_card_info"), 0);
    assert!(second.caches().metrics().snapshot().durable_hits >= 3);

    // Promoted into memory: a second read does not touch the durable tier.
    let before = second.caches().metrics().snapshot();
    second.fetcher().fetch_card(2, false).await.unwrap();
    let after = second.caches().metrics().snapshot();
    assert_eq!(after.durable_hits, before.durable_hits);
    assert_eq!(after.memory_hits, before.memory_hits + 1);
}

#[tokio::test]
async fn test_expired_durable_entry_is_a_stale_fallback() {
    let dir = TempDir::new().unwrap();
    let clock = clock();

    let first = reader_with(MockInspectClient::with_cards(1, |_| 1), config(), durable_caches(&dir, &clock));
    first.fetcher().fetch_card(1, false).await.unwrap();

    clock.advance(Duration::from_secs(600));
    let second = reader_with(MockInspectClient::with_cards(1, |_| 1), config(), durable_caches(&dir, &clock));
    second.fetcher().client().fail_card(1);

    let card = second.fetcher().fetch_card(1, false).await.unwrap();
    assert_eq!(card.name, "Card 1");
    assert_eq!(second.caches().metrics().snapshot().stale_fallbacks, 1);
}

#[tokio::test]
async fn test_clear_expired_sweeps_durable_tier() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    let reader = reader_with(MockInspectClient::with_cards(2, |_| 1), config(), durable_caches(&dir, &clock));

    reader.get_all(false).await;
    reader.fetcher().platform_stats(false).await.unwrap();
    assert_eq!(reader.caches().clear_expired(), 0);

    // Only the short-tier stats entry has expired.
    clock.advance(Duration::from_secs(120));
    assert_eq!(reader.caches().clear_expired(), 1);

    clock.advance(Duration::from_secs(600));
    assert_eq!(reader.caches().clear_expired(), 3);
}

#[tokio::test]
async fn test_owner_view_patched_in_durable_tier() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    let first = reader_with(MockInspectClient::with_cards(3, |_| 4), config(), durable_caches(&dir, &clock));
    first.get_user_cards(&address(4), false).await;
    first.on_card_deleted(3);

    let second = reader_with(MockInspectClient::new(), config(), durable_caches(&dir, &clock));
    let owned = second.get_user_cards(&address(4), false).await;
    assert_eq!(ids(&owned), vec![1, 2]);
    assert_eq!(second.fetcher().client().total_calls(), 0);
}

#[tokio::test]
async fn test_clear_scope_removes_both_tiers() {
    let dir = TempDir::new().unwrap();
    let clock = clock();
    let first = reader_with(MockInspectClient::with_cards(2, |_| 1), config(), durable_caches(&dir, &clock));
    first.get_all(false).await;
    first.caches().clear(CacheScope::Cards);

    assert!(!first.caches().card(1).is_fresh());
    let second = reader_with(MockInspectClient::new(), config(), durable_caches(&dir, &clock));
    assert!(!second.caches().card(1).is_fresh());
    // The count was a different scope.
    assert!(second.caches().count().is_fresh());
}

#[tokio::test]
async fn test_from_config_opens_durable_tier() {
    let dir = TempDir::new().unwrap();
    let config = config().with_cache_dir(dir.path().join("cards"));
    let reader = sui_card_reader::CollectionOrchestrator::from_config(MockInspectClient::with_cards(1, |_| 1), config)
        .unwrap();
    assert!(reader.caches().durable().is_some());

    reader.fetcher().fetch_card(1, false).await.unwrap();
    let durable = reader.caches().durable().unwrap();
    assert_eq!(durable.namespace(), "card_reader");
    assert_eq!(durable.storage().keys().unwrap().len(), 1);
}
