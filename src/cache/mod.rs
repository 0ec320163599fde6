//! Card caches: one typed store per entity category, two tiers deep.
//!
//! ```text
//! ┌──────────────────────────── CardCaches ─────────────────────────────┐
//! │ memory (per process)                durable (optional, survives runs)│
//! │  cards    CardId      -> ProfileCard      "{ns}:card:{id}"           │
//! │  owners   SuiAddress  -> Vec<ProfileCard> "{ns}:owner:{address}"     │
//! │  searches SearchKey   -> Vec<CardId>      "{ns}:search:{key}"        │
//! │  admins   SuiAddress  -> bool             "{ns}:admin:{address}"     │
//! │  count    slot        -> u64              "{ns}:count:total"         │
//! │  stats    slot        -> PlatformStats    "{ns}:stats:platform"      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Reads go memory, then durable. A fresh durable entry is promoted into
//! memory with its original timestamp and TTL. Writes and deletes go to both
//! tiers. A stale entry found in either tier is removed and handed back as
//! [`Lookup::Stale`] so the caller can fall back to it when a refresh fails.
//!
//! Derived views (owners, searches) expire on their own clock; only the
//! explicit maintenance methods touch them when a card changes.

mod keys;

pub use keys::{CacheScope, SearchKey, SearchKind, SearchQuery};

use std::collections::BTreeMap;
use std::hash::Hash;
use std::sync::Arc;

use anyhow::{Context, Result};
use card_reader_types::{CardId, PlatformStats, ProfileCard, SuiAddress, TtlPolicy, TtlTier};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sui_view_cache::{
    CacheEntry, CacheMetrics, CacheSlot, Clock, DurableStore, FsKvStorage, KvStorage, Lookup,
    MemoryStore, SystemClock,
};
use tracing::debug;

use crate::config::ReaderConfig;

const CARD: &str = "card";
const OWNER: &str = "owner";
const SEARCH: &str = "search";
const ADMIN: &str = "admin";
const COUNT: &str = "count";
const STATS: &str = "stats";
const COUNT_KEY: &str = "total";
const STATS_KEY: &str = "platform";

pub type DynDurableStore = DurableStore<Arc<dyn KvStorage>>;

pub struct CardCaches {
    clock: Arc<dyn Clock>,
    ttl: TtlPolicy,
    cards: MemoryStore<CardId, ProfileCard>,
    owners: MemoryStore<SuiAddress, Vec<ProfileCard>>,
    searches: MemoryStore<SearchKey, Vec<CardId>>,
    admins: MemoryStore<SuiAddress, bool>,
    count: CacheSlot<u64>,
    stats: CacheSlot<PlatformStats>,
    durable: Option<DynDurableStore>,
    metrics: CacheMetrics,
}

impl CardCaches {
    /// Memory-only caches.
    pub fn new(clock: Arc<dyn Clock>, ttl: TtlPolicy) -> Self {
        let medium = ttl.ttl(TtlTier::Medium);
        Self {
            cards: MemoryStore::new(clock.clone(), medium),
            owners: MemoryStore::new(clock.clone(), medium),
            searches: MemoryStore::new(clock.clone(), medium),
            admins: MemoryStore::new(clock.clone(), ttl.ttl(TtlTier::Long)),
            count: CacheSlot::new(clock.clone(), medium),
            stats: CacheSlot::new(clock.clone(), ttl.ttl(TtlTier::Short)),
            durable: None,
            metrics: CacheMetrics::default(),
            clock,
            ttl,
        }
    }

    /// Caches for a reader: memory always, plus a filesystem durable tier
    /// when `config.cache_dir` is set.
    pub fn from_config(config: &ReaderConfig) -> Result<Self> {
        let caches = Self::new(Arc::new(SystemClock), config.ttl);
        let Some(dir) = &config.cache_dir else {
            return Ok(caches);
        };
        let storage = FsKvStorage::with_quota(dir, config.cache_quota_bytes)
            .with_context(|| format!("opening cache directory {}", dir.display()))?;
        Ok(caches.with_durable(Arc::new(storage), &config.cache_namespace))
    }

    /// Add a durable tier under `namespace`. Its counters are shared with this cache.
    pub fn with_durable(mut self, storage: Arc<dyn KvStorage>, namespace: &str) -> Self {
        let store = DurableStore::new(storage, namespace, self.clock.clone())
            .with_metrics(self.metrics.clone());
        self.durable = Some(store);
        self
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    pub fn durable(&self) -> Option<&DynDurableStore> {
        self.durable.as_ref()
    }

    // ---- tier plumbing ----------------------------------------------------

    fn tiered<V: DeserializeOwned>(
        &self,
        memory: Lookup<V>,
        kind: &str,
        key: &str,
        promote: impl FnOnce(CacheEntry<V>),
    ) -> Lookup<V>
    where
        V: Clone,
    {
        let stale = match memory {
            Lookup::Fresh(entry) => {
                self.metrics.record_memory_hit();
                return Lookup::Fresh(entry);
            }
            Lookup::Stale(entry) => Some(entry),
            Lookup::Missing => None,
        };
        let durable = match &self.durable {
            Some(store) => store.lookup::<V>(kind, key),
            None => Lookup::Missing,
        };
        match (durable, stale) {
            (Lookup::Fresh(entry), _) => {
                self.metrics.record_durable_hit();
                debug!(kind, key, "promoting durable entry");
                promote(entry.clone());
                Lookup::Fresh(entry)
            }
            (Lookup::Stale(a), Some(b)) => Lookup::Stale(if a.timestamp >= b.timestamp { a } else { b }),
            (Lookup::Stale(entry), None) | (Lookup::Missing, Some(entry)) => Lookup::Stale(entry),
            (Lookup::Missing, None) => Lookup::Missing,
        }
    }

    fn keyed<K, V>(&self, store: &MemoryStore<K, V>, kind: &str, key: &K, durable_key: &str) -> Lookup<V>
    where
        K: Eq + Hash + Clone,
        V: Clone + DeserializeOwned,
    {
        self.tiered(store.lookup(key), kind, durable_key, |entry| {
            store.insert_entry(key.clone(), entry)
        })
    }

    fn persist<V: Serialize>(&self, kind: &str, key: &str, entry: &CacheEntry<V>) {
        if let Some(store) = &self.durable {
            store.put_entry(kind, key, entry);
        }
    }

    /// Durable half of a restore, skipped when memory already held a newer value.
    fn restored<V: Serialize>(&self, went_back: bool, kind: &str, key: &str, entry: &CacheEntry<V>) {
        if went_back {
            debug!(kind, key, "stale entry restored after failed refresh");
            self.persist(kind, key, entry);
        }
    }

    fn forget(&self, kind: &str, key: &str) {
        if let Some(store) = &self.durable {
            store.delete(kind, key);
        }
    }

    // ---- cards --------------------------------------------------------------

    pub fn card(&self, id: CardId) -> Lookup<ProfileCard> {
        self.keyed(&self.cards, CARD, &id, &id.to_string())
    }

    pub fn put_card(&self, card: ProfileCard) -> CacheEntry<ProfileCard> {
        let key = card.id.to_string();
        let entry = self.cards.set(card.id, card);
        self.persist(CARD, &key, &entry);
        entry
    }

    /// Put back an expired card a lookup handed out, keeping its stamp.
    pub fn restore_card(&self, entry: CacheEntry<ProfileCard>) {
        let id = entry.data.id;
        let went_back = self.cards.restore(id, entry.clone());
        self.restored(went_back, CARD, &id.to_string(), &entry);
    }

    pub fn remove_card(&self, id: CardId) {
        self.cards.delete(&id);
        self.forget(CARD, &id.to_string());
    }

    /// Every currently valid card in either tier, sorted by ID. No network.
    ///
    /// Memory wins when both tiers hold the same ID.
    pub fn valid_cards(&self) -> Vec<ProfileCard> {
        let mut by_id: BTreeMap<CardId, ProfileCard> = BTreeMap::new();
        if let Some(store) = &self.durable {
            for (_, entry) in store.valid_entries::<ProfileCard>(CARD) {
                by_id.insert(entry.data.id, entry.data);
            }
        }
        for card in self.cards.valid_values() {
            by_id.insert(card.id, card);
        }
        by_id.into_values().collect()
    }

    // ---- owner views ------------------------------------------------------

    pub fn owner_cards(&self, owner: &SuiAddress) -> Lookup<Vec<ProfileCard>> {
        self.keyed(&self.owners, OWNER, owner, owner.as_str())
    }

    pub fn put_owner_cards(&self, owner: &SuiAddress, cards: Vec<ProfileCard>) {
        let entry = self.owners.set(owner.clone(), cards);
        self.persist(OWNER, owner.as_str(), &entry);
    }

    pub fn restore_owner_cards(&self, owner: &SuiAddress, entry: CacheEntry<Vec<ProfileCard>>) {
        let went_back = self.owners.restore(owner.clone(), entry.clone());
        self.restored(went_back, OWNER, owner.as_str(), &entry);
    }

    /// Optimistically add `card` to its owner's view, only if that view is
    /// currently valid. Returns whether any tier was updated.
    pub fn append_to_owner(&self, card: &ProfileCard) -> bool {
        let upsert = |cards: &mut Vec<ProfileCard>| {
            cards.retain(|c| c.id != card.id);
            cards.push(card.clone());
            cards.sort_by_key(|c| c.id);
        };
        let in_memory = self.owners.update_valid(&card.owner, upsert);
        let in_durable = self.patch_durable_owner(card.owner.as_str(), |cards| {
            upsert(cards);
            true
        });
        in_memory || in_durable
    }

    /// Drop card `id` from every valid owner view. Returns how many views changed.
    pub fn remove_from_owners(&self, id: CardId) -> usize {
        let strip = |cards: &mut Vec<ProfileCard>| {
            let before = cards.len();
            cards.retain(|c| c.id != id);
            cards.len() != before
        };
        let changed = self.owners.update_all_valid(|_, cards| strip(cards)).len();
        changed + self.patch_all_durable_owners(strip)
    }

    /// Replace `card` wherever it appears in a valid owner view.
    pub fn patch_in_owners(&self, card: &ProfileCard) -> usize {
        let replace = |cards: &mut Vec<ProfileCard>| {
            let mut hit = false;
            for slot in cards.iter_mut().filter(|c| c.id == card.id) {
                *slot = card.clone();
                hit = true;
            }
            hit
        };
        let changed = self.owners.update_all_valid(|_, cards| replace(cards)).len();
        changed + self.patch_all_durable_owners(replace)
    }

    fn patch_durable_owner(&self, key: &str, f: impl FnOnce(&mut Vec<ProfileCard>) -> bool) -> bool {
        let Some(store) = &self.durable else {
            return false;
        };
        let Some(mut entry) = store.get::<Vec<ProfileCard>>(OWNER, key) else {
            return false;
        };
        if !f(&mut entry.data) {
            return false;
        }
        store.put_entry(OWNER, key, &entry)
    }

    fn patch_all_durable_owners(&self, mut f: impl FnMut(&mut Vec<ProfileCard>) -> bool) -> usize {
        let Some(store) = &self.durable else {
            return 0;
        };
        let mut changed = 0;
        for (key, mut entry) in store.valid_entries::<Vec<ProfileCard>>(OWNER) {
            if f(&mut entry.data) && store.put_entry(OWNER, &key, &entry) {
                changed += 1;
            }
        }
        changed
    }

    // ---- searches, admins -------------------------------------------------

    pub fn search_ids(&self, key: &SearchKey) -> Lookup<Vec<CardId>> {
        self.keyed(&self.searches, SEARCH, key, &key.to_string())
    }

    pub fn put_search_ids(&self, key: &SearchKey, ids: Vec<CardId>) {
        let entry = self.searches.set(key.clone(), ids);
        self.persist(SEARCH, &key.to_string(), &entry);
    }

    pub fn restore_search_ids(&self, key: &SearchKey, entry: CacheEntry<Vec<CardId>>) {
        let went_back = self.searches.restore(key.clone(), entry.clone());
        self.restored(went_back, SEARCH, &key.to_string(), &entry);
    }

    pub fn admin(&self, address: &SuiAddress) -> Lookup<bool> {
        self.keyed(&self.admins, ADMIN, address, address.as_str())
    }

    pub fn put_admin(&self, address: &SuiAddress, is_admin: bool) {
        let entry = self.admins.set(address.clone(), is_admin);
        self.persist(ADMIN, address.as_str(), &entry);
    }

    pub fn restore_admin(&self, address: &SuiAddress, entry: CacheEntry<bool>) {
        let went_back = self.admins.restore(address.clone(), entry.clone());
        self.restored(went_back, ADMIN, address.as_str(), &entry);
    }

    // ---- singletons -------------------------------------------------------

    pub fn count(&self) -> Lookup<u64> {
        self.tiered(self.count.lookup(), COUNT, COUNT_KEY, |entry| {
            self.count.insert_entry(entry)
        })
    }

    pub fn put_count(&self, total: u64) {
        let entry = self.count.set(total);
        self.persist(COUNT, COUNT_KEY, &entry);
    }

    pub fn restore_count(&self, entry: CacheEntry<u64>) {
        let went_back = self.count.restore(entry.clone());
        self.restored(went_back, COUNT, COUNT_KEY, &entry);
    }

    pub fn invalidate_count(&self) {
        self.count.clear();
        self.forget(COUNT, COUNT_KEY);
    }

    pub fn platform_stats(&self) -> Lookup<PlatformStats> {
        self.tiered(self.stats.lookup(), STATS, STATS_KEY, |entry| {
            self.stats.insert_entry(entry)
        })
    }

    pub fn put_platform_stats(&self, stats: PlatformStats) {
        let entry = self.stats.set(stats);
        self.persist(STATS, STATS_KEY, &entry);
    }

    pub fn restore_platform_stats(&self, entry: CacheEntry<PlatformStats>) {
        let went_back = self.stats.restore(entry.clone());
        self.restored(went_back, STATS, STATS_KEY, &entry);
    }

    // ---- maintenance ------------------------------------------------------

    pub fn clear(&self, scope: CacheScope) {
        let kinds: &[&str] = match scope {
            CacheScope::All => {
                self.cards.clear();
                self.owners.clear();
                self.searches.clear();
                self.admins.clear();
                self.count.clear();
                self.stats.clear();
                if let Some(store) = &self.durable {
                    store.clear();
                }
                return;
            }
            CacheScope::Cards => {
                self.cards.clear();
                &[CARD]
            }
            CacheScope::Owners => {
                self.owners.clear();
                &[OWNER]
            }
            CacheScope::Searches => {
                self.searches.clear();
                &[SEARCH]
            }
            CacheScope::Admins => {
                self.admins.clear();
                &[ADMIN]
            }
            CacheScope::Singletons => {
                self.count.clear();
                self.stats.clear();
                &[COUNT, STATS]
            }
        };
        if let Some(store) = &self.durable {
            for kind in kinds {
                store.clear_kind(kind);
            }
        }
    }

    /// Sweep the durable tier. Memory entries expire lazily on read.
    pub fn clear_expired(&self) -> usize {
        self.durable.as_ref().map_or(0, |store| store.clear_expired())
    }
}
