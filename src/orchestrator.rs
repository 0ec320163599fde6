//! Collection Orchestrator: count, batch, full-scan, owner-scan and search.
//!
//! Collections are best-effort. A card that fails to fetch is left out and
//! its ID reported in [`CollectionOutcome::failed_ids`]; nothing here fails
//! the whole call because of one card. Results are always sorted by ID with
//! no duplicates, whatever order the fetches complete in.

use std::sync::Arc;

use anyhow::Result;
use card_reader_types::{CardId, ProfileCard, SuiAddress};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use sui_transport::InspectClient;
use sui_view_cache::Lookup;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use crate::cache::{SearchKind, SearchQuery};
use crate::cache::CardCaches;
use crate::config::ReaderConfig;
use crate::error::FetchError;
use crate::fetcher::CardFetcher;

/// Cards from a collection read plus what went missing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CollectionOutcome {
    pub cards: Vec<ProfileCard>,
    /// IDs that were attempted and failed, ascending.
    pub failed_ids: Vec<CardId>,
    /// Set when the collection size itself could not be read.
    pub error: Option<String>,
    /// Set when cancellation stopped the scan before every chunk ran.
    pub cancelled: bool,
}

impl CollectionOutcome {
    fn from_results(results: Vec<Result<ProfileCard, FetchError>>) -> Self {
        let mut outcome = Self::default();
        for result in results {
            match result {
                Ok(card) => outcome.cards.push(card),
                Err(e) => {
                    debug!(card = e.id(), decode = e.is_decode(), error = %e, "dropping card from collection");
                    outcome.failed_ids.push(e.id());
                }
            }
        }
        outcome.normalize();
        outcome
    }

    fn failed(error: &anyhow::Error) -> Self {
        Self {
            error: Some(format!("{:#}", error)),
            ..Self::default()
        }
    }

    fn normalize(&mut self) {
        self.cards.sort_by_key(|c| c.id);
        self.cards.dedup_by_key(|c| c.id);
        self.failed_ids.sort_unstable();
        self.failed_ids.dedup();
    }

    /// No failures, no error, not cancelled.
    pub fn is_complete(&self) -> bool {
        self.failed_ids.is_empty() && self.error.is_none() && !self.cancelled
    }
}

fn sorted_unique(ids: &[CardId]) -> Vec<CardId> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// IDs `1..=total` in chunks of `size`, each built only when it is reached.
fn id_chunks(total: u64, size: usize) -> impl Iterator<Item = Vec<CardId>> {
    let size = size.max(1) as u64;
    (0..total.div_ceil(size)).map(move |i| {
        let start = i * size + 1;
        (start..=total.min(start.saturating_add(size - 1))).collect()
    })
}

fn is_cancelled(cancel: Option<&CancellationToken>) -> bool {
    cancel.is_some_and(CancellationToken::is_cancelled)
}

pub struct CollectionOrchestrator<C> {
    fetcher: CardFetcher<C>,
}

impl<C: InspectClient> CollectionOrchestrator<C> {
    pub fn new(fetcher: CardFetcher<C>) -> Self {
        Self { fetcher }
    }

    /// Wire caches, fetcher and orchestrator from one config.
    pub fn from_config(client: C, config: ReaderConfig) -> Result<Self> {
        config.validate()?;
        let caches = Arc::new(CardCaches::from_config(&config)?);
        Ok(Self::new(CardFetcher::new(client, config, caches)))
    }

    pub fn fetcher(&self) -> &CardFetcher<C> {
        &self.fetcher
    }

    pub fn caches(&self) -> &Arc<CardCaches> {
        self.fetcher.caches()
    }

    fn chunk_size(&self) -> usize {
        self.fetcher.config().chunk_size.max(1)
    }

    pub async fn count(&self, force: bool) -> Result<u64> {
        self.fetcher.card_count(force).await
    }

    // ---- batches ------------------------------------------------------------

    /// Fetch `ids` in chunks; every fetch in a chunk runs concurrently and
    /// chunks run one after another. Failed cards are left out.
    pub async fn batch_fetch(&self, ids: &[CardId], force: bool) -> Vec<ProfileCard> {
        self.batch_fetch_detailed(ids, force).await.cards
    }

    pub async fn batch_fetch_detailed(&self, ids: &[CardId], force: bool) -> CollectionOutcome {
        self.batch_inner(ids, force, None).await
    }

    pub async fn batch_fetch_cancellable(
        &self,
        ids: &[CardId],
        force: bool,
        cancel: &CancellationToken,
    ) -> CollectionOutcome {
        self.batch_inner(ids, force, Some(cancel)).await
    }

    async fn fetch_chunk(
        &self,
        chunk: &[CardId],
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> Vec<Result<ProfileCard, FetchError>> {
        join_all(
            chunk
                .iter()
                .map(|&id| self.fetcher.fetch_card_inner(id, force, cancel)),
        )
        .await
    }

    async fn batch_inner(
        &self,
        ids: &[CardId],
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> CollectionOutcome {
        let ids = sorted_unique(ids);
        let chunks = ids.chunks(self.chunk_size()).map(<[CardId]>::to_vec);
        self.run_chunks(chunks, ids.len() as u64, force, cancel).await
    }

    /// Chunks one after another; stops between chunks once cancelled.
    async fn run_chunks(
        &self,
        chunks: impl Iterator<Item = Vec<CardId>>,
        requested: u64,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> CollectionOutcome {
        let mut results = Vec::new();
        let mut cancelled = false;
        for chunk in chunks {
            if is_cancelled(cancel) {
                cancelled = true;
                break;
            }
            results.extend(self.fetch_chunk(&chunk, force, cancel).await);
        }
        let mut outcome = CollectionOutcome::from_results(results);
        outcome.cancelled = cancelled || is_cancelled(cancel);
        if !outcome.failed_ids.is_empty() {
            warn!(
                requested,
                fetched = outcome.cards.len(),
                failed = outcome.failed_ids.len(),
                "batch fetch incomplete"
            );
        }
        outcome
    }

    // ---- full collection ----------------------------------------------------

    /// Every card: the count, then a batch over `1..=count`.
    pub async fn get_all(&self, force: bool) -> Vec<ProfileCard> {
        self.get_all_detailed(force).await.cards
    }

    pub async fn get_all_detailed(&self, force: bool) -> CollectionOutcome {
        self.get_all_inner(force, None).await
    }

    pub async fn get_all_cancellable(&self, force: bool, cancel: &CancellationToken) -> CollectionOutcome {
        self.get_all_inner(force, Some(cancel)).await
    }

    async fn get_all_inner(&self, force: bool, cancel: Option<&CancellationToken>) -> CollectionOutcome {
        let total = match self.fetcher.card_count_inner(force, cancel).await {
            Ok(total) => total,
            Err(e) => {
                warn!(error = %e, "card count unavailable, returning no cards");
                let mut outcome = CollectionOutcome::failed(&e);
                outcome.cancelled = is_cancelled(cancel);
                return outcome;
            }
        };
        let outcome = self
            .run_chunks(id_chunks(total, self.chunk_size()), total, force, cancel)
            .await;
        info!(total, fetched = outcome.cards.len(), "loaded all cards");
        outcome
    }

    // ---- owner view -------------------------------------------------------

    /// Cards owned by `owner`.
    ///
    /// Served from the owner view when valid, then from already-cached cards
    /// when those cover the whole collection, and only then by scanning every
    /// ID with at most `owner_scan_parallelism` chunks in flight. The result
    /// is written back as the owner view.
    pub async fn get_user_cards(&self, owner: &SuiAddress, force: bool) -> Vec<ProfileCard> {
        self.user_cards_inner(owner, force, None).await.cards
    }

    pub async fn get_user_cards_detailed(&self, owner: &SuiAddress, force: bool) -> CollectionOutcome {
        self.user_cards_inner(owner, force, None).await
    }

    pub async fn get_user_cards_cancellable(
        &self,
        owner: &SuiAddress,
        force: bool,
        cancel: &CancellationToken,
    ) -> CollectionOutcome {
        self.user_cards_inner(owner, force, Some(cancel)).await
    }

    /// Owner's cards from cached entities alone, if the cache is known to
    /// hold every card. Never touches the network.
    fn cached_user_cards(&self, owner: &SuiAddress) -> Option<Vec<ProfileCard>> {
        let caches = self.caches();
        let total = caches.count().fresh()?;
        let cards = caches.valid_cards();
        if (cards.len() as u64) < total {
            return None;
        }
        let covered = (1..=total).all(|id| cards.binary_search_by_key(&id, |c| c.id).is_ok());
        if !covered {
            return None;
        }
        Some(cards.into_iter().filter(|c| &c.owner == owner).collect())
    }

    async fn user_cards_inner(
        &self,
        owner: &SuiAddress,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> CollectionOutcome {
        let caches = self.caches();
        let stale = match caches.owner_cards(owner) {
            Lookup::Fresh(entry) if !force => {
                return CollectionOutcome {
                    cards: entry.data,
                    ..CollectionOutcome::default()
                }
            }
            other => other.into_entry(),
        };
        if !force {
            if let Some(cards) = self.cached_user_cards(owner) {
                debug!(owner = %owner, found = cards.len(), "owner cards served from card cache");
                caches.put_owner_cards(owner, cards.clone());
                return CollectionOutcome {
                    cards,
                    ..CollectionOutcome::default()
                };
            }
        }

        let total = match self.fetcher.card_count_inner(force, cancel).await {
            Ok(total) => total,
            Err(e) => {
                warn!(owner = %owner, error = %e, "card count unavailable for owner scan");
                let mut outcome = CollectionOutcome::failed(&e);
                outcome.cancelled = is_cancelled(cancel);
                if let Some(entry) = stale {
                    outcome.cards = entry.data.clone();
                    caches.restore_owner_cards(owner, entry);
                }
                return outcome;
            }
        };

        let parallelism = self.fetcher.config().owner_scan_parallelism.max(1);
        let mut chunks = stream::iter(id_chunks(total, self.chunk_size()))
            .map(|chunk| async move { self.fetch_chunk(&chunk, force, cancel).await })
            .buffer_unordered(parallelism);

        let mut matches = Vec::new();
        let mut failed = Vec::new();
        let mut cancelled = false;
        while let Some(results) = chunks.next().await {
            for result in results {
                match result {
                    Ok(card) if &card.owner == owner => matches.push(card),
                    Ok(_) => {}
                    Err(e) => failed.push(e.id()),
                }
            }
            if is_cancelled(cancel) {
                cancelled = true;
                break;
            }
        }

        let mut outcome = CollectionOutcome {
            cards: matches,
            failed_ids: failed,
            error: None,
            cancelled,
        };
        outcome.normalize();
        if !cancelled {
            caches.put_owner_cards(owner, outcome.cards.clone());
        } else if let Some(entry) = stale {
            caches.restore_owner_cards(owner, entry);
        }
        debug!(
            owner = %owner,
            scanned = total,
            found = outcome.cards.len(),
            failed = outcome.failed_ids.len(),
            "owner scan finished"
        );
        outcome
    }

    // ---- search -------------------------------------------------------------

    /// Cards matching `query`. A failed ID lookup is an error; cards that fail
    /// to fetch are left out.
    pub async fn search(&self, query: &SearchQuery, force: bool) -> Result<Vec<ProfileCard>> {
        self.search_inner(query, force, None).await
    }

    pub async fn search_cancellable(
        &self,
        query: &SearchQuery,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<ProfileCard>> {
        self.search_inner(query, force, Some(cancel)).await
    }

    async fn search_inner(
        &self,
        query: &SearchQuery,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<ProfileCard>> {
        let ids = self.fetcher.search_ids_inner(query, force, cancel).await?;
        debug!(kind = %query.kind, text = %query.text, hits = ids.len(), "search ids");
        Ok(self.batch_inner(&ids, force, cancel).await.cards)
    }

    // ---- derived-cache maintenance -------------------------------------------

    /// A card was created on chain: the count is invalidated and the card is
    /// added to its owner's view if that view is currently valid.
    pub fn on_card_created(&self, card: ProfileCard) {
        let caches = self.caches();
        caches.invalidate_count();
        let appended = caches.append_to_owner(&card);
        debug!(card = card.id, appended, "card created");
        caches.put_card(card);
    }

    /// A card was deleted: it leaves the entity cache and every valid owner view.
    pub fn on_card_deleted(&self, id: CardId) {
        let caches = self.caches();
        caches.remove_card(id);
        caches.invalidate_count();
        let views = caches.remove_from_owners(id);
        debug!(card = id, views, "card deleted");
    }

    /// A card changed: the entity entry is replaced and patched into every
    /// valid owner view that lists it.
    pub fn on_card_updated(&self, card: ProfileCard) {
        let caches = self.caches();
        let views = caches.patch_in_owners(&card);
        debug!(card = card.id, views, "card updated");
        caches.put_card(card);
    }
}
