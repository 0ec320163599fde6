//! Entity Fetcher: one card (or one scalar) per call, cache first.
//!
//! A card is assembled from `get_card_info` plus six sub-record reads
//! (skills, reviews, work preferences, social links, languages, analytics).
//! The sub-record reads run concurrently and are best-effort: a failure
//! degrades that field to its default. `get_card_info` itself must succeed
//! and must yield a non-empty name and owner.
//!
//! Every remote read goes through the retry wrapper. When a refresh fails and
//! the cache still holds a stale (or, for forced refreshes, a fresh) value,
//! that value is returned instead of the error.

use std::future::Future;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use card_reader_types::{
    CardAnalytics, CardId, FeaturedProject, PlatformStats, ProfileCard, Review, Skill,
    SocialLinks, SuiAddress, WorkPreferences,
};
use sui_transport::{CallArg, InspectClient, InspectResult, ViewCall};
use sui_view_cache::{CacheEntry, Lookup};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{CardCaches, SearchKey, SearchKind, SearchQuery};
use crate::config::ReaderConfig;
use crate::decode::{
    decode_address, decode_bool, decode_id_vector, decode_json_vector, decode_optional,
    decode_optional_text, decode_optional_u64, decode_string_vector, decode_text, decode_u64,
    decode_u64_timestamp, decode_url,
};
use crate::error::{is_cancelled, FetchError};
use crate::utils::{with_retries_cancellable, with_retry_config};

pub mod functions {
    pub const TOTAL_CARDS: &str = "get_total_cards";
    pub const CARD_INFO: &str = "get_card_info";
    pub const CARD_SKILLS: &str = "get_card_skills";
    pub const CARD_REVIEWS: &str = "get_card_reviews";
    pub const WORK_PREFERENCES: &str = "get_work_preferences";
    pub const SOCIAL_LINKS: &str = "get_social_links";
    pub const CARD_LANGUAGES: &str = "get_card_languages";
    pub const CARD_ANALYTICS: &str = "get_card_analytics";
    pub const IS_ADMIN: &str = "is_admin";
    pub const PLATFORM_STATS: &str = "get_platform_stats";
}

/// Largest registry size taken at face value. A bigger count is treated as a
/// decode failure rather than a range to scan.
pub const MAX_CARD_COUNT: u64 = 1_000_000;

pub struct CardFetcher<C> {
    client: C,
    config: ReaderConfig,
    caches: Arc<CardCaches>,
}

impl<C: InspectClient> CardFetcher<C> {
    pub fn new(client: C, config: ReaderConfig, caches: Arc<CardCaches>) -> Self {
        Self {
            client,
            config,
            caches,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn caches(&self) -> &Arc<CardCaches> {
        &self.caches
    }

    /// One view call against the registry, under the retry wrapper.
    async fn view(
        &self,
        function: &str,
        args: Vec<CallArg>,
        cancel: Option<&CancellationToken>,
    ) -> Result<InspectResult> {
        let mut inputs = Vec::with_capacity(args.len() + 1);
        inputs.push(self.config.registry_arg());
        inputs.extend(args);
        let call = ViewCall::new(self.config.target(function), inputs);

        self.caches.metrics().record_remote_fetch();
        let attempt = || self.client.inspect(&call);
        let result = match cancel {
            Some(token) => with_retries_cancellable(&self.config.retry, token, attempt).await,
            None => with_retry_config(&self.config.retry, attempt).await,
        };
        result.with_context(|| format!("view call {} failed", function))
    }

    /// Shared read-through for scalars: serve fresh cache unless forced,
    /// otherwise load, store, and fall back to any cached value on failure.
    /// A fallback entry is put back so the next read can fall back again.
    async fn read_through<V, Fut>(
        &self,
        what: &str,
        force: bool,
        cached: Lookup<V>,
        load: Fut,
        store: impl FnOnce(&V),
        restore: impl FnOnce(CacheEntry<V>),
    ) -> Result<V>
    where
        V: Clone,
        Fut: Future<Output = Result<V>>,
    {
        let fallback = match cached {
            Lookup::Fresh(entry) if !force => return Ok(entry.data),
            other => other.into_entry(),
        };
        match load.await {
            Ok(value) => {
                store(&value);
                Ok(value)
            }
            Err(e) if is_cancelled(&e) => Err(e),
            Err(e) => match fallback {
                Some(entry) => {
                    warn!(what, error = %e, "refresh failed, serving cached value");
                    self.caches.metrics().record_stale_fallback();
                    let data = entry.data.clone();
                    restore(entry);
                    Ok(data)
                }
                None => Err(e),
            },
        }
    }

    // ---- cards --------------------------------------------------------------

    /// Cached card, refreshing through the remote path when missing, expired
    /// or `force`d. Errors only when there is nothing cached to fall back to.
    pub async fn fetch_card(&self, id: CardId, force: bool) -> Result<ProfileCard, FetchError> {
        self.fetch_card_inner(id, force, None).await
    }

    pub async fn fetch_card_cancellable(
        &self,
        id: CardId,
        force: bool,
        cancel: &CancellationToken,
    ) -> Result<ProfileCard, FetchError> {
        self.fetch_card_inner(id, force, Some(cancel)).await
    }

    /// [`Self::fetch_card`] with failures reported as `None`.
    pub async fn get_card(&self, id: CardId, force: bool) -> Option<ProfileCard> {
        match self.fetch_card(id, force).await {
            Ok(card) => Some(card),
            Err(e) => {
                debug!(card = id, error = %e, "card unavailable");
                None
            }
        }
    }

    pub(crate) async fn fetch_card_inner(
        &self,
        id: CardId,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<ProfileCard, FetchError> {
        let fallback = match self.caches.card(id) {
            Lookup::Fresh(entry) if !force => return Ok(entry.data),
            other => other.into_entry(),
        };
        match self.load_card(id, cancel).await {
            Ok(card) => {
                self.caches.put_card(card.clone());
                Ok(card)
            }
            Err(e @ FetchError::Cancelled { .. }) => Err(e),
            Err(e) => match fallback {
                Some(entry) => {
                    warn!(card = id, error = %e, "card refresh failed, serving cached card");
                    self.caches.metrics().record_stale_fallback();
                    let card = entry.data.clone();
                    self.caches.restore_card(entry);
                    Ok(card)
                }
                None => Err(e),
            },
        }
    }

    fn remote_error(id: CardId, error: anyhow::Error) -> FetchError {
        if is_cancelled(&error) {
            FetchError::Cancelled { id }
        } else {
            FetchError::Remote { id, source: error }
        }
    }

    async fn load_card(
        &self,
        id: CardId,
        cancel: Option<&CancellationToken>,
    ) -> Result<ProfileCard, FetchError> {
        let info = self
            .view(functions::CARD_INFO, vec![CallArg::u64(id)], cancel)
            .await
            .map_err(|e| Self::remote_error(id, e))?;
        if info.is_empty() {
            return Err(FetchError::EmptyResponse { id });
        }

        let owner = decode_address(info.value(0));
        let owner = SuiAddress::parse(&owner)
            .filter(|_| !owner.is_empty())
            .ok_or(FetchError::MissingField { id, field: "owner" })?;
        let name = decode_text(info.value(1));
        if name.is_empty() {
            return Err(FetchError::MissingField { id, field: "name" });
        }
        let now = self.caches.now_ms();

        let (skills, reviews, work_preferences, social_links, languages, analytics) = tokio::join!(
            self.sub_record(id, functions::CARD_SKILLS, cancel, |r| {
                decode_json_vector::<Skill>(r.value(0))
            }),
            self.sub_record(id, functions::CARD_REVIEWS, cancel, |r| {
                decode_json_vector::<Review>(r.value(0))
            }),
            self.sub_record(id, functions::WORK_PREFERENCES, cancel, decode_work_preferences),
            self.sub_record(id, functions::SOCIAL_LINKS, cancel, decode_social_links),
            self.sub_record(id, functions::CARD_LANGUAGES, cancel, |r| {
                decode_string_vector(r.value(0))
            }),
            self.sub_record(id, functions::CARD_ANALYTICS, cancel, decode_analytics),
        );

        Ok(ProfileCard {
            id,
            owner,
            name,
            title: decode_text(info.value(2)),
            niche: decode_text(info.value(3)),
            image_url: decode_url(info.value(4)),
            description: decode_text(info.value(5)),
            years_experience: decode_u64(info.value(6)).unwrap_or(0),
            open_to_work: decode_bool(info.value(7)),
            featured_projects: decode_json_vector::<FeaturedProject>(info.value(8)),
            created_at: decode_u64_timestamp(info.value(9), now),
            updated_at: decode_u64_timestamp(info.value(10), now),
            location: decode_text(info.value(11)),
            skills,
            reviews,
            work_preferences,
            social_links,
            languages,
            analytics,
        })
    }

    async fn sub_record<T: Default>(
        &self,
        id: CardId,
        function: &'static str,
        cancel: Option<&CancellationToken>,
        decode: impl FnOnce(&InspectResult) -> T,
    ) -> T {
        match self.view(function, vec![CallArg::u64(id)], cancel).await {
            Ok(result) => decode(&result),
            Err(e) => {
                debug!(card = id, function, error = %e, "sub-record unavailable, using default");
                T::default()
            }
        }
    }

    // ---- scalars --------------------------------------------------------------

    /// Number of cards in the registry. IDs run `1..=count`.
    pub async fn card_count(&self, force: bool) -> Result<u64> {
        self.card_count_inner(force, None).await
    }

    pub async fn card_count_cancellable(&self, force: bool, cancel: &CancellationToken) -> Result<u64> {
        self.card_count_inner(force, Some(cancel)).await
    }

    pub(crate) async fn card_count_inner(
        &self,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<u64> {
        let load = async {
            let result = self.view(functions::TOTAL_CARDS, vec![], cancel).await?;
            let total = decode_u64(result.value(0)).ok_or_else(|| anyhow!("card count did not decode"))?;
            ensure!(total <= MAX_CARD_COUNT, "implausible card count {}", total);
            Ok(total)
        };
        self.read_through(
            "card count",
            force,
            self.caches.count(),
            load,
            |total| self.caches.put_count(*total),
            |entry| self.caches.restore_count(entry),
        )
        .await
    }

    pub async fn platform_stats(&self, force: bool) -> Result<PlatformStats> {
        let load = async {
            let result = self.view(functions::PLATFORM_STATS, vec![], None).await?;
            if result.is_empty() {
                return Err(anyhow!("platform stats returned no values"));
            }
            Ok(PlatformStats {
                total_cards: decode_u64(result.value(0)).unwrap_or(0),
                active_cards: decode_u64(result.value(1)).unwrap_or(0),
                platform_balance: decode_u64(result.value(2)).unwrap_or(0),
            })
        };
        self.read_through(
            "platform stats",
            force,
            self.caches.platform_stats(),
            load,
            |stats| self.caches.put_platform_stats(stats.clone()),
            |entry| self.caches.restore_platform_stats(entry),
        )
        .await
    }

    /// Whether `address` holds the admin role. Cached on the long tier.
    pub async fn is_admin(&self, address: &SuiAddress, force: bool) -> Result<bool> {
        let load = async {
            let result = self
                .view(functions::IS_ADMIN, vec![CallArg::address(address)], None)
                .await?;
            Ok::<_, anyhow::Error>(decode_bool(result.value(0)))
        };
        self.read_through(
            "admin role",
            force,
            self.caches.admin(address),
            load,
            |flag| self.caches.put_admin(address, *flag),
            |entry| self.caches.restore_admin(address, entry),
        )
        .await
    }

    /// Card IDs matching `query`, cached under its [`SearchKey`].
    pub async fn search_ids(&self, query: &SearchQuery, force: bool) -> Result<Vec<CardId>> {
        self.search_ids_inner(query, force, None).await
    }

    pub(crate) async fn search_ids_inner(
        &self,
        query: &SearchQuery,
        force: bool,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<CardId>> {
        let key: SearchKey = query.key();
        let load = async {
            let mut args = vec![CallArg::pure(&query.remote_text().to_string())?];
            if query.kind == SearchKind::Skill {
                args.push(CallArg::pure(&query.min_proficiency)?);
            }
            let result = self.view(query.kind.function(), args, cancel).await?;
            let mut ids = decode_id_vector(result.value(0));
            ids.sort_unstable();
            ids.dedup();
            Ok::<_, anyhow::Error>(ids)
        };
        self.read_through(
            "search",
            force,
            self.caches.search_ids(&key),
            load,
            |ids| self.caches.put_search_ids(&key, ids.clone()),
            |entry| self.caches.restore_search_ids(&key, entry),
        )
        .await
    }
}

fn decode_work_preferences(result: &InspectResult) -> WorkPreferences {
    WorkPreferences {
        work_types: decode_string_vector(result.value(0)),
        hourly_rate: decode_optional_u64(result.value(1)),
        location_preference: decode_text(result.value(2)),
        availability: decode_text(result.value(3)),
    }
}

fn decode_social_links(result: &InspectResult) -> SocialLinks {
    SocialLinks {
        linkedin: decode_optional_text(result.value(0)),
        twitter: decode_optional_text(result.value(1)),
        github: decode_optional_text(result.value(2)),
        website: decode_optional(result.value(3))
            .map(|raw| decode_url(&raw))
            .filter(|url| !url.is_empty()),
    }
}

fn decode_analytics(result: &InspectResult) -> CardAnalytics {
    CardAnalytics {
        views: decode_u64(result.value(0)).unwrap_or(0),
        contact_requests: decode_u64(result.value(1)).unwrap_or(0),
        project_views: decode_u64(result.value(2)).unwrap_or(0),
        last_viewed: decode_u64(result.value(3)).unwrap_or(0),
    }
}
