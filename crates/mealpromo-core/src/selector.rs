//! Promo selector.
//!
//! One `get_promos` call walks:
//!
//! ```text
//! cache hit ─────────────────────────────────────────────────────────► return
//! cache miss -> gather -> filter -> cascade? -> theme -> sort -> truncate -> cache -> return
//! ```
//!
//! Concurrent calls for the same bucket are coalesced: the second caller waits
//! for the first and is served from the cache it just filled. Clearing takes
//! every bucket lock, so a selection in flight always lands before the clear.
//!
//! While the weekend override is set, results live in the in-process tier only
//! and the persisted tier is neither read nor written.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::cache::{CacheTier, PromoCache};
use crate::catalog::{select_candidate_pool, Catalog};
use crate::clock::Clock;
use crate::context::{resolve_context_with, MealBucket, MealContext};
use crate::error::{PromoError, Result};
use crate::fallback::FallbackCascade;
use crate::filter::filter_candidates;
use crate::promo::{PromoEntry, UserProfile};
use crate::storage::{Config, KvStore};
use crate::theme::apply_theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionConfig {
    /// Default truncation limit and cascade ceiling.
    pub max_promos: usize,
    /// Below this many filtered entries the fallback cascade runs.
    pub min_promos: usize,
    pub cache_ttl: Duration,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_promos: 5,
            min_promos: 2,
            cache_ttl: Duration::hours(crate::cache::DEFAULT_TTL_HOURS),
        }
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromoRequest {
    /// Skip the cache read and recompute.
    pub force_refresh: bool,
    /// Truncation limit; `max_promos` when unset.
    pub limit: Option<usize>,
}

impl PromoRequest {
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorStats {
    /// Times the gather stage ran.
    pub gathers: u64,
    pub memory_hits: u64,
    pub persisted_hits: u64,
    pub misses: u64,
}

#[derive(Default)]
struct Counters {
    gathers: AtomicU64,
    memory_hits: AtomicU64,
    persisted_hits: AtomicU64,
    misses: AtomicU64,
}

/// Anything the carousel can pull promos from.
#[async_trait]
pub trait PromoSource: Send + Sync {
    async fn get_promos(
        &self,
        bucket: MealBucket,
        profile: Option<&UserProfile>,
        request: PromoRequest,
    ) -> Result<Arc<Vec<PromoEntry>>>;

    async fn clear_cache(&self);
}

/// Selector service. Owns its cache; construct one per app (or per test).
pub struct PromoManager {
    catalog: Catalog,
    cache: PromoCache,
    clock: Arc<dyn Clock>,
    config: SelectionConfig,
    weekend_override: Mutex<Option<bool>>,
    inflight: AsyncMutex<HashMap<MealBucket, Arc<AsyncMutex<()>>>>,
    generations: Mutex<HashMap<MealBucket, u64>>,
    counters: Counters,
}

impl PromoManager {
    pub fn new(
        catalog: Catalog,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        config: SelectionConfig,
    ) -> Self {
        info!(
            max_promos = config.max_promos,
            min_promos = config.min_promos,
            ttl_hours = config.cache_ttl.num_hours(),
            "promo manager initialized"
        );
        Self {
            catalog,
            cache: PromoCache::new(store, config.cache_ttl),
            clock,
            config,
            weekend_override: Mutex::new(None),
            inflight: AsyncMutex::new(HashMap::new()),
            generations: Mutex::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Build from application config, loading the custom catalog if one is set.
    ///
    /// # Errors
    /// Returns [`PromoError::Catalog`] if the configured catalog cannot be loaded.
    pub fn from_config(config: &Config, store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Result<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::load_toml(Path::new(path))?,
            None => Catalog::builtin(),
        };
        Ok(Self::new(catalog, store, clock, config.selection()))
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn stats(&self) -> SelectorStats {
        SelectorStats {
            gathers: self.counters.gathers.load(Ordering::SeqCst),
            memory_hits: self.counters.memory_hits.load(Ordering::SeqCst),
            persisted_hits: self.counters.persisted_hits.load(Ordering::SeqCst),
            misses: self.counters.misses.load(Ordering::SeqCst),
        }
    }

    /// Context a selection would use right now.
    pub fn context(&self) -> MealContext {
        resolve_context_with(&self.clock.now(), self.weekend_override())
    }

    fn weekend_override(&self) -> Option<bool> {
        *self.weekend_override.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Test hook: `true` forces weekend lists, `false` restores real detection.
    ///
    /// Drops the in-process tier both ways. The persisted tier only ever holds
    /// results computed without an override, so it is left alone.
    pub async fn force_weekend_mode(&self, weekend: bool) {
        let _guards = self.acquire_all().await;
        *self.weekend_override.lock().unwrap_or_else(|e| e.into_inner()) = weekend.then_some(true);
        self.cache.clear_memory();
        self.bump_all_generations();
        info!(weekend, "weekend override changed");
    }

    /// Scan the static catalog. Never consults the cache.
    pub fn get_promo_by_id(&self, id: &str) -> Option<PromoEntry> {
        self.catalog.find(id).cloned()
    }

    /// Drop both tiers for every bucket, after any in-flight selection lands.
    pub async fn clear_cache(&self) {
        let _guards = self.acquire_all().await;
        self.cache.clear().await;
        self.bump_all_generations();
    }

    fn bump_all_generations(&self) {
        for bucket in MealBucket::ALL {
            self.bump_generation(bucket);
        }
    }

    fn generation(&self, bucket: MealBucket) -> u64 {
        let generations = self.generations.lock().unwrap_or_else(|e| e.into_inner());
        generations.get(&bucket).copied().unwrap_or(0)
    }

    fn bump_generation(&self, bucket: MealBucket) {
        let mut generations = self.generations.lock().unwrap_or_else(|e| e.into_inner());
        *generations.entry(bucket).or_insert(0) += 1;
    }

    async fn acquire(&self, bucket: MealBucket) -> OwnedMutexGuard<()> {
        let lock = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(
                inflight
                    .entry(bucket)
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }

    /// Every bucket lock, always taken in `MealBucket::ALL` order.
    async fn acquire_all(&self) -> Vec<OwnedMutexGuard<()>> {
        let mut guards = Vec::with_capacity(MealBucket::ALL.len());
        for bucket in MealBucket::ALL {
            guards.push(self.acquire(bucket).await);
        }
        guards
    }

    /// Resolve promos for `bucket`.
    ///
    /// # Errors
    /// Only [`PromoError::UnknownMealBucket`], when the catalog has no partition
    /// for `bucket`. Cache failures degrade to recomputation.
    pub async fn get_promos(
        &self,
        bucket: MealBucket,
        profile: Option<&UserProfile>,
        request: PromoRequest,
    ) -> Result<Arc<Vec<PromoEntry>>> {
        if self.catalog.bucket(bucket).is_none() {
            return Err(PromoError::UnknownMealBucket(bucket.to_string()));
        }

        let seen = self.generation(bucket);
        let _guard = self.acquire(bucket).await;
        let now = self.clock.now();
        let now_utc = now.with_timezone(&Utc);
        let weekend_override = self.weekend_override();
        let limit = request.limit.unwrap_or(self.config.max_promos);

        // A refresh that landed while we waited is as good as our own.
        let refreshed_while_waiting = self.generation(bucket) != seen;
        if !request.force_refresh || refreshed_while_waiting {
            if let Some((data, tier)) = self.cached(bucket, now_utc, weekend_override.is_some()).await {
                let counter = match tier {
                    CacheTier::Memory => &self.counters.memory_hits,
                    CacheTier::Persisted => &self.counters.persisted_hits,
                };
                counter.fetch_add(1, Ordering::SeqCst);
                return Ok(limit_cached(data, limit));
            }
        }
        self.counters.misses.fetch_add(1, Ordering::SeqCst);

        // The cached list holds at least `max_promos` entries; callers truncate their own copy.
        let cached_len = limit.max(self.config.max_promos);
        let data = Arc::new(self.select(bucket, profile, now, weekend_override, cached_len)?);
        if weekend_override.is_some() {
            self.cache.put_in_memory(bucket, Arc::clone(&data), now_utc);
        } else {
            self.cache.put(bucket, Arc::clone(&data), now_utc).await;
        }
        self.bump_generation(bucket);
        Ok(limit_cached(data, limit))
    }

    async fn cached(
        &self,
        bucket: MealBucket,
        now: DateTime<Utc>,
        memory_only: bool,
    ) -> Option<(Arc<Vec<PromoEntry>>, CacheTier)> {
        if memory_only {
            self.cache
                .get_in_memory(bucket, now)
                .map(|data| (data, CacheTier::Memory))
        } else {
            self.cache.get(bucket, now).await
        }
    }

    /// Gather, filter, cascade, theme, sort and truncate.
    fn select(
        &self,
        bucket: MealBucket,
        profile: Option<&UserProfile>,
        now: DateTime<FixedOffset>,
        weekend_override: Option<bool>,
        limit: usize,
    ) -> Result<Vec<PromoEntry>> {
        let context = resolve_context_with(&now, weekend_override);
        let now_utc = now.with_timezone(&Utc);

        self.counters.gathers.fetch_add(1, Ordering::SeqCst);
        let pool = select_candidate_pool(&self.catalog, bucket, &context)?;
        let candidates = pool.entries();
        let gathered = candidates.len();

        let filtered = filter_candidates(candidates, profile, now_utc);
        debug!(
            %bucket,
            pool = ?pool.kind(),
            season = %context.season,
            gathered,
            kept = filtered.len(),
            "filtered candidate pool"
        );

        let ensured = if filtered.len() < self.config.min_promos {
            if filtered.is_empty() {
                debug!(%bucket, "catalog empty after filtering");
            }
            FallbackCascade {
                catalog: &self.catalog,
                profile,
                context: &context,
                now: now_utc,
                min_count: self.config.min_promos,
                max_count: limit.max(self.config.min_promos),
            }
            .ensure_minimum(filtered, bucket)
        } else {
            filtered
        };

        let mut promos = apply_theme(ensured, bucket);
        promos.sort_by_key(|entry| entry.priority);
        promos.truncate(limit);

        info!(%bucket, count = promos.len(), weekend = context.is_weekend, "promos selected");
        Ok(promos)
    }
}

/// Serve a cached list, re-truncating only when the caller asks for fewer.
fn limit_cached(data: Arc<Vec<PromoEntry>>, limit: usize) -> Arc<Vec<PromoEntry>> {
    if limit < data.len() {
        Arc::new(data[..limit].to_vec())
    } else {
        data
    }
}

#[async_trait]
impl PromoSource for PromoManager {
    async fn get_promos(
        &self,
        bucket: MealBucket,
        profile: Option<&UserProfile>,
        request: PromoRequest,
    ) -> Result<Arc<Vec<PromoEntry>>> {
        PromoManager::get_promos(self, bucket, profile, request).await
    }

    async fn clear_cache(&self) {
        PromoManager::clear_cache(self).await
    }
}
