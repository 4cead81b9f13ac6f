//! Two-tier promo cache.
//!
//! Reads check the in-process map first, then the persisted store (promoting
//! fresh records into memory). Writes go to both tiers. Any persisted-tier
//! failure, including records that no longer parse, is logged and treated as
//! a miss.
//!
//! An entry is served only while it is younger than the TTL and none of its
//! promos has passed `valid_until`. A `cached_at` in the future (the clock
//! moved backwards) counts as stale.
//!
//! Persisted layout: key `promos_<bucket>`, value
//! `{"data": [...], "timestamp": <epoch ms>, "mealType": "<bucket>"}`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::MealBucket;
use crate::error::{PromoError, StoreError};
use crate::promo::PromoEntry;
use crate::storage::KvStore;

pub const DEFAULT_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub meal_bucket: MealBucket,
    pub data: Arc<Vec<PromoEntry>>,
    pub cached_at: DateTime<Utc>,
}

/// Persisted record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedPromos {
    pub data: Vec<PromoEntry>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub meal_type: String,
}

/// Which tier served a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Memory,
    Persisted,
}

pub fn cache_key(bucket: MealBucket) -> String {
    format!("promos_{bucket}")
}

pub struct PromoCache {
    memory: Mutex<HashMap<MealBucket, CacheEntry>>,
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl PromoCache {
    pub fn new(store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self {
            memory: Mutex::new(HashMap::new()),
            store,
            ttl,
        }
    }

    pub fn with_default_ttl(store: Arc<dyn KvStore>) -> Self {
        Self::new(store, Duration::hours(DEFAULT_TTL_HOURS))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(entry.cached_at);
        age >= Duration::zero()
            && age < self.ttl
            && !entry.data.iter().any(|promo| promo.is_expired(now))
    }

    fn memory_get(&self, bucket: MealBucket, now: DateTime<Utc>) -> Option<Arc<Vec<PromoEntry>>> {
        let mut memory = self.memory.lock().unwrap_or_else(|e| e.into_inner());
        match memory.get(&bucket) {
            Some(entry) if self.is_fresh(entry, now) => Some(Arc::clone(&entry.data)),
            Some(_) => {
                memory.remove(&bucket);
                None
            }
            None => None,
        }
    }

    fn memory_put(&self, entry: CacheEntry) {
        let mut memory = self.memory.lock().unwrap_or_else(|e| e.into_inner());
        memory.insert(entry.meal_bucket, entry);
    }

    /// Decode a persisted record, or `None` if it does not belong to `bucket`.
    fn decode(bucket: MealBucket, raw: &str) -> Result<Option<CacheEntry>, StoreError> {
        let record: PersistedPromos = serde_json::from_str(raw)?;
        if record.meal_type != bucket.as_str() {
            return Ok(None);
        }
        let Some(cached_at) = Utc.timestamp_millis_opt(record.timestamp).single() else {
            return Ok(None);
        };
        Ok(Some(CacheEntry {
            meal_bucket: bucket,
            data: Arc::new(record.data),
            cached_at,
        }))
    }

    async fn persisted_get(&self, bucket: MealBucket) -> Result<Option<CacheEntry>, StoreError> {
        match self.store.get(&cache_key(bucket)).await? {
            Some(raw) => Self::decode(bucket, &raw),
            None => Ok(None),
        }
    }

    /// Look up `bucket`, returning the data and the tier that served it.
    pub async fn get(
        &self,
        bucket: MealBucket,
        now: DateTime<Utc>,
    ) -> Option<(Arc<Vec<PromoEntry>>, CacheTier)> {
        if let Some(data) = self.memory_get(bucket, now) {
            debug!(%bucket, "promo cache hit (memory)");
            return Some((data, CacheTier::Memory));
        }

        match self.persisted_get(bucket).await {
            Ok(Some(entry)) if self.is_fresh(&entry, now) => {
                debug!(%bucket, "promo cache hit (persisted), promoting");
                let data = Arc::clone(&entry.data);
                self.memory_put(entry);
                Some((data, CacheTier::Persisted))
            }
            Ok(_) => {
                debug!(%bucket, "promo cache miss");
                None
            }
            Err(e) => {
                warn!(%bucket, error = %PromoError::CachePersistence(e), "treating unreadable cache as miss");
                None
            }
        }
    }

    /// Look up `bucket` in the in-process tier only.
    pub fn get_in_memory(&self, bucket: MealBucket, now: DateTime<Utc>) -> Option<Arc<Vec<PromoEntry>>> {
        let data = self.memory_get(bucket, now);
        debug!(%bucket, hit = data.is_some(), "promo cache lookup (memory only)");
        data
    }

    /// Store `data` in the in-process tier only. The persisted record is untouched.
    pub fn put_in_memory(&self, bucket: MealBucket, data: Arc<Vec<PromoEntry>>, now: DateTime<Utc>) {
        self.memory_put(CacheEntry {
            meal_bucket: bucket,
            data,
            cached_at: now,
        });
    }

    /// Store `data` in both tiers.
    pub async fn put(&self, bucket: MealBucket, data: Arc<Vec<PromoEntry>>, now: DateTime<Utc>) {
        self.put_in_memory(bucket, Arc::clone(&data), now);

        let record = PersistedPromos {
            data: data.as_ref().clone(),
            timestamp: now.timestamp_millis(),
            meal_type: bucket.to_string(),
        };
        let result = match serde_json::to_string(&record) {
            Ok(json) => self.store.set(&cache_key(bucket), &json).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = result {
            warn!(%bucket, error = %PromoError::CachePersistence(e), "failed to persist promo cache");
        }
    }

    pub fn clear_memory(&self) {
        self.memory
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Drop every bucket from both tiers.
    pub async fn clear(&self) {
        self.clear_memory();
        for bucket in MealBucket::ALL {
            if let Err(e) = self.store.remove(&cache_key(bucket)).await {
                warn!(%bucket, error = %PromoError::CachePersistence(e), "failed to clear persisted promos");
            }
        }
        debug!("promo cache cleared");
    }
}
