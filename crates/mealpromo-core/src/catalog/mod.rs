//! Candidate catalog.
//!
//! Static, partitioned promo data: weekday/weekend lists per meal bucket plus
//! seasonal lists shared by every bucket. All time-based branching over the
//! catalog goes through [`select_candidate_pool`].

mod builtin;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::{MealBucket, MealContext, Season};
use crate::error::{PromoError, Result};
use crate::promo::PromoEntry;

/// Weekday and weekend lists for one meal bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BucketCatalog {
    #[serde(default)]
    pub weekday: Vec<PromoEntry>,
    #[serde(default)]
    pub weekend: Vec<PromoEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    buckets: HashMap<MealBucket, BucketCatalog>,
    seasonal: HashMap<Season, Vec<PromoEntry>>,
}

/// On-disk TOML layout.
///
/// ```toml
/// [[buckets.lunch.weekday]]
/// id = "lunch_light_fresh"
/// ...
/// [[seasonal.summer]]
/// id = "seasonal_summer_coolers"
/// ...
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    buckets: BTreeMap<String, BucketCatalog>,
    #[serde(default)]
    seasonal: BTreeMap<String, Vec<PromoEntry>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample catalog shipped with the app.
    pub fn builtin() -> Self {
        builtin::catalog()
    }

    pub fn with_bucket(mut self, bucket: MealBucket, lists: BucketCatalog) -> Self {
        self.buckets.insert(bucket, lists);
        self
    }

    pub fn with_seasonal(mut self, season: Season, entries: Vec<PromoEntry>) -> Self {
        self.seasonal.insert(season, entries);
        self
    }

    pub fn bucket(&self, bucket: MealBucket) -> Option<&BucketCatalog> {
        self.buckets.get(&bucket)
    }

    pub fn seasonal(&self, season: Season) -> &[PromoEntry] {
        self.seasonal.get(&season).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Scan every list for an entry with this id.
    pub fn find(&self, id: &str) -> Option<&PromoEntry> {
        let mut buckets: Vec<_> = self.buckets.iter().collect();
        buckets.sort_by_key(|(bucket, _)| **bucket);
        buckets
            .into_iter()
            .flat_map(|(_, lists)| lists.weekday.iter().chain(lists.weekend.iter()))
            .chain(self.seasonal.values().flatten())
            .find(|entry| entry.id.to_string() == id)
    }

    /// Load a catalog from a TOML file.
    ///
    /// # Errors
    /// Returns [`PromoError::Catalog`] if the file cannot be read or parsed, and
    /// [`PromoError::UnknownMealBucket`] for unrecognised bucket keys.
    pub fn load_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| PromoError::Catalog {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            PromoError::Catalog { message, .. } => PromoError::Catalog {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// # Errors
    /// See [`Catalog::load_toml`].
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(content).map_err(|e| PromoError::Catalog {
            path: Default::default(),
            message: e.to_string(),
        })?;

        let mut catalog = Catalog::new();
        for (name, lists) in file.buckets {
            catalog.buckets.insert(name.parse()?, lists);
        }
        for (name, entries) in file.seasonal {
            let season = match name.as_str() {
                "spring" => Season::Spring,
                "summer" => Season::Summer,
                "fall" | "autumn" => Season::Fall,
                "winter" => Season::Winter,
                _ => {
                    return Err(PromoError::Catalog {
                        path: Default::default(),
                        message: format!("unknown season '{name}'"),
                    })
                }
            };
            catalog.seasonal.insert(season, entries);
        }
        Ok(catalog)
    }
}

/// Which base list a pool was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Weekday,
    Weekend,
}

/// Pre-filter candidate set for a bucket and context.
#[derive(Debug, Clone, Copy)]
pub enum CandidatePool<'a> {
    Weekday {
        bucket: MealBucket,
        regular: &'a [PromoEntry],
        seasonal: &'a [PromoEntry],
    },
    Weekend {
        bucket: MealBucket,
        regular: &'a [PromoEntry],
        seasonal: &'a [PromoEntry],
    },
}

impl<'a> CandidatePool<'a> {
    pub fn kind(&self) -> PoolKind {
        match self {
            CandidatePool::Weekday { .. } => PoolKind::Weekday,
            CandidatePool::Weekend { .. } => PoolKind::Weekend,
        }
    }

    pub fn bucket(&self) -> MealBucket {
        match self {
            CandidatePool::Weekday { bucket, .. } | CandidatePool::Weekend { bucket, .. } => {
                *bucket
            }
        }
    }

    /// Regular list followed by the seasonal list, first occurrence of an id wins.
    pub fn entries(&self) -> Vec<PromoEntry> {
        let (regular, seasonal) = match self {
            CandidatePool::Weekday { regular, seasonal, .. }
            | CandidatePool::Weekend { regular, seasonal, .. } => (*regular, *seasonal),
        };
        let mut seen = HashSet::new();
        regular
            .iter()
            .chain(seasonal.iter())
            .filter(|entry| seen.insert(entry.id.clone()))
            .cloned()
            .collect()
    }
}

/// Pick the candidate pool for `bucket` under `context`.
///
/// # Errors
/// [`PromoError::UnknownMealBucket`] if the catalog has no partition for `bucket`.
pub fn select_candidate_pool<'a>(
    catalog: &'a Catalog,
    bucket: MealBucket,
    context: &MealContext,
) -> Result<CandidatePool<'a>> {
    let lists = catalog
        .bucket(bucket)
        .ok_or_else(|| PromoError::UnknownMealBucket(bucket.to_string()))?;
    let seasonal = catalog.seasonal(context.season);
    Ok(if context.is_weekend {
        CandidatePool::Weekend {
            bucket,
            regular: &lists.weekend,
            seasonal,
        }
    } else {
        CandidatePool::Weekday {
            bucket,
            regular: &lists.weekday,
            seasonal,
        }
    })
}
