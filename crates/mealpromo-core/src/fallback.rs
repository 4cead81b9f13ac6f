//! Fallback cascade.
//!
//! Runs when fewer than `min_count` entries survive filtering. Stages, each
//! only while still short:
//!
//! 1. alternate time mode (weekday <-> weekend list for the same bucket)
//! 2. cross-bucket adaptation (borrow from the other buckets, re-targeted)
//! 3. synthetic placeholders
//!
//! Applying the cascade to its own output is a no-op.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::catalog::{select_candidate_pool, Catalog};
use crate::context::{MealBucket, MealContext};
use crate::filter::filter_candidates;
use crate::promo::{PromoEntry, PromoId, UserProfile};
use crate::theme::default_theme;

/// Priority given to synthetic entries so they sort after everything real.
pub const SYNTHETIC_PRIORITY: i32 = 999;

fn bucket_label(bucket: MealBucket) -> &'static str {
    match bucket {
        MealBucket::Breakfast => "Breakfast",
        MealBucket::Lunch => "Lunch",
        MealBucket::Snacks => "Snacks",
        MealBucket::Dinner => "Dinner",
    }
}

/// Minimal placeholder entry for `bucket`.
pub fn synthetic_entry(bucket: MealBucket, seq: u8) -> PromoEntry {
    let label = bucket_label(bucket);
    let (title, subtitle) = match seq {
        1 => (
            format!("{label} Specials"),
            format!("Fresh {} picks are on their way", label.to_lowercase()),
        ),
        _ => (
            format!("Explore the {label} Menu"),
            "Browse everything available near you".to_string(),
        ),
    };
    PromoEntry {
        id: PromoId::synthetic(bucket, seq),
        title,
        subtitle,
        button_text: "Explore Menu".to_string(),
        image_ref: format!("promos/placeholder_{bucket}.png"),
        discount_percent: 0.0,
        category: "general".to_string(),
        tags: Default::default(),
        target_audience: std::iter::once(crate::filter::AUDIENCE_ALL.to_string()).collect(),
        priority: SYNTHETIC_PRIORITY,
        valid_until: None,
        min_order_value: 0.0,
        badge: None,
        special_offer: String::new(),
        rating: 0.0,
        order_count_label: String::new(),
        theme: Some(default_theme()),
    }
}

/// Clone `entry` into `target`'s namespace.
pub fn adapt_entry(entry: &PromoEntry, target: MealBucket) -> PromoEntry {
    let label = bucket_label(target);
    let upper = label.to_uppercase();
    PromoEntry {
        id: entry.id.adapted(target),
        subtitle: format!("Great for {}: {}", label.to_lowercase(), entry.subtitle),
        badge: Some(match &entry.badge {
            Some(badge) => format!("{badge} ({upper})"),
            None => format!("{upper} PICK"),
        }),
        theme: None,
        ..entry.clone()
    }
}

/// Inputs shared by every stage of the cascade.
#[derive(Debug, Clone, Copy)]
pub struct FallbackCascade<'a> {
    pub catalog: &'a Catalog,
    pub profile: Option<&'a UserProfile>,
    pub context: &'a MealContext,
    pub now: DateTime<Utc>,
    pub min_count: usize,
    pub max_count: usize,
}

impl<'a> FallbackCascade<'a> {
    pub fn ensure_minimum(&self, primary: Vec<PromoEntry>, bucket: MealBucket) -> Vec<PromoEntry> {
        if primary.len() >= self.min_count {
            return primary;
        }
        let max_count = self.max_count.max(self.min_count);
        let mut running = Running::new(primary);

        if running.len() < self.min_count {
            let alternate = MealContext {
                is_weekend: !self.context.is_weekend,
                ..*self.context
            };
            if let Ok(pool) = select_candidate_pool(self.catalog, bucket, &alternate) {
                let added = running.merge(filter_candidates(pool.entries(), self.profile, self.now));
                debug!(%bucket, added, total = running.len(), "fallback: alternate time mode");
            }
        }

        if running.len() < self.min_count {
            for other in bucket.others() {
                if running.len() >= self.min_count || running.len() >= max_count {
                    break;
                }
                let Ok(pool) = select_candidate_pool(self.catalog, other, self.context) else {
                    continue;
                };
                let room = max_count - running.len();
                let borrowed: Vec<_> = filter_candidates(pool.entries(), self.profile, self.now)
                    .into_iter()
                    .filter(|entry| entry.id.is_real() && !running.has_base(entry.id.base()))
                    .take(room)
                    .map(|entry| adapt_entry(&entry, bucket))
                    .collect();
                let added = running.merge(borrowed);
                debug!(%bucket, from = %other, added, total = running.len(), "fallback: cross-bucket adaptation");
            }
        }

        if running.is_empty() {
            running.push(synthetic_entry(bucket, 1));
            debug!(%bucket, "fallback: synthesized placeholder");
        } else if running.len() == 1 && running.non_synthetic() == 1 {
            running.push(synthetic_entry(bucket, running.next_synthetic_seq(bucket)));
            debug!(%bucket, "fallback: padded single entry with placeholder");
        }

        running.into_entries()
    }
}

/// Running result set with id bookkeeping.
struct Running {
    entries: Vec<PromoEntry>,
    ids: HashSet<PromoId>,
    bases: HashSet<String>,
}

impl Running {
    fn new(primary: Vec<PromoEntry>) -> Self {
        let mut running = Self {
            entries: Vec::with_capacity(primary.len()),
            ids: HashSet::new(),
            bases: HashSet::new(),
        };
        running.merge(primary);
        running
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn has_base(&self, base: &str) -> bool {
        self.bases.contains(base)
    }

    fn non_synthetic(&self) -> usize {
        self.entries.iter().filter(|e| !e.id.is_synthetic()).count()
    }

    fn next_synthetic_seq(&self, bucket: MealBucket) -> u8 {
        (1..=u8::MAX)
            .find(|seq| !self.ids.contains(&PromoId::synthetic(bucket, *seq)))
            .unwrap_or(u8::MAX)
    }

    fn push(&mut self, entry: PromoEntry) -> bool {
        if !self.ids.insert(entry.id.clone()) {
            return false;
        }
        if !entry.id.is_synthetic() {
            self.bases.insert(entry.id.base().to_string());
        }
        self.entries.push(entry);
        true
    }

    /// Append entries with unseen ids; returns how many were added.
    fn merge(&mut self, entries: Vec<PromoEntry>) -> usize {
        let mut added = 0;
        for entry in entries {
            if self.push(entry) {
                added += 1;
            }
        }
        added
    }

    fn into_entries(self) -> Vec<PromoEntry> {
        self.entries
    }
}
