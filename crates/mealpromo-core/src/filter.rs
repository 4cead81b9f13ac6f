//! Candidate filter pipeline.
//!
//! Every predicate is an independent AND-conjunction; the order they run in
//! only affects which one gets blamed in the trace log.

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::promo::{PromoEntry, UserProfile};

/// Audience sentinel matching every profile.
pub const AUDIENCE_ALL: &str = "all";

/// Dietary restriction -> tags it excludes.
const DIETARY_EXCLUSIONS: &[(&str, &[&str])] = &[
    ("vegetarian", &["non-vegetarian"]),
    ("vegan", &["dairy", "meat"]),
    ("gluten-free", &["gluten"]),
];

pub fn audience_matches(entry: &PromoEntry, profile: &UserProfile) -> bool {
    entry.target_audience.is_empty()
        || entry.target_audience.contains(AUDIENCE_ALL)
        || !entry.target_audience.is_disjoint(&profile.audience)
}

pub fn dietary_compatible(entry: &PromoEntry, profile: &UserProfile) -> bool {
    DIETARY_EXCLUSIONS.iter().all(|(restriction, excluded)| {
        !profile.has_restriction(restriction) || !excluded.iter().any(|tag| entry.has_tag(tag))
    })
}

pub fn within_budget(entry: &PromoEntry, profile: &UserProfile) -> bool {
    profile
        .max_budget()
        .map_or(true, |max| entry.min_order_value <= max)
}

pub fn allergy_safe(entry: &PromoEntry, profile: &UserProfile) -> bool {
    entry.tags.is_disjoint(&profile.allergies)
}

pub fn is_valid(entry: &PromoEntry, now: DateTime<Utc>) -> bool {
    !entry.is_expired(now)
}

/// Name of the first predicate rejecting `entry`, if any.
fn rejection(entry: &PromoEntry, profile: Option<&UserProfile>, now: DateTime<Utc>) -> Option<&'static str> {
    if !is_valid(entry, now) {
        return Some("validity");
    }
    let profile = profile?;
    if !audience_matches(entry, profile) {
        Some("audience")
    } else if !dietary_compatible(entry, profile) {
        Some("dietary")
    } else if !within_budget(entry, profile) {
        Some("budget")
    } else if !allergy_safe(entry, profile) {
        Some("allergy")
    } else {
        None
    }
}

/// Keep entries passing every predicate. Without a profile only validity applies.
pub fn filter_candidates(
    candidates: Vec<PromoEntry>,
    profile: Option<&UserProfile>,
    now: DateTime<Utc>,
) -> Vec<PromoEntry> {
    candidates
        .into_iter()
        .filter(|entry| match rejection(entry, profile, now) {
            Some(predicate) => {
                trace!(id = %entry.id, predicate, "promo filtered out");
                false
            }
            None => true,
        })
        .collect()
}
