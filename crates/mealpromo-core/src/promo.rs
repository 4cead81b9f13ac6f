//! Promotional entries, structured identifiers and the user profile.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::MealBucket;

const ADAPTED_MARKER: &str = "_adapted_";
const SYNTHETIC_BASE: &str = "emergency";

/// Where an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromoKind {
    /// Taken from the catalog as-is.
    Real,
    /// Borrowed from another bucket's catalog and re-targeted.
    Adapted { target: MealBucket },
    /// Placeholder built when nothing else is available.
    Synthetic { bucket: MealBucket, seq: u8 },
}

/// Structured promo identifier.
///
/// Serialized as a plain string (`base`, `base_adapted_<bucket>`,
/// `emergency_<bucket>_<seq>`) only at storage boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct PromoId {
    base: String,
    kind: PromoKind,
}

impl PromoId {
    pub fn real(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            kind: PromoKind::Real,
        }
    }

    pub fn synthetic(bucket: MealBucket, seq: u8) -> Self {
        Self {
            base: SYNTHETIC_BASE.to_string(),
            kind: PromoKind::Synthetic { bucket, seq },
        }
    }

    /// Re-target this id at another bucket. Adapting is always done from the
    /// original base, so adapting twice never nests.
    pub fn adapted(&self, target: MealBucket) -> Self {
        Self {
            base: self.base.clone(),
            kind: PromoKind::Adapted { target },
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn kind(&self) -> PromoKind {
        self.kind
    }

    pub fn is_real(&self) -> bool {
        self.kind == PromoKind::Real
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.kind, PromoKind::Synthetic { .. })
    }
}

impl fmt::Display for PromoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            PromoKind::Real => f.write_str(&self.base),
            PromoKind::Adapted { target } => write!(f, "{}{ADAPTED_MARKER}{target}", self.base),
            PromoKind::Synthetic { bucket, seq } => write!(f, "{}_{bucket}_{seq}", self.base),
        }
    }
}

impl From<String> for PromoId {
    fn from(s: String) -> Self {
        if let Some((base, target)) = s.rsplit_once(ADAPTED_MARKER) {
            if let Ok(target) = target.parse::<MealBucket>() {
                return PromoId {
                    base: base.to_string(),
                    kind: PromoKind::Adapted { target },
                };
            }
        }
        if let Some(rest) = s.strip_prefix(SYNTHETIC_BASE).and_then(|r| r.strip_prefix('_')) {
            if let Some((bucket, seq)) = rest.rsplit_once('_') {
                if let (Ok(bucket), Ok(seq)) = (bucket.parse::<MealBucket>(), seq.parse::<u8>()) {
                    return PromoId::synthetic(bucket, seq);
                }
            }
        }
        PromoId::real(s)
    }
}

impl From<&str> for PromoId {
    fn from(s: &str) -> Self {
        PromoId::from(s.to_string())
    }
}

impl From<PromoId> for String {
    fn from(id: PromoId) -> Self {
        id.to_string()
    }
}

/// Colors attached to an entry at selection time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoTheme {
    pub background_color: String,
    pub primary_color: String,
    pub accent_color: String,
    pub gradient_colors: Vec<String>,
}

/// A promotional offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoEntry {
    pub id: PromoId,
    pub title: String,
    pub subtitle: String,
    pub button_text: String,
    pub image_ref: String,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub target_audience: BTreeSet<String>,
    /// Lower is shown first.
    pub priority: i32,
    /// `None` never expires.
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub min_order_value: f64,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub special_offer: String,
    #[serde(default)]
    pub rating: f32,
    #[serde(default)]
    pub order_count_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<PromoTheme>,
}

impl PromoEntry {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| until < now)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Caller-supplied profile. Read-only; missing fields mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub audience: BTreeSet<String>,
    pub dietary_restrictions: BTreeSet<String>,
    /// `[min, max]` order value.
    pub budget_range: Option<(f64, f64)>,
    pub allergies: BTreeSet<String>,
    pub favorite_categories: BTreeSet<String>,
}

impl UserProfile {
    pub fn has_restriction(&self, restriction: &str) -> bool {
        self.dietary_restrictions.contains(restriction)
    }

    pub fn max_budget(&self) -> Option<f64> {
        self.budget_range.map(|(_, max)| max)
    }
}
