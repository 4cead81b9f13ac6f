use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::context::MealBucket;
use crate::promo::PromoEntry;

/// Every carousel state change produces an event.
/// The host polls `tick()` and renders from these plus `snapshot()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CarouselEvent {
    Loaded {
        bucket: MealBucket,
        count: usize,
        at: DateTime<Utc>,
    },
    /// The selector failed; the emergency pair is showing instead.
    LoadFailed {
        bucket: MealBucket,
        error: String,
        at: DateTime<Utc>,
    },
    Advanced {
        from: usize,
        to: usize,
        at: DateTime<Utc>,
    },
    /// Programmatic jump via `go_to_promo`.
    Jumped {
        from: usize,
        to: usize,
        at: DateTime<Utc>,
    },
    InteractionStarted {
        index: usize,
        at: DateTime<Utc>,
    },
    InteractionEnded {
        index: usize,
        resume_in_ms: u64,
        at: DateTime<Utc>,
    },
    /// Cooldown elapsed or a press resolved; auto-advance is running again.
    Resumed {
        index: usize,
        at: DateTime<Utc>,
    },
    /// A cooldown elapsed while a press is still unresolved.
    Paused {
        index: usize,
        at: DateTime<Utc>,
    },
    /// The host should show a detail affordance for `entry`.
    PromoPressed {
        entry: PromoEntry,
        index: usize,
        at: DateTime<Utc>,
    },
    TornDown {
        at: DateTime<Utc>,
    },
}
