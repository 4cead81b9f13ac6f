//! Carousel rotation.
//!
//! [`Carousel`] is a deadline-based state machine over a selector result;
//! [`CarouselDriver`] ticks one from a tokio task.

mod carousel;
mod driver;

use serde::{Deserialize, Serialize};

use crate::context::MealBucket;
use crate::error::ScrollError;
use crate::fallback::synthetic_entry;
use crate::promo::PromoEntry;

pub use carousel::{Carousel, CarouselSnapshot, TimerHandle, TimerKind};
pub use driver::CarouselDriver;

/// Rotation cadence and cooldowns, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    pub interval_ms: u64,
    /// Quiet period after a drag ends.
    pub drag_cooldown_ms: u64,
    /// Quiet period after a programmatic jump.
    pub jump_cooldown_ms: u64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 5_000,
            drag_cooldown_ms: 2_000,
            jump_cooldown_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPhase {
    /// Nothing to rotate (empty, loading or torn down).
    Idle,
    AutoAdvancing,
    UserInteracting,
    /// A press is awaiting resolution.
    Paused,
}

/// Scroll-to-index side effect, supplied by the host view.
pub trait ScrollSink: Send {
    fn scroll_to(&mut self, index: usize, animated: bool) -> Result<(), ScrollError>;
}

/// Sink for headless hosts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopScroll;

impl ScrollSink for NoopScroll {
    fn scroll_to(&mut self, _index: usize, _animated: bool) -> Result<(), ScrollError> {
        Ok(())
    }
}

/// Fixed two-entry list shown when the selector fails.
pub fn emergency_pair(bucket: MealBucket) -> Vec<PromoEntry> {
    vec![synthetic_entry(bucket, 1), synthetic_entry(bucket, 2)]
}
