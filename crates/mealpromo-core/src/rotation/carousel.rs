//! Carousel state machine.
//!
//! Like the timer it replaces, the carousel has no internal thread: the host
//! calls `tick()` and any timer whose deadline has passed fires then.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> AutoAdvancing <-> UserInteracting
//!              ^  |
//!              |  v
//!             Paused
//! ```
//!
//! There is at most one pending timer. Every transition replaces it through
//! `arm_timer`/`clear_timer`, so a superseded timer can never fire.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use super::{emergency_pair, NoopScroll, RotationConfig, RotationPhase, ScrollSink};
use crate::clock::Clock;
use crate::context::MealBucket;
use crate::events::CarouselEvent;
use crate::promo::{PromoEntry, UserProfile};
use crate::selector::{PromoRequest, PromoSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Auto-advance to the next promo.
    Advance,
    /// End of an interaction cooldown.
    Resume,
}

/// The single pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimerHandle {
    pub id: u64,
    pub kind: TimerKind,
    /// Deadline in clock milliseconds.
    pub due_ms: i64,
}

/// Render state for the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselSnapshot {
    pub bucket: MealBucket,
    pub phase: RotationPhase,
    pub index: usize,
    pub len: usize,
    pub current_id: Option<String>,
    pub is_loading: bool,
    pub is_empty: bool,
    pub error: Option<String>,
    pub is_user_interacting: bool,
    pub is_paused: bool,
}

pub struct Carousel {
    source: Arc<dyn PromoSource>,
    clock: Arc<dyn Clock>,
    scroll: Box<dyn ScrollSink>,
    config: RotationConfig,
    bucket: MealBucket,
    profile: Option<UserProfile>,
    promos: Arc<Vec<PromoEntry>>,
    index: usize,
    phase: RotationPhase,
    is_user_interacting: bool,
    is_paused: bool,
    loading: bool,
    error: Option<String>,
    timer: Option<TimerHandle>,
    next_timer_id: u64,
    torn_down: bool,
}

impl Carousel {
    /// Create an idle carousel. Nothing is requested until [`load`](Self::load).
    pub fn new(
        source: Arc<dyn PromoSource>,
        clock: Arc<dyn Clock>,
        config: RotationConfig,
        bucket: MealBucket,
    ) -> Self {
        Self {
            source,
            clock,
            scroll: Box::new(NoopScroll),
            config,
            bucket,
            profile: None,
            promos: Arc::new(Vec::new()),
            index: 0,
            phase: RotationPhase::Idle,
            is_user_interacting: false,
            is_paused: false,
            loading: false,
            error: None,
            timer: None,
            next_timer_id: 0,
            torn_down: false,
        }
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_scroll(mut self, scroll: Box<dyn ScrollSink>) -> Self {
        self.scroll = scroll;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn bucket(&self) -> MealBucket {
        self.bucket
    }

    pub fn phase(&self) -> RotationPhase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.index
    }

    pub fn promos(&self) -> &[PromoEntry] {
        &self.promos
    }

    pub fn current(&self) -> Option<&PromoEntry> {
        self.promos.get(self.index)
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn snapshot(&self) -> CarouselSnapshot {
        CarouselSnapshot {
            bucket: self.bucket,
            phase: self.phase,
            index: self.index,
            len: self.promos.len(),
            current_id: self.current().map(|p| p.id.to_string()),
            is_loading: self.loading,
            is_empty: self.promos.is_empty(),
            error: self.error.clone(),
            is_user_interacting: self.is_user_interacting,
            is_paused: self.is_paused,
        }
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Initial load, served from the cache when possible.
    pub async fn load(&mut self) -> CarouselEvent {
        self.request(false).await
    }

    /// Re-request the current bucket, bypassing the cache.
    pub async fn refresh(&mut self) -> CarouselEvent {
        self.request(true).await
    }

    /// The "try again" action after a failed load.
    pub async fn retry(&mut self) -> CarouselEvent {
        self.request(true).await
    }

    pub async fn set_meal_bucket(&mut self, bucket: MealBucket) -> CarouselEvent {
        info!(from = %self.bucket, to = %bucket, "meal bucket changed");
        self.bucket = bucket;
        self.request(true).await
    }

    /// Drop every cached bucket, then reload.
    pub async fn clear_and_reload(&mut self) -> CarouselEvent {
        self.clear_timer();
        self.source.clear_cache().await;
        self.request(false).await
    }

    /// Reset rotation state, fetch, apply, and only then restart the timer.
    async fn request(&mut self, force_refresh: bool) -> CarouselEvent {
        self.clear_timer();
        self.index = 0;
        self.phase = RotationPhase::Idle;
        self.is_user_interacting = false;
        self.is_paused = false;
        self.loading = true;

        let request = PromoRequest {
            force_refresh,
            limit: None,
        };
        let result = self
            .source
            .get_promos(self.bucket, self.profile.as_ref(), request)
            .await;
        self.loading = false;

        let at = self.at();
        let event = match result {
            Ok(promos) => {
                self.error = None;
                self.promos = promos;
                CarouselEvent::Loaded {
                    bucket: self.bucket,
                    count: self.promos.len(),
                    at,
                }
            }
            Err(e) => {
                warn!(bucket = %self.bucket, error = %e, "promo load failed, showing emergency pair");
                self.error = Some(e.to_string());
                self.promos = Arc::new(emergency_pair(self.bucket));
                CarouselEvent::LoadFailed {
                    bucket: self.bucket,
                    error: e.to_string(),
                    at,
                }
            }
        };
        self.start_rotation();
        event
    }

    fn start_rotation(&mut self) {
        if self.promos.is_empty() || self.torn_down {
            self.phase = RotationPhase::Idle;
            return;
        }
        self.phase = RotationPhase::AutoAdvancing;
        self.arm_advance();
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Call periodically. Fires the pending timer once its deadline passes.
    pub fn tick(&mut self) -> Option<CarouselEvent> {
        if self.torn_down {
            return None;
        }
        let timer = self.timer?;
        if self.clock.now_ms() < timer.due_ms {
            return None;
        }
        self.timer = None;
        trace!(id = timer.id, kind = ?timer.kind, "timer fired");

        match timer.kind {
            TimerKind::Advance => {
                if self.is_user_interacting || self.is_paused || self.promos.len() < 2 {
                    return None;
                }
                let from = self.index;
                self.index = (from + 1) % self.promos.len();
                self.scroll_to(self.index);
                self.arm_advance();
                Some(CarouselEvent::Advanced {
                    from,
                    to: self.index,
                    at: self.at(),
                })
            }
            TimerKind::Resume => {
                self.is_user_interacting = false;
                if self.is_paused {
                    self.phase = RotationPhase::Paused;
                    return Some(CarouselEvent::Paused {
                        index: self.index,
                        at: self.at(),
                    });
                }
                self.phase = RotationPhase::AutoAdvancing;
                self.arm_advance();
                Some(CarouselEvent::Resumed {
                    index: self.index,
                    at: self.at(),
                })
            }
        }
    }

    /// The user started dragging. Auto-advance stops immediately.
    pub fn begin_interaction(&mut self) -> Option<CarouselEvent> {
        if self.torn_down || self.promos.is_empty() {
            return None;
        }
        self.clear_timer();
        self.is_user_interacting = true;
        self.phase = RotationPhase::UserInteracting;
        Some(CarouselEvent::InteractionStarted {
            index: self.index,
            at: self.at(),
        })
    }

    /// The drag ended, optionally settling on a new index.
    pub fn end_interaction(&mut self, settled: Option<usize>) -> Option<CarouselEvent> {
        if self.torn_down || !self.is_user_interacting {
            return None;
        }
        if let Some(index) = settled.filter(|&i| i < self.promos.len()) {
            self.index = index;
        }
        let cooldown = self.config.drag_cooldown_ms;
        self.arm_timer(TimerKind::Resume, cooldown);
        Some(CarouselEvent::InteractionEnded {
            index: self.index,
            resume_in_ms: cooldown,
            at: self.at(),
        })
    }

    /// Jump to `index`. Out-of-range and same-index jumps are ignored.
    pub fn go_to_promo(&mut self, index: usize) -> Option<CarouselEvent> {
        if self.torn_down || index >= self.promos.len() || index == self.index {
            return None;
        }
        let from = self.index;
        self.is_user_interacting = true;
        self.phase = RotationPhase::UserInteracting;
        self.index = index;
        self.scroll_to(index);
        self.arm_timer(TimerKind::Resume, self.config.jump_cooldown_ms);
        Some(CarouselEvent::Jumped {
            from,
            to: index,
            at: self.at(),
        })
    }

    /// The user tapped a promo. Rotation pauses until [`resolve_press`](Self::resolve_press).
    pub fn press(&mut self, index: usize) -> Option<CarouselEvent> {
        if self.torn_down {
            return None;
        }
        let entry = self.promos.get(index)?.clone();
        self.clear_timer();
        self.is_paused = true;
        self.phase = RotationPhase::Paused;
        debug!(index, id = %entry.id, "promo pressed");
        Some(CarouselEvent::PromoPressed {
            entry,
            index,
            at: self.at(),
        })
    }

    /// The detail affordance was confirmed or dismissed.
    pub fn resolve_press(&mut self) -> Option<CarouselEvent> {
        if self.torn_down || !self.is_paused {
            return None;
        }
        self.is_paused = false;
        self.is_user_interacting = false;
        self.phase = RotationPhase::AutoAdvancing;
        self.arm_advance();
        Some(CarouselEvent::Resumed {
            index: self.index,
            at: self.at(),
        })
    }

    /// Stop for good. Later ticks and commands are no-ops.
    pub fn teardown(&mut self) -> Option<CarouselEvent> {
        if self.torn_down {
            return None;
        }
        self.clear_timer();
        self.torn_down = true;
        self.phase = RotationPhase::Idle;
        debug!(bucket = %self.bucket, "carousel torn down");
        Some(CarouselEvent::TornDown { at: self.at() })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn at(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    fn arm_advance(&mut self) {
        if self.promos.len() > 1 {
            self.arm_timer(TimerKind::Advance, self.config.interval_ms);
        }
    }

    fn arm_timer(&mut self, kind: TimerKind, after_ms: u64) {
        self.clear_timer();
        if self.torn_down {
            return;
        }
        self.next_timer_id += 1;
        let after = i64::try_from(after_ms).unwrap_or(i64::MAX);
        let handle = TimerHandle {
            id: self.next_timer_id,
            kind,
            due_ms: self.clock.now_ms().saturating_add(after),
        };
        trace!(id = handle.id, ?kind, due_ms = handle.due_ms, "timer armed");
        self.timer = Some(handle);
    }

    fn clear_timer(&mut self) {
        if let Some(handle) = self.timer.take() {
            trace!(id = handle.id, kind = ?handle.kind, "timer cleared");
        }
    }

    fn scroll_to(&mut self, index: usize) {
        if let Err(e) = self.scroll.scroll_to(index, true) {
            warn!(index, error = %e, "scroll failed; index kept");
        }
    }
}

impl Drop for Carousel {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{PromoError, Result, ScrollError};
    use crate::fallback::synthetic_entry;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StaticSource {
        promos: Arc<Vec<PromoEntry>>,
        failing: AtomicBool,
        calls: AtomicUsize,
        forced: AtomicUsize,
        clears: AtomicUsize,
    }

    impl StaticSource {
        fn with_len(len: usize) -> Arc<Self> {
            let promos = (1..=len as u8)
                .map(|seq| synthetic_entry(MealBucket::Lunch, seq))
                .collect();
            Arc::new(Self {
                promos: Arc::new(promos),
                failing: AtomicBool::new(false),
                calls: AtomicUsize::new(0),
                forced: AtomicUsize::new(0),
                clears: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl PromoSource for StaticSource {
        async fn get_promos(
            &self,
            bucket: MealBucket,
            _profile: Option<&UserProfile>,
            request: PromoRequest,
        ) -> Result<Arc<Vec<PromoEntry>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if request.force_refresh {
                self.forced.fetch_add(1, Ordering::SeqCst);
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(PromoError::UnknownMealBucket(bucket.to_string()));
            }
            Ok(Arc::clone(&self.promos))
        }

        async fn clear_cache(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Clone, Default)]
    struct RecordingScroll {
        calls: Arc<Mutex<Vec<usize>>>,
        failing: bool,
    }

    impl ScrollSink for RecordingScroll {
        fn scroll_to(&mut self, index: usize, _animated: bool) -> std::result::Result<(), ScrollError> {
            self.calls.lock().unwrap().push(index);
            if self.failing {
                return Err(ScrollError {
                    index,
                    reason: "view not laid out".into(),
                });
            }
            Ok(())
        }
    }

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::at("2024-06-05T12:00:00+00:00").unwrap())
    }

    async fn loaded(len: usize) -> (Arc<StaticSource>, Arc<ManualClock>, Carousel) {
        let source = StaticSource::with_len(len);
        let clock = clock();
        let mut carousel = Carousel::new(
            source.clone(),
            clock.clone(),
            RotationConfig::default(),
            MealBucket::Lunch,
        );
        carousel.load().await;
        (source, clock, carousel)
    }

    #[test]
    fn new_carousel_is_idle() {
        let carousel = Carousel::new(
            StaticSource::with_len(3),
            clock(),
            RotationConfig::default(),
            MealBucket::Lunch,
        );
        assert_eq!(carousel.phase(), RotationPhase::Idle);
        assert!(carousel.timer().is_none());
        assert!(carousel.snapshot().is_empty);
    }

    #[tokio::test]
    async fn load_arms_advance_timer() {
        let (_, _, carousel) = loaded(3).await;
        assert_eq!(carousel.phase(), RotationPhase::AutoAdvancing);
        let timer = carousel.timer().unwrap();
        assert_eq!(timer.kind, TimerKind::Advance);
    }

    #[tokio::test]
    async fn single_entry_never_arms_timer() {
        let (_, clock, mut carousel) = loaded(1).await;
        assert_eq!(carousel.phase(), RotationPhase::AutoAdvancing);
        assert!(carousel.timer().is_none());
        clock.advance_ms(60_000);
        assert!(carousel.tick().is_none());
        assert_eq!(carousel.current_index(), 0);
    }

    #[tokio::test]
    async fn advances_and_wraps() {
        let (_, clock, mut carousel) = loaded(3).await;
        clock.advance_ms(4_999);
        assert!(carousel.tick().is_none());
        for expected in [1, 2, 0] {
            clock.advance_ms(5_000);
            let event = carousel.tick().unwrap();
            assert!(matches!(event, CarouselEvent::Advanced { to, .. } if to == expected));
        }
    }

    #[tokio::test]
    async fn interaction_clears_timer_until_cooldown() {
        let (_, clock, mut carousel) = loaded(3).await;
        carousel.begin_interaction().unwrap();
        assert!(carousel.timer().is_none());
        clock.advance_ms(10_000);
        assert!(carousel.tick().is_none());

        let ended = carousel.end_interaction(Some(2)).unwrap();
        assert!(matches!(ended, CarouselEvent::InteractionEnded { index: 2, resume_in_ms: 2_000, .. }));
        clock.advance_ms(1_999);
        assert!(carousel.tick().is_none());
        clock.advance_ms(1);
        assert!(matches!(carousel.tick(), Some(CarouselEvent::Resumed { index: 2, .. })));
        assert_eq!(carousel.phase(), RotationPhase::AutoAdvancing);

        clock.advance_ms(5_000);
        assert!(matches!(carousel.tick(), Some(CarouselEvent::Advanced { from: 2, to: 0, .. })));
    }

    #[tokio::test]
    async fn end_without_begin_is_ignored() {
        let (_, _, mut carousel) = loaded(3).await;
        assert!(carousel.end_interaction(Some(1)).is_none());
        assert_eq!(carousel.current_index(), 0);
    }

    #[tokio::test]
    async fn jump_respects_cooldown() {
        let (_, clock, mut carousel) = loaded(4).await;
        assert!(carousel.go_to_promo(2).is_some());
        assert_eq!(carousel.current_index(), 2);

        clock.advance_ms(100);
        assert!(carousel.tick().is_none());
        assert_eq!(carousel.current_index(), 2);

        clock.advance_ms(400);
        assert!(matches!(carousel.tick(), Some(CarouselEvent::Resumed { index: 2, .. })));
    }

    #[tokio::test]
    async fn invalid_jumps_are_ignored() {
        let (_, _, mut carousel) = loaded(4).await;
        let before = carousel.timer();
        assert!(carousel.go_to_promo(0).is_none());
        assert!(carousel.go_to_promo(4).is_none());
        assert_eq!(carousel.timer(), before);
        assert_eq!(carousel.phase(), RotationPhase::AutoAdvancing);
    }

    #[tokio::test]
    async fn every_transition_replaces_the_timer() {
        let (_, _, mut carousel) = loaded(4).await;
        let first = carousel.timer().unwrap();
        carousel.go_to_promo(1);
        let second = carousel.timer().unwrap();
        carousel.go_to_promo(3);
        let third = carousel.timer().unwrap();
        assert!(first.id < second.id && second.id < third.id);
        assert_eq!(third.kind, TimerKind::Resume);
    }

    #[tokio::test]
    async fn press_pauses_until_resolved() {
        let (_, clock, mut carousel) = loaded(3).await;
        let event = carousel.press(1).unwrap();
        match event {
            CarouselEvent::PromoPressed { entry, index, .. } => {
                assert_eq!(index, 1);
                assert_eq!(entry.id.to_string(), "emergency_lunch_2");
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(carousel.phase(), RotationPhase::Paused);
        assert!(carousel.press(7).is_none());

        clock.advance_ms(30_000);
        assert!(carousel.tick().is_none());
        assert_eq!(carousel.current_index(), 0);

        assert!(carousel.resolve_press().is_some());
        assert!(carousel.resolve_press().is_none());
        clock.advance_ms(5_000);
        assert!(matches!(carousel.tick(), Some(CarouselEvent::Advanced { to: 1, .. })));
    }

    #[tokio::test]
    async fn drag_cooldown_during_press_reports_paused() {
        let (_, clock, mut carousel) = loaded(3).await;
        carousel.begin_interaction();
        carousel.press(2);
        carousel.end_interaction(None);

        clock.advance_ms(2_000);
        assert!(matches!(carousel.tick(), Some(CarouselEvent::Paused { index: 0, .. })));
        assert_eq!(carousel.phase(), RotationPhase::Paused);
        assert!(!carousel.snapshot().is_user_interacting);
        assert!(carousel.timer().is_none());

        assert!(matches!(carousel.resolve_press(), Some(CarouselEvent::Resumed { .. })));
    }

    #[tokio::test]
    async fn scroll_failures_keep_index() {
        let scroll = RecordingScroll {
            failing: true,
            ..Default::default()
        };
        let calls = scroll.calls.clone();
        let clock = clock();
        let mut carousel = Carousel::new(
            StaticSource::with_len(3),
            clock.clone(),
            RotationConfig::default(),
            MealBucket::Lunch,
        )
        .with_scroll(Box::new(scroll));
        carousel.load().await;
        clock.advance_ms(5_000);
        assert!(carousel.tick().is_some());
        assert_eq!(carousel.current_index(), 1);
        assert_eq!(*calls.lock().unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn bucket_change_resets_and_forces_refresh() {
        let (source, clock, mut carousel) = loaded(3).await;
        clock.advance_ms(5_000);
        carousel.tick();
        assert_eq!(carousel.current_index(), 1);

        carousel.set_meal_bucket(MealBucket::Dinner).await;
        assert_eq!(carousel.bucket(), MealBucket::Dinner);
        assert_eq!(carousel.current_index(), 0);
        assert_eq!(source.forced.load(Ordering::SeqCst), 1);
        let timer = carousel.timer().unwrap();
        assert_eq!(timer.due_ms, clock.now_ms() + 5_000);
    }

    #[tokio::test]
    async fn failure_shows_emergency_pair_and_retry_recovers() {
        let source = StaticSource::with_len(3);
        source.failing.store(true, Ordering::SeqCst);
        let mut carousel = Carousel::new(source.clone(), clock(), RotationConfig::default(), MealBucket::Snacks);

        assert!(matches!(carousel.load().await, CarouselEvent::LoadFailed { .. }));
        let snapshot = carousel.snapshot();
        assert_eq!(snapshot.len, 2);
        assert!(snapshot.error.is_some());
        assert_eq!(snapshot.current_id.as_deref(), Some("emergency_snacks_1"));

        source.failing.store(false, Ordering::SeqCst);
        assert!(matches!(carousel.retry().await, CarouselEvent::Loaded { count: 3, .. }));
        assert!(carousel.snapshot().error.is_none());
        assert_eq!(source.forced.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn clear_and_reload_clears_source_cache() {
        let (source, _, mut carousel) = loaded(3).await;
        carousel.go_to_promo(2);
        carousel.clear_and_reload().await;
        assert_eq!(source.clears.load(Ordering::SeqCst), 1);
        assert_eq!(carousel.current_index(), 0);
        assert_eq!(carousel.timer().unwrap().kind, TimerKind::Advance);
    }

    #[tokio::test]
    async fn teardown_stops_everything() {
        let (_, clock, mut carousel) = loaded(3).await;
        carousel.go_to_promo(2);
        assert!(matches!(carousel.teardown(), Some(CarouselEvent::TornDown { .. })));
        assert!(carousel.teardown().is_none());
        assert!(carousel.timer().is_none());

        clock.advance_ms(60_000);
        assert!(carousel.tick().is_none());
        assert!(carousel.go_to_promo(1).is_none());
        assert!(carousel.begin_interaction().is_none());
        assert_eq!(carousel.current_index(), 2);
    }
}
