//! # MealPromo Core Library
//!
//! This library provides the promotional-content engine behind a meal app's
//! offer carousel. All operations are available through the standalone
//! `mealpromo` CLI, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Selector**: resolves a meal context from the clock, gathers a layered
//!   candidate pool, filters it against an optional user profile, and escalates
//!   through a fallback cascade when too few candidates survive
//! - **Cache**: in-memory plus persisted (SQLite) tiers with a TTL
//! - **Rotation**: a wall-clock-based carousel state machine that requires the
//!   caller to periodically invoke `tick()`
//!
//! ## Key Components
//!
//! - [`PromoManager`]: selector service, constructed per app
//! - [`Carousel`]: rotation state machine
//! - [`Database`]: persisted cache tier
//! - [`Config`]: application configuration management

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod context;
pub mod error;
pub mod events;
pub mod fallback;
pub mod filter;
pub mod promo;
pub mod rotation;
pub mod selector;
pub mod storage;
pub mod theme;

pub use cache::{CacheTier, PromoCache};
pub use catalog::{select_candidate_pool, BucketCatalog, CandidatePool, Catalog, PoolKind};
pub use clock::{Clock, ManualClock, SystemClock};
pub use context::{resolve_context, resolve_context_with, MealBucket, MealContext, Season, TimeOfDay};
pub use error::{ConfigError, PromoError, Result, ScrollError, StoreError};
pub use events::CarouselEvent;
pub use promo::{PromoEntry, PromoId, PromoKind, PromoTheme, UserProfile};
pub use rotation::{
    Carousel, CarouselDriver, CarouselSnapshot, NoopScroll, RotationConfig, RotationPhase,
    ScrollSink,
};
pub use selector::{PromoManager, PromoRequest, PromoSource, SelectionConfig, SelectorStats};
pub use storage::{Config, Database, KvStore, MemoryKvStore};
