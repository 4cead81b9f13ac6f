//! Integration tests for promo selection.
//!
//! Runs the full pipeline (context, pool, filter, cascade, theme, cache)
//! against the builtin catalog and small hand-written TOML catalogs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mealpromo_core::{
    Catalog, Database, KvStore, ManualClock, MealBucket, MemoryKvStore, PromoEntry,
    PromoManager, PromoRequest, SelectionConfig, StoreError, UserProfile,
};

// 2024-06-05 is a Wednesday, 2024-06-08 a Saturday.
const WEDNESDAY: &str = "2024-06-05T08:30:00+00:00";
const SATURDAY: &str = "2024-06-08T13:00:00+00:00";
const WEDNESDAY_NOON: &str = "2024-06-05T12:00:00+00:00";

fn clock(at: &str) -> Arc<ManualClock> {
    Arc::new(ManualClock::at(at).unwrap())
}

fn manager_with(catalog: Catalog, clock: Arc<ManualClock>) -> PromoManager {
    PromoManager::new(
        catalog,
        Arc::new(MemoryKvStore::new()),
        clock,
        SelectionConfig::default(),
    )
}

fn ids(entries: &[PromoEntry]) -> Vec<String> {
    entries.iter().map(|e| e.id.to_string()).collect()
}

const SPARSE_DINNER: &str = r#"
[[buckets.dinner.weekday]]
id = "dinner_shellfish_platter"
title = "Shellfish Platter"
subtitle = "Prawns and crab"
buttonText = "Order"
imageRef = "platter.png"
priority = 1
tags = ["shellfish"]

[[buckets.dinner.weekday]]
id = "dinner_plain_rice"
title = "Plain Rice Bowl"
subtitle = "Simple and filling"
buttonText = "Order"
imageRef = "rice.png"
priority = 2
tags = ["vegan"]
"#;

#[tokio::test]
async fn test_weekday_breakfast_without_profile() {
    let manager = manager_with(Catalog::builtin(), clock(WEDNESDAY));
    let promos = manager
        .get_promos(MealBucket::Breakfast, None, PromoRequest::default())
        .await
        .unwrap();

    assert_eq!(
        ids(&promos[..3]),
        vec!["breakfast_energy_boost", "breakfast_healthy_choice", "breakfast_quick_bite"]
    );
    let priorities: Vec<i32> = promos[..3].iter().map(|p| p.priority).collect();
    assert_eq!(priorities, vec![1, 2, 3]);
    assert!(promos.windows(2).all(|w| w[0].priority <= w[1].priority));
    assert!(promos.len() <= 5);
}

#[tokio::test]
async fn test_budget_profile_excludes_expensive_lunch() {
    let manager = manager_with(Catalog::builtin(), clock(WEDNESDAY));
    let profile = UserProfile {
        budget_range: Some((0.0, 300.0)),
        ..Default::default()
    };
    let promos = manager
        .get_promos(MealBucket::Lunch, Some(&profile), PromoRequest::default())
        .await
        .unwrap();

    let ids = ids(&promos);
    assert!(!ids.contains(&"lunch_family_feast".to_string()));
    assert!(ids.contains(&"lunch_light_fresh".to_string()));
    assert!(promos.iter().all(|p| p.min_order_value <= 300.0));
}

#[tokio::test]
async fn test_single_survivor_is_padded_with_placeholder() {
    let catalog = Catalog::from_toml_str(SPARSE_DINNER).unwrap();
    let manager = manager_with(catalog, clock(WEDNESDAY));
    let profile = UserProfile {
        allergies: ["shellfish".to_string()].into_iter().collect(),
        ..Default::default()
    };
    let promos = manager
        .get_promos(MealBucket::Dinner, Some(&profile), PromoRequest::default())
        .await
        .unwrap();

    assert_eq!(ids(&promos), vec!["dinner_plain_rice", "emergency_dinner_1"]);
    assert!(promos.iter().all(|p| p.theme.is_some()));
}

#[tokio::test]
async fn test_nothing_survives_yields_one_placeholder() {
    let catalog = Catalog::from_toml_str(&SPARSE_DINNER.replace("\"vegan\"", "\"shellfish\"")).unwrap();
    let manager = manager_with(catalog, clock(WEDNESDAY));
    let profile = UserProfile {
        allergies: ["shellfish".to_string()].into_iter().collect(),
        ..Default::default()
    };
    let promos = manager
        .get_promos(MealBucket::Dinner, Some(&profile), PromoRequest::default())
        .await
        .unwrap();
    assert_eq!(ids(&promos), vec!["emergency_dinner_1"]);
}

#[tokio::test]
async fn test_cross_bucket_adaptation_fills_empty_bucket() {
    let catalog = Catalog::from_toml_str(
        r#"
        [buckets.dinner]
        weekday = []

        [[buckets.lunch.weekday]]
        id = "lunch_wrap"
        title = "Wrap"
        subtitle = "Rolled fresh"
        buttonText = "Order"
        imageRef = "wrap.png"
        priority = 1

        [[buckets.lunch.weekday]]
        id = "lunch_salad"
        title = "Salad"
        subtitle = "Crunchy greens"
        buttonText = "Order"
        imageRef = "salad.png"
        priority = 2
        badge = "FRESH"
        "#,
    )
    .unwrap();
    let manager = manager_with(catalog, clock(WEDNESDAY));
    let promos = manager
        .get_promos(MealBucket::Dinner, None, PromoRequest::default())
        .await
        .unwrap();

    assert_eq!(ids(&promos), vec!["lunch_wrap_adapted_dinner", "lunch_salad_adapted_dinner"]);
    assert_eq!(promos[0].badge.as_deref(), Some("DINNER PICK"));
    assert_eq!(promos[1].badge.as_deref(), Some("FRESH (DINNER)"));
    assert!(promos[1].subtitle.contains("Crunchy greens"));
    assert_eq!(manager.get_promo_by_id("lunch_salad").unwrap().badge.as_deref(), Some("FRESH"));
}

#[tokio::test]
async fn test_weekend_uses_weekend_lists() {
    let manager = manager_with(Catalog::builtin(), clock(SATURDAY));
    assert!(manager.context().is_weekend);
    let promos = manager
        .get_promos(MealBucket::Lunch, None, PromoRequest::default())
        .await
        .unwrap();
    assert_eq!(ids(&promos[..2]), vec!["lunch_weekend_thali", "lunch_biryani_bonanza"]);
}

#[tokio::test]
async fn test_cache_hit_returns_same_list_without_regathering() {
    let manager = manager_with(Catalog::builtin(), clock(WEDNESDAY));
    let first = manager
        .get_promos(MealBucket::Dinner, None, PromoRequest::default())
        .await
        .unwrap();
    let second = manager
        .get_promos(MealBucket::Dinner, None, PromoRequest::default())
        .await
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    let stats = manager.stats();
    assert_eq!(stats.gathers, 1);
    assert_eq!(stats.memory_hits, 1);
}

#[tokio::test]
async fn test_ttl_expiry_regathers() {
    let clock = clock(WEDNESDAY);
    let manager = manager_with(Catalog::builtin(), clock.clone());
    manager
        .get_promos(MealBucket::Snacks, None, PromoRequest::default())
        .await
        .unwrap();

    clock.advance(chrono::Duration::hours(23));
    manager
        .get_promos(MealBucket::Snacks, None, PromoRequest::default())
        .await
        .unwrap();
    assert_eq!(manager.stats().gathers, 1);

    clock.advance(chrono::Duration::hours(2));
    manager
        .get_promos(MealBucket::Snacks, None, PromoRequest::default())
        .await
        .unwrap();
    assert_eq!(manager.stats().gathers, 2);
}

#[tokio::test]
async fn test_persisted_tier_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mealpromo.db");
    let clock = clock(WEDNESDAY);

    let first = {
        let manager = PromoManager::new(
            Catalog::builtin(),
            Arc::new(Database::open_at(&path).unwrap()),
            clock.clone(),
            SelectionConfig::default(),
        );
        manager
            .get_promos(MealBucket::Lunch, None, PromoRequest::default())
            .await
            .unwrap()
    };

    let restarted = PromoManager::new(
        Catalog::builtin(),
        Arc::new(Database::open_at(&path).unwrap()),
        clock,
        SelectionConfig::default(),
    );
    let second = restarted
        .get_promos(MealBucket::Lunch, None, PromoRequest::default())
        .await
        .unwrap();

    assert_eq!(ids(&first), ids(&second));
    assert_eq!(restarted.stats().gathers, 0);
    assert_eq!(restarted.stats().persisted_hits, 1);
}

#[tokio::test]
async fn test_clear_cache_forces_regather() {
    let manager = manager_with(Catalog::builtin(), clock(WEDNESDAY));
    manager
        .get_promos(MealBucket::Lunch, None, PromoRequest::default())
        .await
        .unwrap();
    manager.clear_cache().await;
    manager
        .get_promos(MealBucket::Lunch, None, PromoRequest::default())
        .await
        .unwrap();
    assert_eq!(manager.stats().gathers, 2);
}

#[tokio::test]
async fn test_broken_store_degrades_to_recompute() {
    let store = Arc::new(MemoryKvStore::new());
    store.set_failing(true);
    let manager = PromoManager::new(
        Catalog::builtin(),
        store,
        clock(WEDNESDAY),
        SelectionConfig::default(),
    );
    let promos = manager
        .get_promos(MealBucket::Breakfast, None, PromoRequest::default())
        .await
        .unwrap();
    assert!(!promos.is_empty());
}

/// Store whose reads and writes yield to the scheduler, so concurrent
/// callers genuinely interleave.
struct SlowStore {
    inner: MemoryKvStore,
}

#[async_trait]
impl KvStore for SlowStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key).await
    }
}

fn slow_store() -> Arc<SlowStore> {
    Arc::new(SlowStore {
        inner: MemoryKvStore::new(),
    })
}

fn slow_manager_on(store: Arc<SlowStore>) -> PromoManager {
    PromoManager::new(Catalog::builtin(), store, clock(WEDNESDAY), SelectionConfig::default())
}

fn slow_manager() -> PromoManager {
    slow_manager_on(slow_store())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_requests_gather_once() {
    let manager = slow_manager();
    let (a, b) = tokio::join!(
        manager.get_promos(MealBucket::Lunch, None, PromoRequest::default()),
        manager.get_promos(MealBucket::Lunch, None, PromoRequest::default()),
    );
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(manager.stats().gathers, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_forced_refreshes_share_one_gather() {
    let manager = slow_manager();
    let (a, b) = tokio::join!(
        manager.get_promos(MealBucket::Dinner, None, PromoRequest::refresh()),
        manager.get_promos(MealBucket::Dinner, None, PromoRequest::refresh()),
    );
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(manager.stats().gathers, 1);
}

#[tokio::test(start_paused = true)]
async fn test_clear_waits_for_inflight_write() {
    let store = slow_store();
    let manager = slow_manager_on(store.clone());
    let (first, ()) = tokio::join!(
        manager.get_promos(MealBucket::Lunch, None, PromoRequest::default()),
        async {
            tokio::time::sleep(Duration::from_millis(15)).await;
            manager.clear_cache().await;
        },
    );
    first.unwrap();

    // The selection's persisted write landed before the clear, not after it.
    assert!(store.inner.is_empty());
    manager
        .get_promos(MealBucket::Lunch, None, PromoRequest::default())
        .await
        .unwrap();
    assert_eq!(manager.stats().gathers, 2);
}

#[tokio::test(start_paused = true)]
async fn test_weekend_override_waits_for_inflight_selection() {
    let manager = slow_manager();
    let (first, ()) = tokio::join!(
        manager.get_promos(MealBucket::Breakfast, None, PromoRequest::default()),
        async {
            tokio::time::sleep(Duration::from_millis(15)).await;
            manager.force_weekend_mode(true).await;
        },
    );
    assert_eq!(first.unwrap()[0].id.to_string(), "breakfast_energy_boost");

    let promos = manager
        .get_promos(MealBucket::Breakfast, None, PromoRequest::default())
        .await
        .unwrap();
    assert!(ids(&promos).contains(&"breakfast_weekend_brunch".to_string()));
}

#[tokio::test]
async fn test_weekend_override_never_reaches_persisted_tier() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mealpromo.db");
    let clock = clock(WEDNESDAY);

    {
        let manager = PromoManager::new(
            Catalog::builtin(),
            Arc::new(Database::open_at(&path).unwrap()),
            clock.clone(),
            SelectionConfig::default(),
        );
        manager.force_weekend_mode(true).await;
        let weekend = manager
            .get_promos(MealBucket::Breakfast, None, PromoRequest::default())
            .await
            .unwrap();
        assert!(ids(&weekend).contains(&"breakfast_weekend_brunch".to_string()));
    }

    let restarted = PromoManager::new(
        Catalog::builtin(),
        Arc::new(Database::open_at(&path).unwrap()),
        clock,
        SelectionConfig::default(),
    );
    assert!(!restarted.context().is_weekend);
    let promos = restarted
        .get_promos(MealBucket::Breakfast, None, PromoRequest::default())
        .await
        .unwrap();
    assert_eq!(promos[0].id.to_string(), "breakfast_energy_boost");
    assert!(!ids(&promos).contains(&"breakfast_weekend_brunch".to_string()));
    assert_eq!(restarted.stats().persisted_hits, 0);
}

#[tokio::test]
async fn test_weekend_override_keeps_persisted_weekday_list() {
    let store = Arc::new(MemoryKvStore::new());
    let manager = PromoManager::new(
        Catalog::builtin(),
        store.clone(),
        clock(WEDNESDAY),
        SelectionConfig::default(),
    );
    let weekday = manager
        .get_promos(MealBucket::Breakfast, None, PromoRequest::default())
        .await
        .unwrap();
    manager.force_weekend_mode(true).await;
    manager
        .get_promos(MealBucket::Breakfast, None, PromoRequest::default())
        .await
        .unwrap();
    manager.force_weekend_mode(false).await;

    let other = PromoManager::new(Catalog::builtin(), store, clock(WEDNESDAY), SelectionConfig::default());
    let restored = other
        .get_promos(MealBucket::Breakfast, None, PromoRequest::default())
        .await
        .unwrap();
    assert_eq!(ids(&restored), ids(&weekday));
    assert_eq!(other.stats().persisted_hits, 1);
}

#[tokio::test]
async fn test_cached_list_is_dropped_once_an_entry_lapses() {
    let catalog = Catalog::from_toml_str(
        r#"
        [[buckets.lunch.weekday]]
        id = "lunch_flash"
        title = "Flash Deal"
        subtitle = "One hour only"
        buttonText = "Grab it"
        imageRef = "flash.png"
        priority = 1
        validUntil = "2024-06-05T13:00:00Z"

        [[buckets.lunch.weekday]]
        id = "lunch_plain"
        title = "Plain Thali"
        subtitle = "Every day"
        buttonText = "Order"
        imageRef = "thali.png"
        priority = 2
        "#,
    )
    .unwrap();
    let clock = clock(WEDNESDAY_NOON);
    let manager = manager_with(catalog, clock.clone());

    let first = manager
        .get_promos(MealBucket::Lunch, None, PromoRequest::default())
        .await
        .unwrap();
    assert_eq!(ids(&first), vec!["lunch_flash", "lunch_plain"]);

    clock.advance(chrono::Duration::hours(2));
    let second = manager
        .get_promos(MealBucket::Lunch, None, PromoRequest::default())
        .await
        .unwrap();
    assert!(!ids(&second).contains(&"lunch_flash".to_string()));
    assert_eq!(second[0].id.to_string(), "lunch_plain");
    assert_eq!(manager.stats().gathers, 2);
}

#[test]
fn test_context_follows_clock() {
    let clock = clock(WEDNESDAY);
    let manager = manager_with(Catalog::builtin(), clock.clone());
    assert_eq!(manager.context().meal_bucket, MealBucket::Breakfast);
    clock.advance(chrono::Duration::hours(11));
    assert_eq!(manager.context().meal_bucket, MealBucket::Dinner);
}
