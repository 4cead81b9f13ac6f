//! Sample catalog content.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::{BucketCatalog, Catalog};
use crate::context::{MealBucket, Season};
use crate::promo::{PromoEntry, PromoId};

struct Seed {
    id: &'static str,
    title: &'static str,
    subtitle: &'static str,
    button: &'static str,
    image: &'static str,
    discount: f64,
    category: &'static str,
    tags: &'static [&'static str],
    audience: &'static [&'static str],
    priority: i32,
    min_order: f64,
    badge: Option<&'static str>,
    special: &'static str,
    rating: f32,
    orders: &'static str,
    valid_until: Option<&'static str>,
}

impl Seed {
    fn build(&self) -> PromoEntry {
        PromoEntry {
            id: PromoId::real(self.id),
            title: self.title.to_string(),
            subtitle: self.subtitle.to_string(),
            button_text: self.button.to_string(),
            image_ref: self.image.to_string(),
            discount_percent: self.discount,
            category: self.category.to_string(),
            tags: self.tags.iter().map(|t| t.to_string()).collect(),
            target_audience: self.audience.iter().map(|a| a.to_string()).collect(),
            priority: self.priority,
            valid_until: self.valid_until.and_then(|raw| match raw.parse::<DateTime<Utc>>() {
                Ok(until) => Some(until),
                Err(e) => {
                    warn!(id = self.id, raw, error = %e, "seed expiry does not parse");
                    None
                }
            }),
            min_order_value: self.min_order,
            badge: self.badge.map(str::to_string),
            special_offer: self.special.to_string(),
            rating: self.rating,
            order_count_label: self.orders.to_string(),
            theme: None,
        }
    }
}

fn build(seeds: &[Seed]) -> Vec<PromoEntry> {
    seeds.iter().map(Seed::build).collect()
}

const BREAKFAST_WEEKDAY: &[Seed] = &[
    Seed {
        id: "breakfast_energy_boost",
        title: "Energy Boost Bowl",
        subtitle: "Oats, berries and nuts to power your morning",
        button: "Order Now",
        image: "promos/breakfast_energy_boost.png",
        discount: 20.0,
        category: "healthy",
        tags: &["healthy", "vegetarian", "nuts", "gluten"],
        audience: &["all"],
        priority: 1,
        min_order: 149.0,
        badge: Some("BESTSELLER"),
        special: "Free cold brew",
        rating: 4.6,
        orders: "2.1k+ orders",
        valid_until: None,
    },
    Seed {
        id: "breakfast_healthy_choice",
        title: "Healthy Choice Smoothie",
        subtitle: "Plant-based smoothies under 250 kcal",
        button: "Grab One",
        image: "promos/breakfast_healthy_choice.png",
        discount: 15.0,
        category: "beverages",
        tags: &["healthy", "vegan"],
        audience: &["fitness", "all"],
        priority: 2,
        min_order: 99.0,
        badge: Some("VEGAN"),
        special: "Add chia for free",
        rating: 4.4,
        orders: "1.3k+ orders",
        valid_until: None,
    },
    Seed {
        id: "breakfast_quick_bite",
        title: "Quick Bite Combo",
        subtitle: "Sandwich and coffee in 10 minutes",
        button: "Order Now",
        image: "promos/breakfast_quick_bite.png",
        discount: 25.0,
        category: "quick",
        tags: &["quick", "dairy", "gluten", "vegetarian"],
        audience: &["professionals", "students"],
        priority: 3,
        min_order: 129.0,
        badge: None,
        special: "10 min delivery",
        rating: 4.2,
        orders: "3k+ orders",
        valid_until: None,
    },
];

const BREAKFAST_WEEKEND: &[Seed] = &[
    Seed {
        id: "breakfast_weekend_brunch",
        title: "Weekend Brunch",
        subtitle: "Eggs, toast and fresh juice, slow and easy",
        button: "Book Brunch",
        image: "promos/breakfast_weekend_brunch.png",
        discount: 30.0,
        category: "brunch",
        tags: &["eggs", "gluten", "non-vegetarian"],
        audience: &["all"],
        priority: 1,
        min_order: 299.0,
        badge: Some("WEEKEND"),
        special: "Bottomless juice",
        rating: 4.7,
        orders: "900+ orders",
        valid_until: None,
    },
    Seed {
        id: "breakfast_pancake_party",
        title: "Pancake Party",
        subtitle: "Stacks with maple and berries",
        button: "Order Now",
        image: "promos/breakfast_pancake_party.png",
        discount: 20.0,
        category: "sweet",
        tags: &["dairy", "gluten", "vegetarian"],
        audience: &["family", "kids"],
        priority: 2,
        min_order: 249.0,
        badge: None,
        special: "Kids eat free",
        rating: 4.5,
        orders: "1.1k+ orders",
        valid_until: None,
    },
    Seed {
        id: "breakfast_family_platter",
        title: "Family Breakfast Platter",
        subtitle: "Feeds four, ready by 9",
        button: "Order Platter",
        image: "promos/breakfast_family_platter.png",
        discount: 18.0,
        category: "family",
        tags: &["dairy", "gluten", "vegetarian"],
        audience: &["family"],
        priority: 3,
        min_order: 499.0,
        badge: Some("FAMILY"),
        special: "",
        rating: 4.3,
        orders: "600+ orders",
        valid_until: None,
    },
];

const LUNCH_WEEKDAY: &[Seed] = &[
    Seed {
        id: "lunch_power_bowl",
        title: "Power Protein Bowl",
        subtitle: "Grilled chicken, quinoa and greens",
        button: "Order Now",
        image: "promos/lunch_power_bowl.png",
        discount: 20.0,
        category: "healthy",
        tags: &["high-protein", "meat", "non-vegetarian"],
        audience: &["fitness", "professionals"],
        priority: 1,
        min_order: 249.0,
        badge: Some("HIGH PROTEIN"),
        special: "Extra chicken free",
        rating: 4.5,
        orders: "2.4k+ orders",
        valid_until: None,
    },
    Seed {
        id: "lunch_light_fresh",
        title: "Light & Fresh Salads",
        subtitle: "Crisp salads that keep the afternoon slump away",
        button: "Order Now",
        image: "promos/lunch_light_fresh.png",
        discount: 15.0,
        category: "salads",
        tags: &["healthy", "vegetarian"],
        audience: &["all"],
        priority: 2,
        min_order: 299.0,
        badge: None,
        special: "Free dressing upgrade",
        rating: 4.3,
        orders: "1.8k+ orders",
        valid_until: None,
    },
    Seed {
        id: "lunch_family_feast",
        title: "Family Feast",
        subtitle: "Curries, breads and rice for the whole table",
        button: "Order Feast",
        image: "promos/lunch_family_feast.png",
        discount: 25.0,
        category: "family",
        tags: &["dairy", "gluten", "vegetarian"],
        audience: &["family", "all"],
        priority: 3,
        min_order: 799.0,
        badge: Some("SHARE"),
        special: "Free dessert",
        rating: 4.6,
        orders: "950+ orders",
        valid_until: None,
    },
    Seed {
        id: "lunch_office_combo",
        title: "Office Combo",
        subtitle: "Desk-friendly meals delivered by 1 PM",
        button: "Order Now",
        image: "promos/lunch_office_combo.png",
        discount: 10.0,
        category: "combo",
        tags: &["quick", "gluten"],
        audience: &["professionals"],
        priority: 4,
        min_order: 199.0,
        badge: None,
        special: "",
        rating: 4.1,
        orders: "4k+ orders",
        valid_until: None,
    },
];

const LUNCH_WEEKEND: &[Seed] = &[
    Seed {
        id: "lunch_weekend_thali",
        title: "Weekend Thali",
        subtitle: "A slow Sunday spread with twelve bowls",
        button: "Order Thali",
        image: "promos/lunch_weekend_thali.png",
        discount: 20.0,
        category: "traditional",
        tags: &["dairy", "vegetarian"],
        audience: &["all"],
        priority: 1,
        min_order: 499.0,
        badge: Some("WEEKEND"),
        special: "Unlimited refills",
        rating: 4.7,
        orders: "1.2k+ orders",
        valid_until: None,
    },
    Seed {
        id: "lunch_biryani_bonanza",
        title: "Biryani Bonanza",
        subtitle: "Dum biryani with raita and salan",
        button: "Order Now",
        image: "promos/lunch_biryani_bonanza.png",
        discount: 30.0,
        category: "rice",
        tags: &["meat", "non-vegetarian", "dairy", "spicy"],
        audience: &["all"],
        priority: 2,
        min_order: 649.0,
        badge: Some("HOT"),
        special: "",
        rating: 4.8,
        orders: "5k+ orders",
        valid_until: None,
    },
];

const SNACKS_WEEKDAY: &[Seed] = &[
    Seed {
        id: "snacks_festive_special",
        title: "Festive Sweets Box",
        subtitle: "Limited festive assortment",
        button: "Order Now",
        image: "promos/snacks_festive_special.png",
        discount: 35.0,
        category: "sweets",
        tags: &["dairy", "nuts"],
        audience: &["all"],
        priority: 0,
        min_order: 199.0,
        badge: Some("LIMITED"),
        special: "",
        rating: 4.9,
        orders: "8k+ orders",
        valid_until: Some("2023-11-15T23:59:59Z"),
    },
    Seed {
        id: "snacks_chai_time",
        title: "Chai Time",
        subtitle: "Masala chai with a crunchy side",
        button: "Order Now",
        image: "promos/snacks_chai_time.png",
        discount: 20.0,
        category: "beverages",
        tags: &["dairy", "vegetarian"],
        audience: &["all"],
        priority: 1,
        min_order: 99.0,
        badge: Some("4 PM"),
        special: "Second cup half price",
        rating: 4.6,
        orders: "6k+ orders",
        valid_until: None,
    },
    Seed {
        id: "snacks_protein_bites",
        title: "Protein Bites",
        subtitle: "Roasted makhana and energy balls",
        button: "Snack Smart",
        image: "promos/snacks_protein_bites.png",
        discount: 15.0,
        category: "healthy",
        tags: &["healthy", "vegan", "nuts"],
        audience: &["fitness"],
        priority: 2,
        min_order: 149.0,
        badge: None,
        special: "",
        rating: 4.3,
        orders: "700+ orders",
        valid_until: None,
    },
    Seed {
        id: "snacks_street_food",
        title: "Street Food Fiesta",
        subtitle: "Chaat, rolls and momos",
        button: "Order Now",
        image: "promos/snacks_street_food.png",
        discount: 25.0,
        category: "street",
        tags: &["spicy", "gluten", "vegetarian"],
        audience: &["students", "all"],
        priority: 3,
        min_order: 179.0,
        badge: Some("TRENDING"),
        special: "",
        rating: 4.4,
        orders: "3.2k+ orders",
        valid_until: None,
    },
];

const SNACKS_WEEKEND: &[Seed] = &[
    Seed {
        id: "snacks_movie_munchies",
        title: "Movie Munchies",
        subtitle: "Popcorn, nachos and dips for movie night",
        button: "Order Now",
        image: "promos/snacks_movie_munchies.png",
        discount: 20.0,
        category: "party",
        tags: &["dairy", "vegetarian"],
        audience: &["all"],
        priority: 1,
        min_order: 249.0,
        badge: Some("WEEKEND"),
        special: "Free soda",
        rating: 4.4,
        orders: "1.5k+ orders",
        valid_until: None,
    },
    Seed {
        id: "snacks_dessert_delight",
        title: "Dessert Delight",
        subtitle: "Brownies, cheesecake and gelato",
        button: "Treat Yourself",
        image: "promos/snacks_dessert_delight.png",
        discount: 15.0,
        category: "desserts",
        tags: &["dairy", "gluten", "vegetarian"],
        audience: &[],
        priority: 2,
        min_order: 199.0,
        badge: None,
        special: "",
        rating: 4.7,
        orders: "2k+ orders",
        valid_until: None,
    },
];

const DINNER_WEEKDAY: &[Seed] = &[
    Seed {
        id: "dinner_comfort_classics",
        title: "Comfort Classics",
        subtitle: "Butter chicken, dal and naan",
        button: "Order Dinner",
        image: "promos/dinner_comfort_classics.png",
        discount: 20.0,
        category: "comfort",
        tags: &["meat", "non-vegetarian", "dairy", "gluten"],
        audience: &["all"],
        priority: 1,
        min_order: 399.0,
        badge: Some("FAVOURITE"),
        special: "Free naan basket",
        rating: 4.7,
        orders: "7k+ orders",
        valid_until: None,
    },
    Seed {
        id: "dinner_light_supper",
        title: "Light Supper",
        subtitle: "Soups and stir-fries under 400 kcal",
        button: "Order Now",
        image: "promos/dinner_light_supper.png",
        discount: 15.0,
        category: "healthy",
        tags: &["healthy", "vegan"],
        audience: &["fitness", "all"],
        priority: 2,
        min_order: 249.0,
        badge: None,
        special: "",
        rating: 4.2,
        orders: "1k+ orders",
        valid_until: None,
    },
    Seed {
        id: "dinner_grill_night",
        title: "Grill Night",
        subtitle: "Kebabs and tikkas straight off the grill",
        button: "Order Now",
        image: "promos/dinner_grill_night.png",
        discount: 25.0,
        category: "grill",
        tags: &["meat", "non-vegetarian", "spicy"],
        audience: &["all"],
        priority: 3,
        min_order: 599.0,
        badge: Some("SIZZLING"),
        special: "",
        rating: 4.5,
        orders: "2.6k+ orders",
        valid_until: None,
    },
];

const DINNER_WEEKEND: &[Seed] = &[
    Seed {
        id: "dinner_date_night",
        title: "Date Night Dinner",
        subtitle: "Three courses for two with candlelight vibes",
        button: "Plan Date Night",
        image: "promos/dinner_date_night.png",
        discount: 20.0,
        category: "premium",
        tags: &["dairy", "gluten"],
        audience: &["couples"],
        priority: 1,
        min_order: 999.0,
        badge: Some("FOR TWO"),
        special: "Complimentary dessert",
        rating: 4.8,
        orders: "500+ orders",
        valid_until: None,
    },
    Seed {
        id: "dinner_party_pack",
        title: "Party Pack",
        subtitle: "Pizzas, wings and sides for the crew",
        button: "Order Party Pack",
        image: "promos/dinner_party_pack.png",
        discount: 30.0,
        category: "party",
        tags: &["meat", "non-vegetarian", "dairy", "gluten"],
        audience: &["family", "students", "all"],
        priority: 2,
        min_order: 1299.0,
        badge: Some("PARTY"),
        special: "Free 1.25L drink",
        rating: 4.5,
        orders: "1.9k+ orders",
        valid_until: None,
    },
];

const SPRING: &[Seed] = &[Seed {
    id: "seasonal_spring_greens",
    title: "Spring Greens",
    subtitle: "Asparagus, peas and herbs while they last",
    button: "Taste Spring",
    image: "promos/seasonal_spring_greens.png",
    discount: 10.0,
    category: "seasonal",
    tags: &["healthy", "vegan", "seasonal"],
    audience: &["all"],
    priority: 4,
    min_order: 199.0,
    badge: Some("SEASONAL"),
    special: "",
    rating: 4.3,
    orders: "400+ orders",
    valid_until: None,
}];

const SUMMER: &[Seed] = &[
    Seed {
        id: "seasonal_summer_coolers",
        title: "Summer Coolers",
        subtitle: "Iced teas, lemonades and coolers",
        button: "Cool Down",
        image: "promos/seasonal_summer_coolers.png",
        discount: 15.0,
        category: "beverages",
        tags: &["beverage", "vegan", "seasonal"],
        audience: &["all"],
        priority: 4,
        min_order: 99.0,
        badge: Some("SEASONAL"),
        special: "",
        rating: 4.4,
        orders: "2k+ orders",
        valid_until: None,
    },
    Seed {
        id: "seasonal_mango_mania",
        title: "Mango Mania",
        subtitle: "Alphonso shakes, lassi and kulfi",
        button: "Get Mangoes",
        image: "promos/seasonal_mango_mania.png",
        discount: 20.0,
        category: "desserts",
        tags: &["dairy", "vegetarian", "seasonal"],
        audience: &["all"],
        priority: 5,
        min_order: 149.0,
        badge: None,
        special: "",
        rating: 4.8,
        orders: "3.4k+ orders",
        valid_until: None,
    },
];

const FALL: &[Seed] = &[Seed {
    id: "seasonal_harvest_soups",
    title: "Harvest Soups",
    subtitle: "Pumpkin, lentil and roasted tomato",
    button: "Warm Up",
    image: "promos/seasonal_harvest_soups.png",
    discount: 15.0,
    category: "seasonal",
    tags: &["vegan", "healthy", "seasonal"],
    audience: &["all"],
    priority: 4,
    min_order: 149.0,
    badge: Some("SEASONAL"),
    special: "",
    rating: 4.4,
    orders: "800+ orders",
    valid_until: None,
}];

const WINTER: &[Seed] = &[Seed {
    id: "seasonal_winter_warmers",
    title: "Winter Warmers",
    subtitle: "Hot chocolate, gajar halwa and soups",
    button: "Get Cozy",
    image: "promos/seasonal_winter_warmers.png",
    discount: 15.0,
    category: "seasonal",
    tags: &["dairy", "vegetarian", "seasonal"],
    audience: &["all"],
    priority: 4,
    min_order: 149.0,
    badge: Some("SEASONAL"),
    special: "",
    rating: 4.6,
    orders: "1.7k+ orders",
    valid_until: None,
}];

pub(super) fn catalog() -> Catalog {
    let lists = |weekday: &[Seed], weekend: &[Seed]| BucketCatalog {
        weekday: build(weekday),
        weekend: build(weekend),
    };
    Catalog::new()
        .with_bucket(MealBucket::Breakfast, lists(BREAKFAST_WEEKDAY, BREAKFAST_WEEKEND))
        .with_bucket(MealBucket::Lunch, lists(LUNCH_WEEKDAY, LUNCH_WEEKEND))
        .with_bucket(MealBucket::Snacks, lists(SNACKS_WEEKDAY, SNACKS_WEEKEND))
        .with_bucket(MealBucket::Dinner, lists(DINNER_WEEKDAY, DINNER_WEEKEND))
        .with_seasonal(Season::Spring, build(SPRING))
        .with_seasonal(Season::Summer, build(SUMMER))
        .with_seasonal(Season::Fall, build(FALL))
        .with_seasonal(Season::Winter, build(WINTER))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_bucket_has_both_lists() {
        let catalog = catalog();
        for bucket in MealBucket::ALL {
            let lists = catalog.bucket(bucket).unwrap();
            assert!(!lists.weekday.is_empty(), "{bucket} weekday empty");
            assert!(!lists.weekend.is_empty(), "{bucket} weekend empty");
        }
    }

    #[test]
    fn ids_unique_within_each_list() {
        let catalog = catalog();
        for bucket in MealBucket::ALL {
            let lists = catalog.bucket(bucket).unwrap();
            for list in [&lists.weekday, &lists.weekend] {
                let ids: HashSet<_> = list.iter().map(|e| e.id.clone()).collect();
                assert_eq!(ids.len(), list.len());
            }
        }
    }

    #[test]
    fn every_seed_expiry_parses() {
        let all = [
            BREAKFAST_WEEKDAY,
            BREAKFAST_WEEKEND,
            LUNCH_WEEKDAY,
            LUNCH_WEEKEND,
            SNACKS_WEEKDAY,
            SNACKS_WEEKEND,
            DINNER_WEEKDAY,
            DINNER_WEEKEND,
            SPRING,
            SUMMER,
            FALL,
            WINTER,
        ];
        for seed in all.iter().flat_map(|seeds| seeds.iter()) {
            if let Some(raw) = seed.valid_until {
                assert!(
                    raw.parse::<DateTime<Utc>>().is_ok(),
                    "{}: unparseable valid_until {raw:?}",
                    seed.id
                );
            }
        }
    }

    #[test]
    fn expired_sample_parses_its_date() {
        let catalog = catalog();
        let festive = catalog.find("snacks_festive_special").unwrap();
        assert!(festive.valid_until.is_some());
    }
}
