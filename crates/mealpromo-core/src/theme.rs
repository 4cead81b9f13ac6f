//! Per-bucket color themes attached at selection time.

use crate::context::MealBucket;
use crate::promo::{PromoEntry, PromoTheme};

fn theme(background: &str, primary: &str, accent: &str, gradient: [&str; 2]) -> PromoTheme {
    PromoTheme {
        background_color: background.to_string(),
        primary_color: primary.to_string(),
        accent_color: accent.to_string(),
        gradient_colors: gradient.iter().map(|c| c.to_string()).collect(),
    }
}

pub fn bucket_theme(bucket: MealBucket) -> PromoTheme {
    match bucket {
        MealBucket::Breakfast => theme("#FFF8E1", "#FF9800", "#FFC107", ["#FFB74D", "#FF9800"]),
        MealBucket::Lunch => theme("#E8F5E9", "#4CAF50", "#8BC34A", ["#81C784", "#4CAF50"]),
        MealBucket::Snacks => theme("#FCE4EC", "#E91E63", "#FF4081", ["#F06292", "#E91E63"]),
        MealBucket::Dinner => theme("#EDE7F6", "#673AB7", "#7C4DFF", ["#9575CD", "#673AB7"]),
    }
}

/// Neutral theme for synthetic placeholder entries.
pub fn default_theme() -> PromoTheme {
    theme("#F5F5F5", "#607D8B", "#90A4AE", ["#B0BEC5", "#607D8B"])
}

/// Attach the bucket theme to every entry that has none yet.
pub fn apply_theme(entries: Vec<PromoEntry>, bucket: MealBucket) -> Vec<PromoEntry> {
    let themed = bucket_theme(bucket);
    entries
        .into_iter()
        .map(|entry| match entry.theme {
            Some(_) => entry,
            None => PromoEntry {
                theme: Some(themed.clone()),
                ..entry
            },
        })
        .collect()
}
