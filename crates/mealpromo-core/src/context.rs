//! Meal context resolution.
//!
//! Turns an instant into the `{meal bucket, weekend, season, time of day}`
//! tuple that drives candidate selection. Everything here is pure.
//!
//! ## Meal bucket hour ranges
//!
//! ```text
//! breakfast  05..11
//! lunch      11..16
//! snacks     14..18   (14..16 overlaps lunch; lunch is checked first and wins)
//! dinner     everything else
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::PromoError;

/// Primary partition key for promotional content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealBucket {
    Breakfast,
    Lunch,
    Snacks,
    Dinner,
}

impl MealBucket {
    pub const ALL: [MealBucket; 4] = [
        MealBucket::Breakfast,
        MealBucket::Lunch,
        MealBucket::Snacks,
        MealBucket::Dinner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MealBucket::Breakfast => "breakfast",
            MealBucket::Lunch => "lunch",
            MealBucket::Snacks => "snacks",
            MealBucket::Dinner => "dinner",
        }
    }

    /// Bucket for an hour of day (0-23). Check order resolves the lunch/snacks overlap.
    pub fn from_hour(hour: u32) -> Self {
        if (5..11).contains(&hour) {
            MealBucket::Breakfast
        } else if (11..16).contains(&hour) {
            MealBucket::Lunch
        } else if (14..18).contains(&hour) {
            MealBucket::Snacks
        } else {
            MealBucket::Dinner
        }
    }

    pub fn current<Tz: TimeZone>(now: &DateTime<Tz>) -> Self {
        Self::from_hour(now.hour())
    }

    /// The other three buckets, in canonical order.
    pub fn others(self) -> impl Iterator<Item = MealBucket> {
        Self::ALL.into_iter().filter(move |b| *b != self)
    }
}

impl fmt::Display for MealBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealBucket {
    type Err = PromoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "breakfast" => Ok(MealBucket::Breakfast),
            "lunch" => Ok(MealBucket::Lunch),
            "snacks" => Ok(MealBucket::Snacks),
            "dinner" => Ok(MealBucket::Dinner),
            _ => Err(PromoError::UnknownMealBucket(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Season {
    /// Fixed quarters: Mar-May, Jun-Aug, Sep-Nov, Dec-Feb.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Fall,
            _ => Season::Winter,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Season::Spring => "spring",
            Season::Summer => "summer",
            Season::Fall => "fall",
            Season::Winter => "winter",
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11 => TimeOfDay::Morning,
            12..=16 => TimeOfDay::Afternoon,
            17..=20 => TimeOfDay::Evening,
            _ => TimeOfDay::Night,
        }
    }
}

/// Selection context derived from the clock. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealContext {
    pub meal_bucket: MealBucket,
    pub is_weekend: bool,
    pub season: Season,
    pub time_of_day: TimeOfDay,
}

pub fn is_weekend<Tz: TimeZone>(now: &DateTime<Tz>) -> bool {
    matches!(now.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Resolve the context for `now` using real weekend detection.
pub fn resolve_context<Tz: TimeZone>(now: &DateTime<Tz>) -> MealContext {
    resolve_context_with(now, None)
}

/// Resolve the context, optionally forcing the weekend flag.
pub fn resolve_context_with<Tz: TimeZone>(
    now: &DateTime<Tz>,
    weekend_override: Option<bool>,
) -> MealContext {
    let hour = now.hour();
    MealContext {
        meal_bucket: MealBucket::from_hour(hour),
        is_weekend: weekend_override.unwrap_or_else(|| is_weekend(now)),
        season: Season::from_month(now.month()),
        time_of_day: TimeOfDay::from_hour(hour),
    }
}
