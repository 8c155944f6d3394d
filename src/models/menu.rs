use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Meal bucket a menu slice belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealBucket {
    BreakfastBrunch,
    Lunch,
    Dinner,
}

impl MealBucket {
    pub const ALL: [MealBucket; 3] = [
        MealBucket::BreakfastBrunch,
        MealBucket::Lunch,
        MealBucket::Dinner,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MealBucket::BreakfastBrunch => "breakfast_brunch",
            MealBucket::Lunch => "lunch",
            MealBucket::Dinner => "dinner",
        }
    }
}

/// One eatery's offering for one meal bucket, as produced by the scraper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuSlice {
    pub eatery_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub event_descriptions: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub menu_summary: String,
}

/// The full scraped menu for one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMenu {
    pub menu_date: NaiveDate,
    #[serde(default)]
    pub meals: HashMap<MealBucket, Vec<MenuSlice>>,
}

impl DailyMenu {
    pub fn slices(&self, bucket: MealBucket) -> &[MenuSlice] {
        self.meals.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Eatery names offering anything in the given bucket
    pub fn eateries_in(&self, bucket: MealBucket) -> HashSet<&str> {
        self.slices(bucket)
            .iter()
            .map(|ms| ms.eatery_name.as_str())
            .collect()
    }

    /// Total number of menu items across all buckets
    pub fn item_count(&self) -> usize {
        self.meals
            .values()
            .flat_map(|slices| slices.iter())
            .map(|ms| ms.items.len())
            .sum()
    }
}

/// A ranked eatery with its display dishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EateryPick {
    pub eatery: String,
    pub dishes: Vec<String>,
}

/// Ranked picks for one meal bucket
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MealPicks {
    pub picks: Vec<EateryPick>,
}

/// Recommendations for a full day, keyed by meal bucket
pub type RecommendationSet = HashMap<MealBucket, MealPicks>;

/// How a user's recommendations were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    /// Hybrid scoring against the user's preference state
    Personalized,
    /// LLM delegation for users with no derivable preference signal
    ColdStart,
}

/// Final per-user output of a daily run
#[derive(Debug, Clone, Serialize)]
pub struct UserRecommendation {
    pub user_id: Option<Uuid>,
    pub email: String,
    pub source: RecommendationSource,
    pub picks: RecommendationSet,
}
