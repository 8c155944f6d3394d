mod dish;
mod menu;
mod preferences;

pub use dish::{Dish, DishAttributes, DishType, ValidatedAttributes, EMBEDDING_DIM};
pub use menu::{
    DailyMenu, EateryPick, MealBucket, MealPicks, MenuSlice, RecommendationSet,
    RecommendationSource, UserRecommendation,
};
pub use preferences::{Rating, RatingDirection, UserPreferenceState};
