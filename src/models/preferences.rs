use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a rating was a like or a dislike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingDirection {
    Liked,
    Disliked,
}

impl RatingDirection {
    /// Signed multiplier used in preference accumulation: +1 or -1
    pub fn signum(&self) -> f32 {
        match self {
            RatingDirection::Liked => 1.0,
            RatingDirection::Disliked => -1.0,
        }
    }

    /// Parses the stored integer form; anything non-positive is a dislike
    pub fn from_i16(value: i16) -> Self {
        if value > 0 {
            RatingDirection::Liked
        } else {
            RatingDirection::Disliked
        }
    }
}

/// One rating event, at most one per (user, dish, day)
///
/// Carries the rated dish's embedding and tags as loaded by the store join,
/// so preference rebuilds need no further catalog round-trips.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rating {
    pub dish_key: String,
    pub direction: RatingDirection,
    /// Degree of preference intensity in (0, 1]; 1.0 for binary thumbs
    pub strength: f32,
    pub occurred_at: DateTime<Utc>,
    pub menu_date: NaiveDate,
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub flavor_profiles: Vec<String>,
    #[serde(default)]
    pub cooking_methods: Vec<String>,
    #[serde(default)]
    pub cuisine_type: Option<String>,
}

/// A user's full preference state
///
/// The staleness flag is set by rating writes and preference edits, and
/// cleared by exactly one writer: the preference vector builder, atomically
/// with the vector write-back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPreferenceState {
    pub user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub initial_ingredients: Vec<String>,
    #[serde(default)]
    pub cuisine_weights: HashMap<String, f64>,
    #[serde(default)]
    pub flavor_weights: HashMap<String, f64>,
    #[serde(default)]
    pub method_weights: HashMap<String, f64>,
    #[serde(default)]
    pub dietary_restrictions: Vec<String>,
    pub preference_vector: Option<Vec<f32>>,
    pub vector_stale: bool,
}

impl UserPreferenceState {
    /// Creates a fresh state, stale until the first rebuild
    pub fn new(user_id: Uuid, email: String) -> Self {
        UserPreferenceState {
            user_id,
            email,
            initial_ingredients: Vec::new(),
            cuisine_weights: HashMap::new(),
            flavor_weights: HashMap::new(),
            method_weights: HashMap::new(),
            dietary_restrictions: Vec::new(),
            preference_vector: None,
            vector_stale: true,
        }
    }

    /// Marks the cached vector as no longer reflecting current inputs
    pub fn mark_stale(&mut self) {
        self.vector_stale = true;
    }

    /// Installs a rebuilt vector and clears the staleness flag
    pub fn set_vector(&mut self, vector: Option<Vec<f32>>) {
        self.preference_vector = vector;
        self.vector_stale = false;
    }

    /// True when any categorical weight map has entries; when none do, the
    /// hybrid scorer degrades to pure cosine similarity
    pub fn has_categorical_weights(&self) -> bool {
        !self.cuisine_weights.is_empty()
            || !self.flavor_weights.is_empty()
            || !self.method_weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> UserPreferenceState {
        UserPreferenceState::new(Uuid::new_v4(), "student@example.edu".to_string())
    }

    #[test]
    fn test_new_state_is_stale() {
        let state = test_state();
        assert!(state.vector_stale);
        assert!(state.preference_vector.is_none());
        assert!(!state.has_categorical_weights());
    }

    #[test]
    fn test_set_vector_clears_stale() {
        let mut state = test_state();
        state.set_vector(Some(vec![0.0; 4]));
        assert!(!state.vector_stale);
        assert!(state.preference_vector.is_some());

        state.mark_stale();
        assert!(state.vector_stale);
    }

    #[test]
    fn test_set_vector_none_still_clears_stale() {
        // A rebuild that finds no signal still counts as a recompute
        let mut state = test_state();
        state.set_vector(None);
        assert!(!state.vector_stale);
        assert!(state.preference_vector.is_none());
    }

    #[test]
    fn test_has_categorical_weights() {
        let mut state = test_state();
        state.flavor_weights.insert("spicy".to_string(), 1.0);
        assert!(state.has_categorical_weights());
    }

    #[test]
    fn test_direction_signum() {
        assert_eq!(RatingDirection::Liked.signum(), 1.0);
        assert_eq!(RatingDirection::Disliked.signum(), -1.0);
        assert_eq!(RatingDirection::from_i16(1), RatingDirection::Liked);
        assert_eq!(RatingDirection::from_i16(-1), RatingDirection::Disliked);
    }
}
