/// Preference vector construction from onboarding signal and rating history
///
/// The cached vector summarizes a user's likes and dislikes in embedding
/// space:
///
/// ```text
/// pref = Σ over ratings_i of (direction_i × strength_i × decay^i × embedding_i)
///      + base_vector(initial_ingredients)
/// ```
///
/// with `i` the zero-based rank in recency order (most recent first). Taste
/// drifts: a like six months ago should influence today's picks less than
/// yesterday's, hence the exponential recency decay.
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    db::PreferenceStore,
    error::AppResult,
    models::{Dish, Rating, UserPreferenceState},
};

pub const DECAY_FACTOR: f64 = 0.95;

/// Step size for attribute-weight nudges inferred from ratings
const ATTRIBUTE_LEARN_RATE: f64 = 0.1;

fn accumulate(acc: &mut Option<Vec<f32>>, weight: f64, embedding: &[f32]) {
    let acc = acc.get_or_insert_with(|| vec![0.0; embedding.len()]);
    if acc.len() != embedding.len() {
        tracing::warn!(
            expected = acc.len(),
            got = embedding.len(),
            "Skipping embedding with mismatched dimension"
        );
        return;
    }
    for (slot, value) in acc.iter_mut().zip(embedding.iter()) {
        *slot += (weight * f64::from(*value)) as f32;
    }
}

/// Mean embedding of catalog dishes sharing at least one token with the
/// user's initial ingredient choices; `None` when nothing matches
fn base_vector(
    initial_ingredients: &[String],
    catalog: &HashMap<String, Dish>,
) -> Option<Vec<f32>> {
    if initial_ingredients.is_empty() {
        return None;
    }

    let mut acc: Option<Vec<f32>> = None;
    let mut matched = 0usize;

    for dish in catalog.values() {
        let Some(embedding) = &dish.embedding else {
            continue;
        };
        if dish
            .ingredients
            .iter()
            .any(|ing| initial_ingredients.contains(ing))
        {
            accumulate(&mut acc, 1.0, embedding);
            matched += 1;
        }
    }

    let mut mean = acc?;
    for value in mean.iter_mut() {
        *value /= matched as f32;
    }
    Some(mean)
}

/// Computes a user's preference vector, or `None` when the user has no
/// derivable signal (zero usable ratings and zero matchable initial
/// ingredients); the cold-start path takes over in that case
pub fn compute_preference_vector(
    initial_ingredients: &[String],
    ratings: &[Rating],
    catalog: &HashMap<String, Dish>,
) -> Option<Vec<f32>> {
    let mut acc: Option<Vec<f32>> = None;

    // A rating without an embedding still occupies its recency rank; it
    // simply contributes nothing to the sum.
    for (i, rating) in ratings.iter().enumerate() {
        if let Some(embedding) = &rating.embedding {
            let weight = f64::from(rating.direction.signum())
                * f64::from(rating.strength)
                * DECAY_FACTOR.powi(i as i32);
            accumulate(&mut acc, weight, embedding);
        }
    }

    if let Some(base) = base_vector(initial_ingredients, catalog) {
        accumulate(&mut acc, 1.0, &base);
    }

    acc
}

/// Nudges the user's categorical weight maps from rating history
///
/// Each rated dish moves the weights of the tags it carries by
/// `direction × strength × decay^i × learn_rate`, merged additively into the
/// onboarding weights so stated preferences remain the baseline that ratings
/// adjust, not overwrite. Results clamp at zero: weight maps never hold
/// negative values.
pub fn infer_attribute_weights(
    ratings: &[Rating],
    flavor_weights: &HashMap<String, f64>,
    method_weights: &HashMap<String, f64>,
    cuisine_weights: &HashMap<String, f64>,
) -> (
    HashMap<String, f64>,
    HashMap<String, f64>,
    HashMap<String, f64>,
) {
    let mut flavor_delta: HashMap<String, f64> = HashMap::new();
    let mut method_delta: HashMap<String, f64> = HashMap::new();
    let mut cuisine_delta: HashMap<String, f64> = HashMap::new();

    for (i, rating) in ratings.iter().enumerate() {
        let nudge = f64::from(rating.direction.signum())
            * f64::from(rating.strength)
            * DECAY_FACTOR.powi(i as i32)
            * ATTRIBUTE_LEARN_RATE;

        for tag in &rating.flavor_profiles {
            *flavor_delta.entry(tag.clone()).or_default() += nudge;
        }
        for tag in &rating.cooking_methods {
            *method_delta.entry(tag.clone()).or_default() += nudge;
        }
        if let Some(cuisine) = &rating.cuisine_type {
            *cuisine_delta.entry(cuisine.clone()).or_default() += nudge;
        }
    }

    (
        merge_clamped(flavor_weights, &flavor_delta),
        merge_clamped(method_weights, &method_delta),
        merge_clamped(cuisine_weights, &cuisine_delta),
    )
}

fn merge_clamped(
    existing: &HashMap<String, f64>,
    delta: &HashMap<String, f64>,
) -> HashMap<String, f64> {
    let mut merged = HashMap::new();
    for key in existing.keys().chain(delta.keys()) {
        let value = existing.get(key).copied().unwrap_or(0.0)
            + delta.get(key).copied().unwrap_or(0.0);
        if value > 0.0 {
            merged.insert(key.clone(), value);
        }
    }
    merged
}

/// Rebuilds stale preference state and writes it back
///
/// The only writer that clears `vector_stale`; the flag is cleared atomically
/// with the vector write in the store. A rebuild that finds no signal still
/// counts as a recompute (the vector is cleared, staleness is cleared, and
/// the caller routes the user to cold start).
pub struct PreferenceVectorBuilder {
    store: Arc<dyn PreferenceStore>,
}

impl PreferenceVectorBuilder {
    pub fn new(store: Arc<dyn PreferenceStore>) -> Self {
        Self { store }
    }

    /// Recomputes the user's vector and inferred weights from the rating
    /// history; returns the rating count for hybrid weight selection
    pub async fn rebuild(
        &self,
        user: &mut UserPreferenceState,
        catalog: &HashMap<String, Dish>,
    ) -> AppResult<usize> {
        let ratings = self.store.ratings_for_user(user.user_id).await?;

        let vector = compute_preference_vector(&user.initial_ingredients, &ratings, catalog);
        self.store
            .save_preference_vector(user.user_id, vector.clone())
            .await?;
        user.set_vector(vector);

        if !ratings.is_empty() {
            let (flavor, method, cuisine) = infer_attribute_weights(
                &ratings,
                &user.flavor_weights,
                &user.method_weights,
                &user.cuisine_weights,
            );
            self.store
                .save_attribute_weights(
                    user.user_id,
                    flavor.clone(),
                    method.clone(),
                    cuisine.clone(),
                )
                .await?;
            user.flavor_weights = flavor;
            user.method_weights = method;
            user.cuisine_weights = cuisine;
        }

        tracing::info!(
            user_id = %user.user_id,
            ratings = ratings.len(),
            has_vector = user.preference_vector.is_some(),
            "Preference vector rebuilt"
        );

        Ok(ratings.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockPreferenceStore;
    use crate::models::{DishType, RatingDirection, ValidatedAttributes};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn rating(
        key: &str,
        direction: RatingDirection,
        strength: f32,
        embedding: Option<Vec<f32>>,
    ) -> Rating {
        Rating {
            dish_key: key.to_string(),
            direction,
            strength,
            occurred_at: Utc::now(),
            menu_date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
            embedding,
            flavor_profiles: Vec::new(),
            cooking_methods: Vec::new(),
            cuisine_type: None,
        }
    }

    fn dish(key: &str, ingredients: &[&str], embedding: Option<Vec<f32>>) -> Dish {
        let mut d = Dish::from_attributes(
            key.to_string(),
            key.to_string(),
            ValidatedAttributes::fallback(),
            embedding,
        );
        d.ingredients = ingredients.iter().map(|s| s.to_string()).collect();
        d.dish_type = DishType::Main;
        d
    }

    #[test]
    fn test_decayed_rating_sum() {
        // Like of A at i=0 (full weight), dislike of B at strength 0.5, i=1
        let ratings = vec![
            rating("a", RatingDirection::Liked, 1.0, Some(vec![1.0, 0.0])),
            rating("b", RatingDirection::Disliked, 0.5, Some(vec![0.0, 1.0])),
        ];

        let pref = compute_preference_vector(&[], &ratings, &HashMap::new()).unwrap();
        assert!((pref[0] - 1.0).abs() < 1e-6);
        assert!((pref[1] + 0.475).abs() < 1e-6);
    }

    #[test]
    fn test_decay_at_rank_ten() {
        let expected = DECAY_FACTOR.powi(10);
        assert!((expected - 0.599).abs() < 1e-3);

        let mut ratings = Vec::new();
        for _ in 0..10 {
            // Ratings without embeddings consume recency ranks
            ratings.push(rating("skip", RatingDirection::Liked, 1.0, None));
        }
        ratings.push(rating("j", RatingDirection::Liked, 1.0, Some(vec![1.0, 0.0])));

        let pref = compute_preference_vector(&[], &ratings, &HashMap::new()).unwrap();
        assert!((f64::from(pref[0]) - expected).abs() < 1e-6);
        assert_eq!(pref[1], 0.0);
    }

    #[test]
    fn test_no_signal_yields_none() {
        let ratings = vec![rating("a", RatingDirection::Liked, 1.0, None)];
        let catalog = HashMap::from([(
            "plain".to_string(),
            dish("plain", &["rice"], Some(vec![1.0, 1.0])),
        )]);

        // Unembeddable ratings and unmatchable initial ingredients: no vector
        let pref = compute_preference_vector(
            &["durian".to_string()],
            &ratings,
            &catalog,
        );
        assert!(pref.is_none());
    }

    #[test]
    fn test_base_vector_is_mean_of_matching_dishes() {
        let catalog = HashMap::from([
            (
                "a".to_string(),
                dish("a", &["chicken", "rice"], Some(vec![2.0, 0.0])),
            ),
            (
                "b".to_string(),
                dish("b", &["chicken"], Some(vec![0.0, 2.0])),
            ),
            ("c".to_string(), dish("c", &["tofu"], Some(vec![9.0, 9.0]))),
        ]);

        let pref =
            compute_preference_vector(&["chicken".to_string()], &[], &catalog).unwrap();
        assert!((pref[0] - 1.0).abs() < 1e-6);
        assert!((pref[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_inferred_weights_never_negative() {
        let mut r = rating("a", RatingDirection::Disliked, 1.0, None);
        r.flavor_profiles = vec!["spicy".to_string()];
        r.cuisine_type = Some("thai".to_string());

        let existing = HashMap::from([("spicy".to_string(), 0.05)]);
        let (flavor, _method, cuisine) =
            infer_attribute_weights(&[r], &existing, &HashMap::new(), &HashMap::new());

        // 0.05 - 0.1 clamps out entirely rather than going negative
        assert!(flavor.get("spicy").is_none());
        assert!(cuisine.get("thai").is_none());
    }

    #[test]
    fn test_inferred_weights_adjust_baseline() {
        let mut r = rating("a", RatingDirection::Liked, 1.0, None);
        r.cooking_methods = vec!["grilled".to_string()];

        let existing = HashMap::from([("grilled".to_string(), 1.0)]);
        let (_flavor, method, _cuisine) =
            infer_attribute_weights(&[r], &HashMap::new(), &existing, &HashMap::new());

        assert!((method["grilled"] - 1.1).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_rebuild_clears_stale_flag() {
        let user_id = Uuid::new_v4();
        let mut store = MockPreferenceStore::new();
        store.expect_ratings_for_user().returning(|_| {
            Ok(vec![Rating {
                dish_key: "a".to_string(),
                direction: RatingDirection::Liked,
                strength: 1.0,
                occurred_at: Utc::now(),
                menu_date: NaiveDate::from_ymd_opt(2026, 8, 6).unwrap(),
                embedding: Some(vec![1.0, 0.0]),
                flavor_profiles: vec!["savory".to_string()],
                cooking_methods: Vec::new(),
                cuisine_type: None,
            }])
        });
        store
            .expect_save_preference_vector()
            .withf(move |id, vector| *id == user_id && vector.is_some())
            .returning(|_, _| Ok(()));
        store
            .expect_save_attribute_weights()
            .returning(|_, _, _, _| Ok(()));

        let builder = PreferenceVectorBuilder::new(Arc::new(store));
        let mut user = UserPreferenceState::new(user_id, "s@example.edu".to_string());
        user.mark_stale();

        let count = builder.rebuild(&mut user, &HashMap::new()).await.unwrap();
        assert_eq!(count, 1);
        assert!(!user.vector_stale);
        assert!(user.preference_vector.is_some());
        assert!(user.flavor_weights.contains_key("savory"));
    }
}
