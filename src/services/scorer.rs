/// Hybrid dish scoring
///
/// Blends embedding cosine similarity with categorical-tag overlap, weighted
/// by confidence in the learned preference vector:
///
/// ```text
/// score = w_cos · cos_sim(pref, dish.embedding)
///       + w_flavor · jaccard(flavor weight keys, dish flavors)
///       + w_method · jaccard(method weight keys, dish methods)
///       + w_cuisine · [dish cuisine ∈ cuisine weight keys]
/// ```
///
/// Scores are comparable across dishes for one user, not across users.
use crate::{
    models::{Dish, UserPreferenceState},
    services::{
        similarity::{cosine_similarity, jaccard},
        weights::weights_for_rating_count,
    },
};

/// Scores one dish for one user
///
/// A dish without a resolved embedding is non-matchable and scores 0. A user
/// with no categorical weights at all scores on cosine similarity alone:
/// the categorical terms would contribute 0 anyway, but the explicit
/// fallback documents intent and sidesteps empty-set edge cases.
pub fn score_dish(user: &UserPreferenceState, rating_count: usize, dish: &Dish) -> f64 {
    let Some(pref) = &user.preference_vector else {
        return 0.0;
    };
    let Some(embedding) = &dish.embedding else {
        return 0.0;
    };

    let cos = cosine_similarity(pref, embedding);

    if !user.has_categorical_weights() {
        return cos;
    }

    let weights = weights_for_rating_count(rating_count);

    let flavor_sim = jaccard(
        user.flavor_weights.keys().map(String::as_str),
        dish.flavor_profiles.iter().map(String::as_str),
    );
    let method_sim = jaccard(
        user.method_weights.keys().map(String::as_str),
        dish.cooking_methods.iter().map(String::as_str),
    );
    let cuisine_match = if user.cuisine_weights.contains_key(&dish.cuisine_type) {
        1.0
    } else {
        0.0
    };

    weights.cosine * cos
        + weights.flavor * flavor_sim
        + weights.method * method_sim
        + weights.cuisine * cuisine_match
}
