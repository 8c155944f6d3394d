/// Cold-start recommendations for users with no derivable preference signal
///
/// Delegates ranking to the LLM collaborator with the full day's menu as
/// context, then validates the structured response: every returned eatery
/// must exist in the current menu for that bucket, at most one pick per
/// eatery per bucket, at most four picks per bucket. Invalid entries are
/// dropped rather than failing the run. This path bypasses embeddings
/// entirely. Computed once per run and shared by every cold-start user.
use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::{
    error::AppResult,
    models::{DailyMenu, EateryPick, MealBucket, MealPicks, RecommendationSet},
    services::providers::ColdStartRanker,
};

const MAX_PICKS_PER_BUCKET: usize = 4;

pub struct ColdStartResolver {
    ranker: Arc<dyn ColdStartRanker>,
}

impl ColdStartResolver {
    pub fn new(ranker: Arc<dyn ColdStartRanker>) -> Self {
        Self { ranker }
    }

    pub async fn resolve(&self, menu: &DailyMenu) -> AppResult<RecommendationSet> {
        let raw = self.ranker.rank_menu(menu).await?;
        Ok(sanitize(raw, menu))
    }
}

/// Validates and repairs the collaborator's JSON against the actual menu
pub fn sanitize(raw: Value, menu: &DailyMenu) -> RecommendationSet {
    let mut result = RecommendationSet::new();

    for bucket in MealBucket::ALL {
        let valid_eateries = menu.eateries_in(bucket);

        let picks_value = raw
            .get(bucket.as_str())
            .and_then(|meal| meal.get("picks"))
            .and_then(Value::as_array);

        let Some(picks_value) = picks_value else {
            result.insert(bucket, MealPicks::default());
            continue;
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut clean = Vec::new();

        for pick in picks_value {
            if clean.len() >= MAX_PICKS_PER_BUCKET {
                break;
            }

            let Some(eatery) = pick.get("eatery").and_then(Value::as_str) else {
                continue;
            };
            if eatery.is_empty() || !valid_eateries.contains(eatery) {
                tracing::warn!(
                    bucket = bucket.as_str(),
                    eatery,
                    "Dropping cold-start pick for unknown eatery"
                );
                continue;
            }
            if !seen.insert(eatery.to_string()) {
                continue;
            }

            let dishes = pick
                .get("dishes")
                .and_then(Value::as_array)
                .map(|arr| {
                    arr.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            clean.push(EateryPick {
                eatery: eatery.to_string(),
                dishes,
            });
        }

        result.insert(bucket, MealPicks { picks: clean });
    }

    result
}
