/// Onboarding dish selection
///
/// Picks the most mutually distant main-dish embeddings so the onboarding
/// screen covers the taste space instead of showing ten variations of one
/// cuisine. Greedy farthest-point selection on unit-normalized vectors:
/// start from the first candidate, then repeatedly take the dish that
/// maximizes the minimum cosine distance to everything already selected.
use std::sync::Arc;

use crate::{db::CatalogStore, error::AppResult};

pub const ONBOARDING_DISH_COUNT: usize = 10;

fn unit_normalize(vector: &[f32]) -> Vec<f32> {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Greedy farthest-point selection; returns the keys of `count` candidates
pub fn select_diverse_keys(candidates: &[(String, Vec<f32>)], count: usize) -> Vec<String> {
    if candidates.is_empty() || count == 0 {
        return Vec::new();
    }
    let count = count.min(candidates.len());

    let normalized: Vec<Vec<f32>> = candidates
        .iter()
        .map(|(_, vector)| unit_normalize(vector))
        .collect();

    let mut selected = vec![0usize];
    // min_dist[i] = min cosine distance from candidate i to any selected dish
    let mut min_dist: Vec<f32> = normalized
        .iter()
        .map(|v| 1.0 - dot(v, &normalized[0]))
        .collect();

    while selected.len() < count {
        for &idx in &selected {
            min_dist[idx] = -1.0;
        }

        let next = min_dist
            .iter()
            .enumerate()
            .max_by(|x, y| x.1.total_cmp(y.1))
            .map(|(idx, _)| idx)
            .expect("candidates is non-empty");
        selected.push(next);

        for (i, dist) in min_dist.iter_mut().enumerate() {
            let to_next = 1.0 - dot(&normalized[i], &normalized[next]);
            if to_next < *dist {
                *dist = to_next;
            }
        }
    }

    selected
        .into_iter()
        .map(|idx| candidates[idx].0.clone())
        .collect()
}

/// Refreshes the catalog's onboarding flags from the current dish pool
pub struct OnboardingSelector {
    catalog: Arc<dyn CatalogStore>,
}

impl OnboardingSelector {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }

    /// Reselects the onboarding set; returns how many dishes were flagged.
    /// Skips (returning 0) when the pool is still too small.
    pub async fn refresh(&self) -> AppResult<usize> {
        let dishes = self.catalog.main_dishes_with_embeddings().await?;

        let candidates: Vec<(String, Vec<f32>)> = dishes
            .into_iter()
            .filter_map(|dish| {
                let key = dish.normalized_key;
                dish.embedding.map(|embedding| (key, embedding))
            })
            .collect();

        if candidates.len() < ONBOARDING_DISH_COUNT {
            tracing::warn!(
                available = candidates.len(),
                needed = ONBOARDING_DISH_COUNT,
                "Too few embedded main dishes for onboarding selection"
            );
            return Ok(0);
        }

        let selected = select_diverse_keys(&candidates, ONBOARDING_DISH_COUNT);
        self.catalog.set_onboarding_flags(&selected).await?;

        tracing::info!(selected = selected.len(), "Onboarding dish set refreshed");

        Ok(selected.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(key: &str, vector: &[f32]) -> (String, Vec<f32>) {
        (key.to_string(), vector.to_vec())
    }

    #[test]
    fn test_selects_requested_count_of_distinct_keys() {
        let candidates: Vec<_> = (0..20)
            .map(|i| candidate(&format!("dish {}", i), &[i as f32 + 1.0, 1.0]))
            .collect();

        let selected = select_diverse_keys(&candidates, 10);
        assert_eq!(selected.len(), 10);

        let unique: std::collections::HashSet<&String> = selected.iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn test_prefers_spread_over_near_duplicates() {
        // Two tight clusters plus one outlier; selecting 3 should span all
        // three regions instead of taking both near-duplicates
        let candidates = vec![
            candidate("anchor", &[1.0, 0.0]),
            candidate("anchor twin", &[0.999, 0.01]),
            candidate("opposite", &[0.0, 1.0]),
            candidate("diagonal", &[0.7, 0.7]),
        ];

        let selected = select_diverse_keys(&candidates, 3);
        assert_eq!(selected[0], "anchor");
        assert!(selected.contains(&"opposite".to_string()));
        assert!(selected.contains(&"diagonal".to_string()));
    }

    #[test]
    fn test_count_clamps_to_pool_size() {
        let candidates = vec![candidate("only", &[1.0, 0.0])];
        let selected = select_diverse_keys(&candidates, 10);
        assert_eq!(selected, vec!["only"]);
    }

    #[test]
    fn test_empty_pool() {
        assert!(select_diverse_keys(&[], 10).is_empty());
    }

    fn embedded_main(key: &str, vector: Vec<f32>) -> crate::models::Dish {
        crate::models::Dish::from_attributes(
            key.to_string(),
            key.to_string(),
            crate::models::ValidatedAttributes::fallback(),
            Some(vector),
        )
    }

    #[tokio::test]
    async fn test_refresh_flags_selected_dishes() {
        let mut catalog = crate::db::MockCatalogStore::new();
        catalog.expect_main_dishes_with_embeddings().returning(|| {
            Ok((0..12)
                .map(|i| embedded_main(&format!("dish {}", i), vec![i as f32 + 1.0, 1.0]))
                .collect())
        });
        catalog
            .expect_set_onboarding_flags()
            .withf(|selected| selected.len() == ONBOARDING_DISH_COUNT)
            .returning(|_| Ok(()));

        let selector = OnboardingSelector::new(Arc::new(catalog));
        assert_eq!(selector.refresh().await.unwrap(), ONBOARDING_DISH_COUNT);
    }

    #[tokio::test]
    async fn test_refresh_skips_small_pools() {
        let mut catalog = crate::db::MockCatalogStore::new();
        catalog
            .expect_main_dishes_with_embeddings()
            .returning(|| Ok(vec![embedded_main("lonely dish", vec![1.0, 0.0])]));
        // set_onboarding_flags must not be called

        let selector = OnboardingSelector::new(Arc::new(catalog));
        assert_eq!(selector.refresh().await.unwrap(), 0);
    }
}
