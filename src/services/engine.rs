/// Daily recommendation run
///
/// One offline batch per scheduled invocation: resolve the day's new dishes
/// into the catalog, persist the menu, then score every subscribed user
/// independently. Per-user work is fanned out across tasks; no user's
/// computation reads another user's state. Users with no derivable
/// preference signal share a single cold-start result. Nothing here is
/// fatal: a user or dish that cannot be scored is omitted and logged, and
/// partial progress (resolved dishes, rebuilt vectors) persists for the
/// next run.
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    db::{CatalogStore, DailyMenuEntry, PreferenceStore},
    error::AppResult,
    models::{
        DailyMenu, Dish, MealBucket, MealPicks, RecommendationSet, RecommendationSource,
        UserPreferenceState, UserRecommendation,
    },
    services::{
        aggregator::{rank_eateries, ScoredDish},
        cold_start::ColdStartResolver,
        dietary,
        normalizer::normalize_dish_name,
        preference::PreferenceVectorBuilder,
        providers::{AttributeExtractor, ColdStartRanker, Embedder},
        resolver::{DishResolver, PendingDish},
        scorer::score_dish,
    },
};

pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    preferences: Arc<dyn PreferenceStore>,
    resolver: DishResolver,
    builder: Arc<PreferenceVectorBuilder>,
    cold_start: ColdStartResolver,
}

enum UserOutcome {
    Personalized(Box<UserRecommendation>),
    NeedsColdStart(Box<UserPreferenceState>),
}

impl RecommendationEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        preferences: Arc<dyn PreferenceStore>,
        extractor: Arc<dyn AttributeExtractor>,
        embedder: Arc<dyn Embedder>,
        ranker: Arc<dyn ColdStartRanker>,
        resolver_concurrency: usize,
    ) -> Self {
        Self {
            resolver: DishResolver::new(
                Arc::clone(&catalog),
                extractor,
                embedder,
                resolver_concurrency,
            ),
            builder: Arc::new(PreferenceVectorBuilder::new(Arc::clone(&preferences))),
            cold_start: ColdStartResolver::new(ranker),
            catalog,
            preferences,
        }
    }

    /// Runs the full pipeline for one day's menu and returns per-user picks
    pub async fn run(&self, menu: &DailyMenu) -> AppResult<Vec<UserRecommendation>> {
        // Normalize and deduplicate the day's dishes
        let mut key_to_source: HashMap<String, String> = HashMap::new();
        for bucket in MealBucket::ALL {
            for slice in menu.slices(bucket) {
                for item in &slice.items {
                    let key = normalize_dish_name(item);
                    if key.is_empty() {
                        continue;
                    }
                    key_to_source.entry(key).or_insert_with(|| item.clone());
                }
            }
        }
        let keys: Vec<String> = key_to_source.keys().cloned().collect();

        tracing::info!(
            date = %menu.menu_date,
            menu_items = menu.item_count(),
            unique_dishes = keys.len(),
            "Daily run started"
        );

        // Resolve cache misses and attribute backfills, then re-read
        let mut catalog_map = self.catalog.get_batch(&keys).await?;

        let pending: Vec<PendingDish> = keys
            .iter()
            .filter(|key| {
                catalog_map
                    .get(*key)
                    .map(Dish::needs_attribute_backfill)
                    .unwrap_or(true)
            })
            .map(|key| PendingDish {
                normalized_key: key.clone(),
                source_name: key_to_source[key].clone(),
            })
            .collect();

        if !pending.is_empty() {
            let new_count = pending
                .iter()
                .filter(|p| !catalog_map.contains_key(&p.normalized_key))
                .count();
            tracing::info!(
                new = new_count,
                backfill = pending.len() - new_count,
                "Resolving dishes"
            );
            self.resolver.resolve(pending).await?;
            catalog_map = self.catalog.get_batch(&keys).await?;
        }

        self.record_daily_menu(menu, &catalog_map).await?;

        // Score every subscribed user independently
        let users = self.preferences.subscribed_users().await?;
        if users.is_empty() {
            tracing::warn!("No subscribed users; nothing to recommend");
            return Ok(Vec::new());
        }

        let catalog_map = Arc::new(catalog_map);
        let menu_shared = Arc::new(menu.clone());

        let mut tasks = Vec::with_capacity(users.len());
        for user in users {
            let preferences = Arc::clone(&self.preferences);
            let builder = Arc::clone(&self.builder);
            let catalog_map = Arc::clone(&catalog_map);
            let menu = Arc::clone(&menu_shared);

            tasks.push(tokio::spawn(async move {
                let email = user.email.clone();
                let outcome = score_one_user(user, preferences, builder, catalog_map, menu).await;
                (email, outcome)
            }));
        }

        let mut results = Vec::new();
        let mut awaiting_cold_start = Vec::new();

        for task in tasks {
            match task.await {
                Ok((_, Ok(UserOutcome::Personalized(rec)))) => results.push(*rec),
                Ok((_, Ok(UserOutcome::NeedsColdStart(user)))) => awaiting_cold_start.push(*user),
                Ok((email, Err(e))) => {
                    tracing::warn!(email = %email, error = %e, "Omitting user from today's output");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "User scoring task join error");
                }
            }
        }

        // One shared LLM ranking for everyone without preference signal
        if !awaiting_cold_start.is_empty() {
            match self.cold_start.resolve(menu).await {
                Ok(picks) => {
                    tracing::info!(
                        users = awaiting_cold_start.len(),
                        "Cold-start picks shared across users without signal"
                    );
                    for user in awaiting_cold_start {
                        results.push(UserRecommendation {
                            user_id: Some(user.user_id),
                            email: user.email,
                            source: RecommendationSource::ColdStart,
                            picks: picks.clone(),
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        omitted = awaiting_cold_start.len(),
                        error = %e,
                        "Cold-start resolution failed; omitting users"
                    );
                }
            }
        }

        tracing::info!(recommended = results.len(), "Daily run completed");

        Ok(results)
    }

    async fn record_daily_menu(
        &self,
        menu: &DailyMenu,
        catalog_map: &HashMap<String, Dish>,
    ) -> AppResult<()> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();

        for bucket in MealBucket::ALL {
            for slice in menu.slices(bucket) {
                for item in &slice.items {
                    let key = normalize_dish_name(item);
                    if !catalog_map.contains_key(&key) {
                        continue;
                    }
                    if seen.insert((key.clone(), slice.eatery_name.clone(), bucket)) {
                        entries.push(DailyMenuEntry {
                            dish_key: key,
                            eatery: slice.eatery_name.clone(),
                            bucket,
                        });
                    }
                }
            }
        }

        self.catalog.upsert_daily_menu(menu.menu_date, &entries).await
    }
}

async fn score_one_user(
    mut user: UserPreferenceState,
    preferences: Arc<dyn PreferenceStore>,
    builder: Arc<PreferenceVectorBuilder>,
    catalog: Arc<HashMap<String, Dish>>,
    menu: Arc<DailyMenu>,
) -> AppResult<UserOutcome> {
    // A stale vector is never scored: recompute before anything else
    let rating_count = if user.vector_stale {
        builder.rebuild(&mut user, &catalog).await?
    } else {
        preferences.rating_count(user.user_id).await?
    };

    if user.preference_vector.is_none() {
        return Ok(UserOutcome::NeedsColdStart(Box::new(user)));
    }

    let picks = score_menu(&user, rating_count, &menu, &catalog);

    Ok(UserOutcome::Personalized(Box::new(UserRecommendation {
        user_id: Some(user.user_id),
        email: user.email.clone(),
        source: RecommendationSource::Personalized,
        picks,
    })))
}

/// Scores one user against the day's menu, bucket by bucket
fn score_menu(
    user: &UserPreferenceState,
    rating_count: usize,
    menu: &DailyMenu,
    catalog: &HashMap<String, Dish>,
) -> RecommendationSet {
    let mut result = RecommendationSet::new();

    for bucket in MealBucket::ALL {
        let mut by_eatery: HashMap<String, Vec<ScoredDish>> = HashMap::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut unresolved = 0usize;

        for slice in menu.slices(bucket) {
            for item in &slice.items {
                let key = normalize_dish_name(item);
                let Some(dish) = catalog.get(&key) else {
                    unresolved += 1;
                    continue;
                };
                if !seen.insert((slice.eatery_name.clone(), key)) {
                    continue;
                }
                if !dietary::is_eligible(&user.dietary_restrictions, &dish.dietary_attrs) {
                    continue;
                }

                by_eatery
                    .entry(slice.eatery_name.clone())
                    .or_default()
                    .push(ScoredDish {
                        display_name: item.clone(),
                        score: score_dish(user, rating_count, dish),
                        dish_type: dish.dish_type,
                        ingredients: dish.ingredients.clone(),
                    });
            }
        }

        if unresolved > 0 {
            tracing::debug!(
                bucket = bucket.as_str(),
                unresolved,
                "Unresolved dishes omitted from scoring"
            );
        }

        result.insert(
            bucket,
            MealPicks {
                picks: rank_eateries(by_eatery),
            },
        );
    }

    result
}
