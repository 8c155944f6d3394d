use std::collections::HashMap;

use sqlx::{types::Json, PgPool, Row};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Rating, RatingDirection, UserPreferenceState},
};

/// Most ratings considered per user when rebuilding a preference vector;
/// with 0.95 decay, contributions beyond this are negligible anyway
const RATING_HISTORY_LIMIT: i64 = 200;

/// Keyed read/write service for user preference state and rating history
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PreferenceStore: Send + Sync {
    /// All subscribed users with their preference state
    async fn subscribed_users(&self) -> AppResult<Vec<UserPreferenceState>>;

    /// A user's ratings joined with dish embeddings and tags, most recent
    /// first, the recency order the decay formula depends on
    async fn ratings_for_user(&self, user_id: Uuid) -> AppResult<Vec<Rating>>;

    /// Total rating count for hybrid weight selection
    async fn rating_count(&self, user_id: Uuid) -> AppResult<usize>;

    /// Writes a rebuilt preference vector and clears the staleness flag in
    /// the same statement
    async fn save_preference_vector(
        &self,
        user_id: Uuid,
        vector: Option<Vec<f32>>,
    ) -> AppResult<()>;

    /// Persists merged flavor/method/cuisine weight maps
    async fn save_attribute_weights(
        &self,
        user_id: Uuid,
        flavor_weights: HashMap<String, f64>,
        method_weights: HashMap<String, f64>,
        cuisine_weights: HashMap<String, f64>,
    ) -> AppResult<()>;
}

/// Postgres-backed preference store
#[derive(Clone)]
pub struct PgPreferenceStore {
    pool: PgPool,
}

impl PgPreferenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl PreferenceStore for PgPreferenceStore {
    async fn subscribed_users(&self) -> AppResult<Vec<UserPreferenceState>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.email,
                   up.initial_ingredients, up.preference_vector, up.vector_stale,
                   up.flavor_weights, up.method_weights, up.cuisine_weights,
                   up.dietary_restrictions
            FROM profiles p
            LEFT JOIN user_preferences up ON up.user_id = p.id
            WHERE p.subscribed = true
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut users = Vec::with_capacity(rows.len());
        for row in &rows {
            let flavor: Option<Json<HashMap<String, f64>>> = row.try_get("flavor_weights")?;
            let method: Option<Json<HashMap<String, f64>>> = row.try_get("method_weights")?;
            let cuisine: Option<Json<HashMap<String, f64>>> = row.try_get("cuisine_weights")?;

            users.push(UserPreferenceState {
                user_id: row.try_get("id")?,
                email: row.try_get("email")?,
                initial_ingredients: row
                    .try_get::<Option<Vec<String>>, _>("initial_ingredients")?
                    .unwrap_or_default(),
                flavor_weights: flavor.map(|j| j.0).unwrap_or_default(),
                method_weights: method.map(|j| j.0).unwrap_or_default(),
                cuisine_weights: cuisine.map(|j| j.0).unwrap_or_default(),
                dietary_restrictions: row
                    .try_get::<Option<Vec<String>>, _>("dietary_restrictions")?
                    .unwrap_or_default(),
                preference_vector: row.try_get("preference_vector")?,
                // Users with no preference row at all start stale
                vector_stale: row.try_get::<Option<bool>, _>("vector_stale")?.unwrap_or(true),
            });
        }

        tracing::info!(count = users.len(), "Subscribed users loaded");

        Ok(users)
    }

    async fn ratings_for_user(&self, user_id: Uuid) -> AppResult<Vec<Rating>> {
        let rows = sqlx::query(
            r#"
            SELECT r.rating, r.strength, r.created_at, r.menu_date,
                   d.normalized_key, d.embedding,
                   d.flavor_profiles, d.cooking_methods, d.cuisine_type
            FROM ratings r
            JOIN dishes d ON d.normalized_key = r.dish_key
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(RATING_HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        let mut ratings = Vec::with_capacity(rows.len());
        for row in &rows {
            let direction: i16 = row.try_get("rating")?;
            ratings.push(Rating {
                dish_key: row.try_get("normalized_key")?,
                direction: RatingDirection::from_i16(direction),
                strength: row.try_get::<Option<f32>, _>("strength")?.unwrap_or(1.0),
                occurred_at: row.try_get("created_at")?,
                menu_date: row.try_get("menu_date")?,
                embedding: row.try_get("embedding")?,
                flavor_profiles: row.try_get("flavor_profiles")?,
                cooking_methods: row.try_get("cooking_methods")?,
                cuisine_type: row.try_get("cuisine_type")?,
            });
        }

        Ok(ratings)
    }

    async fn rating_count(&self, user_id: Uuid) -> AppResult<usize> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM ratings WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let count: i64 = row.try_get("n")?;
        Ok(count as usize)
    }

    async fn save_preference_vector(
        &self,
        user_id: Uuid,
        vector: Option<Vec<f32>>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences (user_id, preference_vector, vector_stale, updated_at)
            VALUES ($1, $2, false, now())
            ON CONFLICT (user_id) DO UPDATE SET
                preference_vector = EXCLUDED.preference_vector,
                vector_stale = false,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(vector)
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id = %user_id, "Preference vector saved, stale flag cleared");

        Ok(())
    }

    async fn save_attribute_weights(
        &self,
        user_id: Uuid,
        flavor_weights: HashMap<String, f64>,
        method_weights: HashMap<String, f64>,
        cuisine_weights: HashMap<String, f64>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences
                (user_id, flavor_weights, method_weights, cuisine_weights, updated_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (user_id) DO UPDATE SET
                flavor_weights = EXCLUDED.flavor_weights,
                method_weights = EXCLUDED.method_weights,
                cuisine_weights = EXCLUDED.cuisine_weights,
                updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(Json(flavor_weights))
        .bind(Json(method_weights))
        .bind(Json(cuisine_weights))
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
