use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use crate::{
    error::AppResult,
    models::{Dish, DishType, MealBucket},
};

/// One (dish, eatery, bucket) triple on a day's menu, persisted so later
/// rating events can reference what was actually served
#[derive(Debug, Clone, PartialEq)]
pub struct DailyMenuEntry {
    pub dish_key: String,
    pub eatery: String,
    pub bucket: MealBucket,
}

/// Keyed read/write service for the dish catalog
///
/// Writes are idempotent upserts keyed by `normalized_key` and safe under
/// at-least-once retry; the store's own atomic-upsert guarantee is the only
/// locking this engine relies on.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Exact-match lookup by normalized key
    async fn get_by_key(&self, key: &str) -> AppResult<Option<Dish>>;

    /// Batch lookup; absent keys are simply missing from the result map
    async fn get_batch(&self, keys: &[String]) -> AppResult<HashMap<String, Dish>>;

    /// Idempotent upsert of resolved dishes
    async fn upsert_batch(&self, dishes: &[Dish]) -> AppResult<()>;

    /// Records which dishes were served where on a given date
    async fn upsert_daily_menu(&self, date: NaiveDate, entries: &[DailyMenuEntry])
        -> AppResult<()>;

    /// All main dishes that have a resolved embedding, for onboarding
    /// candidate selection
    async fn main_dishes_with_embeddings(&self) -> AppResult<Vec<Dish>>;

    /// Flags the selected keys as onboarding dishes and clears the rest
    async fn set_onboarding_flags(&self, selected: &[String]) -> AppResult<()>;
}

/// Postgres-backed catalog store
#[derive(Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn dish_from_row(row: &sqlx::postgres::PgRow) -> AppResult<Dish> {
        let dish_type: String = row.try_get("dish_type")?;
        Ok(Dish {
            normalized_key: row.try_get("normalized_key")?,
            source_name: row.try_get("source_name")?,
            ingredients: row.try_get("ingredients")?,
            embedding: row.try_get("embedding")?,
            flavor_profiles: row.try_get("flavor_profiles")?,
            cooking_methods: row.try_get("cooking_methods")?,
            cuisine_type: row.try_get("cuisine_type")?,
            dietary_attrs: row.try_get("dietary_attrs")?,
            dish_type: DishType::parse(&dish_type),
        })
    }
}

const DISH_COLUMNS: &str = "normalized_key, source_name, ingredients, embedding, \
     flavor_profiles, cooking_methods, cuisine_type, dietary_attrs, dish_type";

#[async_trait::async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get_by_key(&self, key: &str) -> AppResult<Option<Dish>> {
        let row = sqlx::query(&format!(
            "SELECT {DISH_COLUMNS} FROM dishes WHERE normalized_key = $1"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::dish_from_row).transpose()
    }

    async fn get_batch(&self, keys: &[String]) -> AppResult<HashMap<String, Dish>> {
        if keys.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(&format!(
            "SELECT {DISH_COLUMNS} FROM dishes WHERE normalized_key = ANY($1)"
        ))
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;

        let mut found = HashMap::with_capacity(rows.len());
        for row in &rows {
            let dish = Self::dish_from_row(row)?;
            found.insert(dish.normalized_key.clone(), dish);
        }

        tracing::debug!(requested = keys.len(), found = found.len(), "Catalog batch lookup");

        Ok(found)
    }

    async fn upsert_batch(&self, dishes: &[Dish]) -> AppResult<()> {
        for dish in dishes {
            sqlx::query(
                r#"
                INSERT INTO dishes
                    (normalized_key, source_name, ingredients, embedding,
                     flavor_profiles, cooking_methods, cuisine_type,
                     dietary_attrs, dish_type, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
                ON CONFLICT (normalized_key) DO UPDATE SET
                    source_name = EXCLUDED.source_name,
                    ingredients = EXCLUDED.ingredients,
                    embedding = EXCLUDED.embedding,
                    flavor_profiles = EXCLUDED.flavor_profiles,
                    cooking_methods = EXCLUDED.cooking_methods,
                    cuisine_type = EXCLUDED.cuisine_type,
                    dietary_attrs = EXCLUDED.dietary_attrs,
                    dish_type = EXCLUDED.dish_type,
                    updated_at = now()
                "#,
            )
            .bind(&dish.normalized_key)
            .bind(&dish.source_name)
            .bind(&dish.ingredients)
            .bind(&dish.embedding)
            .bind(&dish.flavor_profiles)
            .bind(&dish.cooking_methods)
            .bind(&dish.cuisine_type)
            .bind(&dish.dietary_attrs)
            .bind(dish.dish_type.as_str())
            .execute(&self.pool)
            .await?;
        }

        tracing::info!(count = dishes.len(), "Dishes upserted to catalog");

        Ok(())
    }

    async fn upsert_daily_menu(
        &self,
        date: NaiveDate,
        entries: &[DailyMenuEntry],
    ) -> AppResult<()> {
        for entry in entries {
            sqlx::query(
                r#"
                INSERT INTO daily_menus (menu_date, dish_key, eatery, bucket)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (menu_date, dish_key, eatery, bucket) DO NOTHING
                "#,
            )
            .bind(date)
            .bind(&entry.dish_key)
            .bind(&entry.eatery)
            .bind(entry.bucket.as_str())
            .execute(&self.pool)
            .await?;
        }

        tracing::info!(date = %date, entries = entries.len(), "Daily menu recorded");

        Ok(())
    }

    async fn main_dishes_with_embeddings(&self) -> AppResult<Vec<Dish>> {
        let rows = sqlx::query(&format!(
            "SELECT {DISH_COLUMNS} FROM dishes \
             WHERE dish_type = 'main' AND embedding IS NOT NULL"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::dish_from_row).collect()
    }

    async fn set_onboarding_flags(&self, selected: &[String]) -> AppResult<()> {
        sqlx::query("UPDATE dishes SET is_onboarding_dish = (normalized_key = ANY($1))")
            .bind(selected)
            .execute(&self.pool)
            .await?;

        tracing::info!(selected = selected.len(), "Onboarding dish flags updated");

        Ok(())
    }
}
