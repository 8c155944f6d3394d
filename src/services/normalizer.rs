/// Dish name normalization and catalog identity
///
/// The normalized key is the dish's identity: case-folded, trimmed, with
/// parenthesized garnish/translation notes stripped and internal whitespace
/// collapsed. Two distinct dishes normalizing to the same key collide by
/// policy, not by accident: whichever dish is written first claims the key.
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{db::CatalogStore, error::AppResult, models::Dish};

static PAREN_NOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^()]*\)\s*").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Derives the deterministic catalog key for a raw dish name
pub fn normalize_dish_name(name: &str) -> String {
    let stripped = PAREN_NOTES.replace_all(name, " ");
    WHITESPACE
        .replace_all(stripped.trim(), " ")
        .to_lowercase()
}

/// Result of a catalog identity check
#[derive(Debug)]
pub struct CatalogLookup {
    pub normalized_key: String,
    pub is_new: bool,
    pub dish: Option<Dish>,
}

/// Checks whether a raw dish name is already known to the catalog
///
/// Read-only: no side effects beyond the catalog read. Writing a new dish is
/// the resolver's job.
pub async fn lookup(catalog: &dyn CatalogStore, raw_name: &str) -> AppResult<CatalogLookup> {
    let normalized_key = normalize_dish_name(raw_name);
    let dish = catalog.get_by_key(&normalized_key).await?;

    Ok(CatalogLookup {
        normalized_key,
        is_new: dish.is_none(),
        dish,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockCatalogStore;
    use crate::models::{DishType, ValidatedAttributes};

    #[test]
    fn test_normalize_lowercases_and_trims() {
        assert_eq!(normalize_dish_name("  Sweet Chili Chicken  "), "sweet chili chicken");
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize_dish_name("Tofu   &\tVegetable  Lo Mein"), "tofu & vegetable lo mein");
    }

    #[test]
    fn test_normalize_strips_paren_notes() {
        assert_eq!(
            normalize_dish_name("Beef Tacos (with cilantro garnish)"),
            "beef tacos"
        );
        assert_eq!(
            normalize_dish_name("Mapo Tofu (麻婆豆腐) with Rice"),
            "mapo tofu with rice"
        );
    }

    #[test]
    fn test_garnish_variants_collide_by_design() {
        // Same dish, different garnish notes: identical keys on purpose
        let a = normalize_dish_name("Roasted Salmon (lemon)");
        let b = normalize_dish_name("Roasted  Salmon (dill) ");
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_lookup_reports_new_dish() {
        let mut catalog = MockCatalogStore::new();
        catalog
            .expect_get_by_key()
            .withf(|key| key == "beef tacos")
            .returning(|_| Ok(None));

        let result = lookup(&catalog, "Beef Tacos").await.unwrap();
        assert!(result.is_new);
        assert!(result.dish.is_none());
        assert_eq!(result.normalized_key, "beef tacos");
    }

    #[tokio::test]
    async fn test_lookup_finds_existing_dish() {
        let mut catalog = MockCatalogStore::new();
        catalog.expect_get_by_key().returning(|key| {
            Ok(Some(Dish::from_attributes(
                key.to_string(),
                "Beef Tacos".to_string(),
                ValidatedAttributes::fallback(),
                None,
            )))
        });

        let result = lookup(&catalog, "Beef Tacos").await.unwrap();
        assert!(!result.is_new);
        assert_eq!(result.dish.unwrap().dish_type, DishType::Main);
    }
}
