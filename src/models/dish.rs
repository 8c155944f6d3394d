use serde::{Deserialize, Serialize};

/// Dimension of dish embedding vectors
pub const EMBEDDING_DIM: usize = 300;

/// Tag vocabularies enforced on collaborator output. Out-of-vocabulary tags
/// are dropped rather than stored.
pub const VALID_FLAVORS: &[&str] = &[
    "savory", "sweet", "spicy", "sour", "umami", "mild", "smoky", "tangy", "rich", "fresh",
];
pub const VALID_METHODS: &[&str] = &[
    "fried",
    "grilled",
    "baked",
    "steamed",
    "stir-fried",
    "roasted",
    "braised",
    "raw",
    "sauteed",
    "smoked",
];
pub const VALID_CUISINES: &[&str] = &[
    "chinese",
    "japanese",
    "korean",
    "indian",
    "mexican",
    "italian",
    "american",
    "mediterranean",
    "thai",
    "vietnamese",
    "french",
    "middle-eastern",
    "other",
];

/// Coarse dish category used for display filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DishType {
    Main,
    Side,
    Condiment,
    Beverage,
    Dessert,
}

impl Default for DishType {
    fn default() -> Self {
        DishType::Main
    }
}

impl DishType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DishType::Main => "main",
            DishType::Side => "side",
            DishType::Condiment => "condiment",
            DishType::Beverage => "beverage",
            DishType::Dessert => "dessert",
        }
    }

    /// Parses a stored or extracted dish type, defaulting to main
    pub fn parse(value: &str) -> Self {
        match value {
            "side" => DishType::Side,
            "condiment" => DishType::Condiment,
            "beverage" => DishType::Beverage,
            "dessert" => DishType::Dessert,
            _ => DishType::Main,
        }
    }
}

/// Structured attributes produced by the extraction collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DishAttributes {
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub flavor_profiles: Vec<String>,
    #[serde(default)]
    pub cooking_methods: Vec<String>,
    #[serde(default)]
    pub cuisine_type: Option<String>,
    #[serde(default)]
    pub dietary_attrs: Vec<String>,
    #[serde(default)]
    pub dish_type: Option<String>,
}

/// Attribute set after vocabulary validation, with defaults filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedAttributes {
    pub ingredients: Vec<String>,
    pub flavor_profiles: Vec<String>,
    pub cooking_methods: Vec<String>,
    pub cuisine_type: String,
    pub dietary_attrs: Vec<String>,
    pub dish_type: DishType,
}

impl DishAttributes {
    /// Sanitizes raw collaborator output against the tag vocabularies.
    ///
    /// Unknown flavor/method tags are dropped, unknown cuisines fall back to
    /// "other", unknown dish types to main. Ingredients are lowercased and
    /// trimmed.
    pub fn validated(self) -> ValidatedAttributes {
        let ingredients = self
            .ingredients
            .into_iter()
            .map(|i| i.trim().to_lowercase())
            .filter(|i| !i.is_empty())
            .collect();

        let flavor_profiles = self
            .flavor_profiles
            .into_iter()
            .filter(|f| VALID_FLAVORS.contains(&f.as_str()))
            .collect();

        let cooking_methods = self
            .cooking_methods
            .into_iter()
            .filter(|m| VALID_METHODS.contains(&m.as_str()))
            .collect();

        let cuisine_type = match self.cuisine_type {
            Some(c) if VALID_CUISINES.contains(&c.as_str()) => c,
            _ => "other".to_string(),
        };

        let dish_type = self
            .dish_type
            .as_deref()
            .map(DishType::parse)
            .unwrap_or_default();

        ValidatedAttributes {
            ingredients,
            flavor_profiles,
            cooking_methods,
            cuisine_type,
            dietary_attrs: self.dietary_attrs,
            dish_type,
        }
    }
}

impl ValidatedAttributes {
    /// Best-effort defaults used when extraction fails for a batch
    pub fn fallback() -> Self {
        ValidatedAttributes {
            ingredients: Vec::new(),
            flavor_profiles: Vec::new(),
            cooking_methods: Vec::new(),
            cuisine_type: "other".to_string(),
            dietary_attrs: Vec::new(),
            dish_type: DishType::Main,
        }
    }
}

/// Canonical catalog entry for a dish
///
/// Identity is the `normalized_key`; two raw names that normalize to the
/// same key are the same dish, first writer claiming the key. The embedding
/// is absent until the resolver has obtained one; a dish without an
/// embedding contributes a zero score to hybrid ranking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dish {
    pub normalized_key: String,
    pub source_name: String,
    pub ingredients: Vec<String>,
    pub embedding: Option<Vec<f32>>,
    pub flavor_profiles: Vec<String>,
    pub cooking_methods: Vec<String>,
    pub cuisine_type: String,
    /// Empty set means unknown/unchecked, not "none"
    pub dietary_attrs: Vec<String>,
    pub dish_type: DishType,
}

impl Dish {
    /// Builds a catalog entry from resolved attributes
    pub fn from_attributes(
        normalized_key: String,
        source_name: String,
        attrs: ValidatedAttributes,
        embedding: Option<Vec<f32>>,
    ) -> Self {
        Dish {
            normalized_key,
            source_name,
            ingredients: attrs.ingredients,
            embedding,
            flavor_profiles: attrs.flavor_profiles,
            cooking_methods: attrs.cooking_methods,
            cuisine_type: attrs.cuisine_type,
            dietary_attrs: attrs.dietary_attrs,
            dish_type: attrs.dish_type,
        }
    }

    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// True when attribute extraction has never succeeded for this dish
    pub fn needs_attribute_backfill(&self) -> bool {
        self.flavor_profiles.is_empty() && self.ingredients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validated_drops_unknown_tags() {
        let attrs = DishAttributes {
            ingredients: vec![" Chicken ".to_string(), "".to_string()],
            flavor_profiles: vec!["savory".to_string(), "crunchy".to_string()],
            cooking_methods: vec!["fried".to_string(), "microwaved".to_string()],
            cuisine_type: Some("martian".to_string()),
            dietary_attrs: vec!["vegetarian".to_string()],
            dish_type: Some("entree".to_string()),
        };

        let validated = attrs.validated();
        assert_eq!(validated.ingredients, vec!["chicken"]);
        assert_eq!(validated.flavor_profiles, vec!["savory"]);
        assert_eq!(validated.cooking_methods, vec!["fried"]);
        assert_eq!(validated.cuisine_type, "other");
        assert_eq!(validated.dish_type, DishType::Main);
    }

    #[test]
    fn test_validated_keeps_known_values() {
        let attrs = DishAttributes {
            ingredients: vec!["tofu".to_string(), "noodles".to_string()],
            flavor_profiles: vec!["savory".to_string(), "umami".to_string()],
            cooking_methods: vec!["stir-fried".to_string()],
            cuisine_type: Some("chinese".to_string()),
            dietary_attrs: vec!["vegetarian".to_string()],
            dish_type: Some("main".to_string()),
        };

        let validated = attrs.validated();
        assert_eq!(validated.cuisine_type, "chinese");
        assert_eq!(validated.dish_type, DishType::Main);
        assert_eq!(validated.dietary_attrs, vec!["vegetarian"]);
    }

    #[test]
    fn test_fallback_defaults() {
        let fallback = ValidatedAttributes::fallback();
        assert!(fallback.ingredients.is_empty());
        assert_eq!(fallback.cuisine_type, "other");
        assert_eq!(fallback.dish_type, DishType::Main);
    }

    #[test]
    fn test_dish_type_parse_round_trip() {
        for value in ["main", "side", "condiment", "beverage", "dessert"] {
            assert_eq!(DishType::parse(value).as_str(), value);
        }
        assert_eq!(DishType::parse("unknown"), DishType::Main);
    }

    #[test]
    fn test_needs_attribute_backfill() {
        let mut dish = Dish::from_attributes(
            "plain rice".to_string(),
            "Plain Rice".to_string(),
            ValidatedAttributes::fallback(),
            None,
        );
        assert!(dish.needs_attribute_backfill());

        dish.ingredients = vec!["rice".to_string()];
        assert!(!dish.needs_attribute_backfill());
    }
}
