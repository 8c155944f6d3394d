/// Eatery-level aggregation of dish scores
///
/// Rolls per-dish scores (already dietary-filtered) into ranked eatery picks
/// for one meal bucket:
///
/// ```text
/// eatery_score = 0.85 × mean(top-3 dish scores) + 0.15 × ingredient_variety_bonus
/// ```
///
/// The variety bonus rewards eateries whose top dishes span more distinct
/// ingredient tokens, so an eatery whose "best 3" are three variations of
/// the same protein does not outrank genuinely varied kitchens.
use std::collections::{HashMap, HashSet};

use crate::models::{DishType, EateryPick};

const TOP_DISH_COUNT: usize = 3;
const MAX_EATERIES_PER_BUCKET: usize = 4;
const MAX_DISPLAY_DISHES: usize = 5;
const SCORE_WEIGHT: f64 = 0.85;
const VARIETY_WEIGHT: f64 = 0.15;

/// A dish scored for one user within one (eatery, bucket) group
#[derive(Debug, Clone)]
pub struct ScoredDish {
    pub display_name: String,
    pub score: f64,
    pub dish_type: DishType,
    pub ingredients: Vec<String>,
}

/// Distinct ingredient tokens over total tokens (with multiplicity) for the
/// given dishes; 0 when nothing is known
fn variety_bonus(dishes: &[ScoredDish]) -> f64 {
    let total: usize = dishes.iter().map(|d| d.ingredients.len()).sum();
    if total == 0 {
        return 0.0;
    }

    let distinct: HashSet<&str> = dishes
        .iter()
        .flat_map(|d| d.ingredients.iter().map(String::as_str))
        .collect();

    distinct.len() as f64 / total as f64
}

fn distinct_ingredient_count(dishes: &[ScoredDish]) -> usize {
    dishes
        .iter()
        .flat_map(|d| d.ingredients.iter().map(String::as_str))
        .collect::<HashSet<&str>>()
        .len()
}

/// Ranks the eateries of one meal bucket and selects display dishes
///
/// Returns at most 4 eateries, each with up to 5 dishes; condiment-type
/// dishes are excluded from the display list but not from scoring. Ties
/// break on total distinct-ingredient count (higher wins), then on eatery
/// name, so output is deterministic.
pub fn rank_eateries(by_eatery: HashMap<String, Vec<ScoredDish>>) -> Vec<EateryPick> {
    struct RankedEatery {
        name: String,
        score: f64,
        distinct_ingredients: usize,
        dishes: Vec<ScoredDish>,
    }

    let mut ranked: Vec<RankedEatery> = Vec::with_capacity(by_eatery.len());

    for (name, mut dishes) in by_eatery {
        if dishes.is_empty() {
            continue;
        }

        dishes.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.display_name.cmp(&b.display_name))
        });

        // Fewer than 3 scorable dishes: use what exists, no zero-padding
        let top = &dishes[..dishes.len().min(TOP_DISH_COUNT)];
        let mean = top.iter().map(|d| d.score).sum::<f64>() / top.len() as f64;
        let score = SCORE_WEIGHT * mean + VARIETY_WEIGHT * variety_bonus(top);

        ranked.push(RankedEatery {
            score,
            distinct_ingredients: distinct_ingredient_count(&dishes),
            name,
            dishes,
        });
    }

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.distinct_ingredients.cmp(&a.distinct_ingredients))
            .then_with(|| a.name.cmp(&b.name))
    });

    ranked
        .into_iter()
        .take(MAX_EATERIES_PER_BUCKET)
        .map(|eatery| EateryPick {
            eatery: eatery.name,
            dishes: eatery
                .dishes
                .iter()
                .filter(|d| d.dish_type != DishType::Condiment)
                .take(MAX_DISPLAY_DISHES)
                .map(|d| d.display_name.clone())
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(name: &str, score: f64, ingredients: &[&str]) -> ScoredDish {
        ScoredDish {
            display_name: name.to_string(),
            score,
            dish_type: DishType::Main,
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_never_more_than_four_eateries() {
        let mut by_eatery = HashMap::new();
        for i in 0..6 {
            by_eatery.insert(
                format!("Eatery {}", i),
                vec![scored("Dish", i as f64 * 0.1, &["rice"])],
            );
        }

        let picks = rank_eateries(by_eatery);
        assert_eq!(picks.len(), 4);

        let names: HashSet<&str> = picks.iter().map(|p| p.eatery.as_str()).collect();
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn test_fewer_than_three_dishes_uses_available_mean() {
        // Two dishes at 0.8 and 0.4: mean 0.6, not (0.8+0.4+0)/3
        let by_eatery = HashMap::from([(
            "Solo".to_string(),
            vec![
                scored("A", 0.8, &["beef", "onion"]),
                scored("B", 0.4, &["rice", "beans"]),
            ],
        )]);

        let picks = rank_eateries(by_eatery);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].dishes, vec!["A", "B"]);
    }

    #[test]
    fn test_variety_bonus_breaks_monotony() {
        // Identical dish scores; the varied eatery wins on the bonus term
        let monotonous = vec![
            scored("Chicken Bowl", 0.9, &["chicken"]),
            scored("Chicken Wrap", 0.9, &["chicken"]),
            scored("Chicken Plate", 0.9, &["chicken"]),
        ];
        let varied = vec![
            scored("Chicken Bowl", 0.9, &["chicken"]),
            scored("Tofu Stir Fry", 0.9, &["tofu"]),
            scored("Fish Tacos", 0.9, &["fish"]),
        ];

        let picks = rank_eateries(HashMap::from([
            ("Monotone Hall".to_string(), monotonous),
            ("Variety House".to_string(), varied),
        ]));

        assert_eq!(picks[0].eatery, "Variety House");
    }

    #[test]
    fn test_tie_breaks_on_distinct_ingredients_then_name() {
        // Identical scores and variety ratios; "Beta" has more distinct
        // ingredients overall and wins; the remaining tie is lexical
        let a = vec![scored("A", 0.5, &["rice", "beans"])];
        let b = vec![
            scored("A", 0.5, &["rice", "beans"]),
            scored("B", 0.5, &["corn", "salsa"]),
        ];

        let picks = rank_eateries(HashMap::from([
            ("Alpha".to_string(), a.clone()),
            ("Beta".to_string(), b),
            ("Gamma".to_string(), a),
        ]));

        assert_eq!(picks[0].eatery, "Beta");
        assert_eq!(picks[1].eatery, "Alpha");
        assert_eq!(picks[2].eatery, "Gamma");
    }

    #[test]
    fn test_condiments_hidden_from_display_but_scored() {
        let mut dishes = vec![
            scored("Entree", 0.6, &["beef"]),
            scored("House Salsa", 0.9, &["tomato", "onion", "chili"]),
        ];
        dishes[1].dish_type = DishType::Condiment;

        let picks = rank_eateries(HashMap::from([("Casa".to_string(), dishes)]));
        // The condiment contributed its score and variety, but is not shown
        assert_eq!(picks[0].dishes, vec!["Entree"]);
    }

    #[test]
    fn test_display_caps_at_five_dishes() {
        let dishes: Vec<ScoredDish> = (0..8)
            .map(|i| scored(&format!("Dish {}", i), 0.1 * i as f64, &["x"]))
            .collect();

        let picks = rank_eateries(HashMap::from([("Big Menu".to_string(), dishes)]));
        assert_eq!(picks[0].dishes.len(), 5);
        // Sorted by score descending
        assert_eq!(picks[0].dishes[0], "Dish 7");
    }

    #[test]
    fn test_empty_input_yields_no_picks() {
        assert!(rank_eateries(HashMap::new()).is_empty());
    }
}
