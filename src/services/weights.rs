/// Hybrid score weights, tiered by rating-count confidence
///
/// Confidence in the learned embedding-space preference grows with rating
/// count, so the cosine weight rises while the categorical-tag weights,
/// which mainly compensate early sparsity, fall.

/// Fewer than 15 ratings: lean on categorical tags
pub const COLD_START_WEIGHTS: ScoreWeights = ScoreWeights {
    cosine: 0.40,
    flavor: 0.20,
    method: 0.15,
    cuisine: 0.25,
};

/// 15-39 ratings: embedding signal starting to dominate
pub const MID_CONFIDENCE_WEIGHTS: ScoreWeights = ScoreWeights {
    cosine: 0.60,
    flavor: 0.13,
    method: 0.09,
    cuisine: 0.18,
};

/// 40+ ratings: trust the learned preference vector
pub const HIGH_CONFIDENCE_WEIGHTS: ScoreWeights = ScoreWeights {
    cosine: 0.75,
    flavor: 0.08,
    method: 0.07,
    cuisine: 0.10,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub cosine: f64,
    pub flavor: f64,
    pub method: f64,
    pub cuisine: f64,
}

impl ScoreWeights {
    pub fn sum(&self) -> f64 {
        self.cosine + self.flavor + self.method + self.cuisine
    }
}

/// Selects the weight tier for a user's total rating count
pub fn weights_for_rating_count(rating_count: usize) -> ScoreWeights {
    match rating_count {
        0..=14 => COLD_START_WEIGHTS,
        15..=39 => MID_CONFIDENCE_WEIGHTS,
        _ => HIGH_CONFIDENCE_WEIGHTS,
    }
}
