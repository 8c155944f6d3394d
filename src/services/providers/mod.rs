/// External collaborator abstractions
///
/// The engine treats attribute extraction, ingredient embedding, and
/// cold-start ranking as black-box collaborators behind async traits, so the
/// scoring pipeline can be exercised in tests with mocks and the daily job
/// can wire in hosted implementations. All implementations carry their own
/// timeout and retry-with-backoff parameters; callers choose sequential or
/// parallel batch execution.
use crate::{
    error::AppResult,
    models::{DailyMenu, DishAttributes},
};

pub mod embedding;
pub mod groq;

pub use embedding::HttpEmbedder;
pub use groq::GroqClient;

/// Extracts structured attributes from raw dish names
///
/// Output is aligned with the input order; a name the collaborator could not
/// annotate yields an empty attribute set at its position rather than a
/// shorter batch.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait AttributeExtractor: Send + Sync {
    async fn extract_batch(&self, source_names: &[String]) -> AppResult<Vec<DishAttributes>>;
}

/// Embeds an ingredient token list into a fixed-length vector
///
/// Embeddings are a function of ingredients, not of the raw dish name: two
/// differently-named dishes with identical ingredient sets receive the same
/// vector. `Ok(None)` is the failure sentinel for "nothing embeddable".
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_ingredients(&self, ingredients: &[String]) -> AppResult<Option<Vec<f32>>>;
}

/// Ranks a full day's menu for users with no derivable preference signal
///
/// Returns the collaborator's raw JSON; the cold-start resolver owns
/// validation and never trusts this output directly.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ColdStartRanker: Send + Sync {
    async fn rank_menu(&self, menu: &DailyMenu) -> AppResult<serde_json::Value>;
}
