use std::sync::Arc;
use std::time::Duration;

use campus_picks::{
    db::{self, PgCatalogStore, PgPreferenceStore},
    models::DailyMenu,
    services::providers::{GroqClient, HttpEmbedder},
    Config, RecommendationEngine,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_picks=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let timeout = Duration::from_secs(config.request_timeout_secs);

    let pool = db::create_pool(&config.database_url).await?;
    let catalog = Arc::new(PgCatalogStore::new(pool.clone()));
    let preferences = Arc::new(PgPreferenceStore::new(pool));

    let llm = Arc::new(GroqClient::new(
        config.llm_api_key.clone(),
        config.llm_api_url.clone(),
        config.llm_model.clone(),
        timeout,
        config.max_retries,
    )?);
    let embedder = Arc::new(HttpEmbedder::new(
        config.embedding_api_key.clone(),
        config.embedding_api_url.clone(),
        config.embedding_model.clone(),
        timeout,
        config.max_retries,
    )?);

    let engine = RecommendationEngine::new(
        catalog,
        preferences,
        llm.clone(),
        embedder,
        llm,
        config.resolver_concurrency,
    );

    let menu_json = tokio::fs::read_to_string(&config.menu_path).await?;
    let menu: DailyMenu = serde_json::from_str(&menu_json)?;

    let recommendations = engine.run(&menu).await?;

    println!("{}", serde_json::to_string_pretty(&recommendations)?);

    Ok(())
}
