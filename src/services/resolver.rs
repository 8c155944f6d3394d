/// Attribute/embedding resolution for new dishes
///
/// Runs once per dish per run: only cache misses (and dishes whose attribute
/// extraction never succeeded) are submitted. Batches amortize collaborator
/// round-trips; batches run concurrently behind a semaphore because the
/// calls are independent, with no shared mutable state beyond the catalog's
/// idempotent upserts. A batch whose extraction fails degrades to default
/// attributes; a dish whose embedding cannot be obtained is stored without
/// one and scores 0 in hybrid ranking. The whole pass is safe to retry.
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::{
    db::CatalogStore,
    error::AppResult,
    models::{Dish, ValidatedAttributes},
    services::providers::{AttributeExtractor, Embedder},
};

/// Dishes per extraction call, bounded to stay within collaborator token limits
pub const EXTRACTION_BATCH_SIZE: usize = 10;

/// A dish the catalog does not know yet (or knows without attributes)
#[derive(Debug, Clone, PartialEq)]
pub struct PendingDish {
    pub normalized_key: String,
    pub source_name: String,
}

pub struct DishResolver {
    catalog: Arc<dyn CatalogStore>,
    extractor: Arc<dyn AttributeExtractor>,
    embedder: Arc<dyn Embedder>,
    concurrency: usize,
}

impl DishResolver {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        extractor: Arc<dyn AttributeExtractor>,
        embedder: Arc<dyn Embedder>,
        concurrency: usize,
    ) -> Self {
        Self {
            catalog,
            extractor,
            embedder,
            concurrency: concurrency.max(1),
        }
    }

    /// Resolves a batch of pending dishes into the catalog
    ///
    /// Returns the number of dishes written. A failed chunk is logged and
    /// skipped; its dishes stay unresolved and are retried on the next run.
    pub async fn resolve(&self, pending: Vec<PendingDish>) -> AppResult<usize> {
        if pending.is_empty() {
            return Ok(0);
        }

        tracing::info!(count = pending.len(), "Resolving dish attributes and embeddings");

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = Vec::new();

        for chunk in pending.chunks(EXTRACTION_BATCH_SIZE) {
            let chunk = chunk.to_vec();
            let catalog = Arc::clone(&self.catalog);
            let extractor = Arc::clone(&self.extractor);
            let embedder = Arc::clone(&self.embedder);
            let semaphore = Arc::clone(&semaphore);

            tasks.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("resolver semaphore closed");
                resolve_chunk(catalog, extractor, embedder, chunk).await
            }));
        }

        let mut resolved = 0;
        let mut failed_chunks = 0;

        for task in tasks {
            match task.await {
                Ok(Ok(count)) => resolved += count,
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "Dish resolution chunk failed");
                    failed_chunks += 1;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Dish resolution task join error");
                    failed_chunks += 1;
                }
            }
        }

        if failed_chunks > 0 {
            tracing::warn!(
                resolved,
                failed_chunks,
                "Partial dish resolution; unresolved dishes retry next run"
            );
        }

        Ok(resolved)
    }
}

async fn resolve_chunk(
    catalog: Arc<dyn CatalogStore>,
    extractor: Arc<dyn AttributeExtractor>,
    embedder: Arc<dyn Embedder>,
    chunk: Vec<PendingDish>,
) -> AppResult<usize> {
    let names: Vec<String> = chunk.iter().map(|d| d.source_name.clone()).collect();

    let attrs: Vec<ValidatedAttributes> = match extractor.extract_batch(&names).await {
        Ok(batch) if batch.len() == chunk.len() => {
            batch.into_iter().map(|raw| raw.validated()).collect()
        }
        Ok(batch) => {
            tracing::warn!(
                expected = chunk.len(),
                got = batch.len(),
                "Extraction batch misaligned, using defaults"
            );
            vec![ValidatedAttributes::fallback(); chunk.len()]
        }
        Err(e) => {
            tracing::warn!(error = %e, "Attribute extraction failed, using defaults");
            vec![ValidatedAttributes::fallback(); chunk.len()]
        }
    };

    let mut dishes = Vec::with_capacity(chunk.len());
    for (pending, attrs) in chunk.into_iter().zip(attrs) {
        let embedding = match embedder.embed_ingredients(&attrs.ingredients).await {
            Ok(embedding) => embedding,
            Err(e) => {
                tracing::warn!(
                    dish = %pending.normalized_key,
                    error = %e,
                    "Embedding unavailable; dish will score 0 until re-resolved"
                );
                None
            }
        };

        dishes.push(Dish::from_attributes(
            pending.normalized_key,
            pending.source_name,
            attrs,
            embedding,
        ));
    }

    catalog.upsert_batch(&dishes).await?;

    Ok(dishes.len())
}
