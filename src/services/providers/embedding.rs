/// HTTP embedding collaborator (OpenAI-compatible `/embeddings` endpoint)
///
/// Embeds a dish's resolved ingredient list into a 300-dim vector. A
/// response with the wrong dimensionality is a validation failure and is
/// discarded rather than stored; transient failures are retried with
/// exponential backoff.
use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    models::EMBEDDING_DIM,
    services::providers::Embedder,
};

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
}

#[derive(Clone)]
pub struct HttpEmbedder {
    http_client: HttpClient,
    endpoint: String,
    api_key: String,
    model: String,
    max_retries: u32,
}

impl HttpEmbedder {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
        max_retries: u32,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));

        Ok(Self {
            http_client,
            endpoint,
            api_key,
            model,
            max_retries,
        })
    }

    fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn backoff(attempt: u32) -> Duration {
        Duration::from_millis(250 * 2u64.pow(attempt.min(6)))
    }
}

#[async_trait::async_trait]
impl Embedder for HttpEmbedder {
    async fn embed_ingredients(&self, ingredients: &[String]) -> AppResult<Option<Vec<f32>>> {
        if ingredients.is_empty() {
            return Ok(None);
        }

        let input = ingredients.join(", ");

        let mut attempt = 0;
        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                input: &input,
            };

            let response = self
                .http_client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp.json().await?;
                        let Some(entry) = parsed.data.into_iter().next() else {
                            return Ok(None);
                        };

                        if entry.embedding.len() != EMBEDDING_DIM {
                            return Err(AppError::Validation(format!(
                                "embedding has {} dimensions, expected {}",
                                entry.embedding.len(),
                                EMBEDDING_DIM
                            )));
                        }

                        return Ok(Some(entry.embedding));
                    }

                    let body = resp.text().await.unwrap_or_default();
                    if Self::is_retryable(status) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!(
                            status = %status,
                            attempt,
                            "Embedding request failed, retrying"
                        );
                        tokio::time::sleep(Self::backoff(attempt)).await;
                        continue;
                    }

                    return Err(AppError::ExternalApi(format!(
                        "Embedding API returned status {}: {}",
                        status, body
                    )));
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!(error = %e, attempt, "Embedding request error, retrying");
                        tokio::time::sleep(Self::backoff(attempt)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}
