/// Hosted LLM provider (OpenAI-compatible chat completions)
///
/// Serves two collaborator roles: attribute extraction for new dishes and
/// cold-start ranking for users without preference signal. Both use the JSON
/// response format and are retried with exponential backoff on transient
/// failure; extraction exhausting its retries degrades to empty attribute
/// sets so the run never aborts.
use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{AppError, AppResult},
    models::{DailyMenu, DishAttributes},
    services::providers::{AttributeExtractor, ColdStartRanker},
};

const EXTRACTION_PROMPT: &str = r#"You are a culinary expert. Given a JSON list of dish names, extract attributes for each dish as a JSON object mapping dish name to an object with these fields:

- "ingredients": array of lowercase ingredient names (proteins, vegetables, grains, sauces, spices). Keep 1-2 words each.
- "flavor_profiles": array from: savory, sweet, spicy, sour, umami, mild, smoky, tangy, rich, fresh
- "cooking_methods": array from: fried, grilled, baked, steamed, stir-fried, roasted, braised, raw, sauteed, smoked
- "cuisine_type": one of: chinese, japanese, korean, indian, mexican, italian, american, mediterranean, thai, vietnamese, french, middle-eastern, other
- "dietary_attrs": array from: vegetarian, vegan, gluten-free, dairy-free, halal, contains-nuts, contains-shellfish, contains-dairy, contains-egg, contains-gluten, contains-meat, contains-pork, contains-alcohol (only include if clearly applicable)
- "dish_type": one of: main, side, condiment, beverage, dessert

Return ONLY the JSON object, no other text."#;

const COLD_START_PROMPT: &str = r#"You are a campus dining assistant choosing today's best eatery picks for a student with no recorded taste history. You receive the day's menus as JSON: for each meal bucket (breakfast_brunch, lunch, dinner) a list of eateries with their menu items.

Pick up to 4 eateries per meal bucket, best first, favoring variety and broadly appealing dishes. For each pick list up to 5 standout dishes taken verbatim from that eatery's items.

Respond with ONLY a JSON object of the form:
{"breakfast_brunch": {"picks": [{"eatery": "...", "dishes": ["..."]}]}, "lunch": {...}, "dinner": {...}}

Use only eatery names and dish names that appear in the provided menus."#;

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct GroqClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
    max_retries: u32,
}

impl GroqClient {
    pub fn new(
        api_key: String,
        api_url: String,
        model: String,
        timeout: Duration,
        max_retries: u32,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url,
            model,
            max_retries,
        })
    }

    fn is_retryable(status: StatusCode) -> bool {
        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    fn backoff(attempt: u32) -> Duration {
        Duration::from_millis(500 * 2u64.pow(attempt.min(5)))
    }

    /// One chat completion returning parsed JSON, retried on transient failure
    async fn chat_json(
        &self,
        system_prompt: &str,
        user_content: &str,
        temperature: Option<f32>,
    ) -> AppResult<Value> {
        let url = format!("{}/chat/completions", self.api_url.trim_end_matches('/'));

        let mut attempt = 0;
        loop {
            let request = ChatRequest {
                model: &self.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: system_prompt,
                    },
                    ChatMessage {
                        role: "user",
                        content: user_content,
                    },
                ],
                response_format: ResponseFormat {
                    format_type: "json_object",
                },
                temperature,
            };

            let response = self
                .http_client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&request)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: ChatResponse = resp.json().await?;
                        let content = parsed
                            .choices
                            .first()
                            .and_then(|c| c.message.content.as_deref())
                            .ok_or_else(|| {
                                AppError::ExternalApi("LLM returned empty response".to_string())
                            })?;

                        return serde_json::from_str(content).map_err(|e| {
                            AppError::Validation(format!("LLM returned non-JSON content: {}", e))
                        });
                    }

                    let body = resp.text().await.unwrap_or_default();
                    if Self::is_retryable(status) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!(
                            status = %status,
                            attempt,
                            "LLM request failed, retrying"
                        );
                        tokio::time::sleep(Self::backoff(attempt)).await;
                        continue;
                    }

                    return Err(AppError::ExternalApi(format!(
                        "LLM API returned status {}: {}",
                        status, body
                    )));
                }
                Err(e) => {
                    if (e.is_timeout() || e.is_connect()) && attempt < self.max_retries {
                        attempt += 1;
                        tracing::warn!(error = %e, attempt, "LLM request error, retrying");
                        tokio::time::sleep(Self::backoff(attempt)).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }

    /// Pulls one dish's attributes out of the response map, tolerating the
    /// legacy shape where the model returns a bare ingredient array
    fn attrs_from_value(value: Option<&Value>) -> DishAttributes {
        match value {
            Some(Value::Array(ingredients)) => DishAttributes {
                ingredients: ingredients
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect(),
                ..DishAttributes::default()
            },
            Some(obj @ Value::Object(_)) => {
                serde_json::from_value(obj.clone()).unwrap_or_default()
            }
            _ => DishAttributes::default(),
        }
    }
}

#[async_trait::async_trait]
impl AttributeExtractor for GroqClient {
    async fn extract_batch(&self, source_names: &[String]) -> AppResult<Vec<DishAttributes>> {
        if source_names.is_empty() {
            return Ok(Vec::new());
        }

        let user_content = serde_json::to_string(source_names)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        let parsed = self
            .chat_json(EXTRACTION_PROMPT, &user_content, Some(0.1))
            .await?;

        let batch: Vec<DishAttributes> = source_names
            .iter()
            .map(|name| Self::attrs_from_value(parsed.get(name)))
            .collect();

        tracing::info!(
            requested = source_names.len(),
            annotated = batch.iter().filter(|a| !a.ingredients.is_empty()).count(),
            "Attribute extraction batch completed"
        );

        Ok(batch)
    }
}

#[async_trait::async_trait]
impl ColdStartRanker for GroqClient {
    async fn rank_menu(&self, menu: &DailyMenu) -> AppResult<Value> {
        let payload = serde_json::json!({
            "date_local": menu.menu_date,
            "meals": menu.meals,
        });

        let user_content = format!(
            "Choose winners for today. Data:\n{}",
            serde_json::to_string(&payload).map_err(|e| AppError::Internal(e.to_string()))?
        );

        self.chat_json(COLD_START_PROMPT, &user_content, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attrs_from_object_value() {
        let value = serde_json::json!({
            "ingredients": ["chicken", "chili"],
            "flavor_profiles": ["sweet", "spicy"],
            "cooking_methods": ["fried"],
            "cuisine_type": "chinese",
            "dietary_attrs": [],
            "dish_type": "main"
        });

        let attrs = GroqClient::attrs_from_value(Some(&value));
        assert_eq!(attrs.ingredients, vec!["chicken", "chili"]);
        assert_eq!(attrs.cuisine_type.as_deref(), Some("chinese"));
    }

    #[test]
    fn test_attrs_from_bare_array_value() {
        let value = serde_json::json!(["potato", "oil", "salt"]);
        let attrs = GroqClient::attrs_from_value(Some(&value));
        assert_eq!(attrs.ingredients, vec!["potato", "oil", "salt"]);
        assert!(attrs.flavor_profiles.is_empty());
    }

    #[test]
    fn test_attrs_from_missing_value() {
        let attrs = GroqClient::attrs_from_value(None);
        assert!(attrs.ingredients.is_empty());
        assert!(attrs.cuisine_type.is_none());
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(GroqClient::backoff(1), Duration::from_millis(1000));
        assert_eq!(GroqClient::backoff(5), Duration::from_millis(16000));
        assert_eq!(GroqClient::backoff(12), Duration::from_millis(16000));
    }
}
