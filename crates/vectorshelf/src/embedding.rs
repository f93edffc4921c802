//! Concrete [`EmbeddingProvider`] implementations.
//!
//! - [`MockEmbedder`] — deterministic, hash-derived vectors; no network,
//!   used by default and throughout the test suite.
//! - [`OpenAiEmbedder`] — calls `POST {base_url}/embeddings`, retrying 429
//!   and 5xx responses with exponential backoff (1s, 2s, 4s, ... capped at
//!   32s), failing immediately on other 4xx responses.

use std::time::Duration;

use async_trait::async_trait;
use vectorshelf_core::EmbeddingProvider;

use crate::config::EmbeddingProviderConfig;

const MAX_RETRIES: u32 = 5;

/// Deterministic embedder: every text hashes to the same vector every run,
/// with no external calls. Distinct inputs land in different directions
/// often enough to exercise search without a real model.
pub struct MockEmbedder {
    dims: usize,
}

impl MockEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        Ok(texts.iter().map(|t| hash_embed(t, self.dims)).collect())
    }
}

/// FNV-1a over the text, expanded into `dims` pseudo-random components by
/// re-hashing the running state once per dimension.
fn hash_embed(text: &str, dims: usize) -> Vec<f32> {
    let mut state: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in text.bytes() {
        state ^= byte as u64;
        state = state.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (0..dims)
        .map(|i| {
            state = state.wrapping_mul(0x2545_f491_4f6c_dd1d).wrapping_add(i as u64);
            ((state >> 40) as f32 / (1u64 << 24) as f32) - 1.0
        })
        .collect()
}

pub struct OpenAiEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingProviderConfig) -> Result<Self, String> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| "embedding_provider.api_key is required for kind = \"openai\"".to_string())?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, String> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let mut last_err = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(format!("{}/embeddings", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let json: serde_json::Value =
                            response.json().await.map_err(|e| e.to_string())?;
                        return parse_response(&json);
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        let text = response.text().await.unwrap_or_default();
                        last_err = Some(format!("embedding provider error {status}: {text}"));
                        continue;
                    }
                    let text = response.text().await.unwrap_or_default();
                    return Err(format!("embedding provider error {status}: {text}"));
                }
                Err(e) => {
                    last_err = Some(e.to_string());
                    continue;
                }
            }
        }
        Err(last_err.unwrap_or_else(|| "embedding request failed after retries".to_string()))
    }
}

fn parse_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, String> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or("malformed embedding response: missing data array")?;

    data.iter()
        .map(|item| {
            item.get("embedding")
                .and_then(|e| e.as_array())
                .map(|arr| arr.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect())
                .ok_or_else(|| "malformed embedding response: missing embedding".to_string())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_embedder_is_deterministic() {
        let embedder = MockEmbedder::new(8);
        let a = embedder.embed(&["hello".to_string()]).await.unwrap();
        let b = embedder.embed(&["hello".to_string()]).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn mock_embedder_respects_requested_dims() {
        let embedder = MockEmbedder::new(16);
        let out = embedder.embed(&["x".into(), "y".into()]).await.unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|v| v.len() == 16));
    }

    #[tokio::test]
    async fn mock_embedder_distinct_texts_differ() {
        let embedder = MockEmbedder::new(8);
        let out = embedder
            .embed(&["alpha".to_string(), "beta".to_string()])
            .await
            .unwrap();
        assert_ne!(out[0], out[1]);
    }

    #[test]
    fn openai_embedder_requires_api_key() {
        let config = EmbeddingProviderConfig {
            kind: "openai".into(),
            api_key: None,
            model: "text-embedding-3-small".into(),
            base_url: "https://api.openai.com/v1".into(),
            dimensions: 32,
        };
        assert!(OpenAiEmbedder::new(&config).is_err());
    }
}
