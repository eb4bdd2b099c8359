//! Text embeddings via an OpenAI-compatible `/embeddings` endpoint.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use intake_core::{AppError, Config};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::llm::{api_error_message, external, LlmSettings};

const SERVICE: &str = "embedding";

/// Produces one vector per input text, in input order.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Dimensionality of every returned vector.
    fn dimension(&self) -> usize;

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError>;
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: usize,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Restore input order and check count and dimension of a batch response.
fn order_batch(mut data: Vec<EmbeddingData>, expected: usize, dim: usize) -> Result<Vec<Vec<f32>>> {
    if data.len() != expected {
        return Err(anyhow!(
            "expected {} embeddings, got {}",
            expected,
            data.len()
        ));
    }
    data.sort_by_key(|d| d.index);
    data.into_iter()
        .enumerate()
        .map(|(i, d)| {
            if d.index != i {
                return Err(anyhow!("missing embedding for input {}", i));
            }
            if d.embedding.len() != dim {
                return Err(anyhow!(
                    "embedding {} has dimension {}, expected {}",
                    i,
                    d.embedding.len(),
                    dim
                ));
            }
            Ok(d.embedding)
        })
        .collect()
}

#[derive(Clone)]
pub struct OpenAiEmbeddings {
    settings: LlmSettings,
    dimension: usize,
    batch_size: usize,
    client: reqwest::Client,
}

impl OpenAiEmbeddings {
    pub fn new(settings: LlmSettings, dimension: usize, batch_size: usize) -> Result<Self> {
        let client = settings.http_client()?;
        Ok(Self {
            settings,
            dimension,
            batch_size: batch_size.max(1),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = LlmSettings {
            base_url: config.embedding_base_url().to_string(),
            api_key: config.embedding_api_key().map(str::to_string),
            model: config.embedding_model().to_string(),
            timeout: Duration::from_secs(config.http_client_timeout_secs()),
        };
        Self::new(
            settings,
            config.embedding_dim(),
            config.embedding_batch_size(),
        )
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.settings.base_url.trim_end_matches('/'))
    }

    async fn embed_batch(&self, batch: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingRequest {
            model: &self.settings.model,
            input: batch,
            dimensions: self.dimension,
        };

        let mut request = self.client.post(self.embeddings_url()).json(&body);
        if let Some(key) = &self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("Failed to send embeddings request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Embeddings API failed with status {}: {}",
                status,
                api_error_message(&error_text)
            ));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embeddings response")?;

        order_batch(parsed.data, batch.len(), self.dimension)
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[tracing::instrument(skip(self, texts), fields(model = %self.settings.model, texts = texts.len()))]
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let embedded = self
                .embed_batch(batch)
                .await
                .map_err(|e| external(SERVICE, e))?;
            vectors.extend(embedded);
        }
        Ok(vectors)
    }
}
