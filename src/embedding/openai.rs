//! Embeddings through the OpenAI API.

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{LecternError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Passages per embeddings request.
const BATCH_SIZE: usize = 100;

pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Embedder for `model`, truncated to `dimensions` by the API.
    pub fn new(model: &str, dimensions: usize) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            dimensions,
        })
    }

    pub fn from_settings(settings: &EmbeddingSettings) -> Result<Self> {
        Self::new(&settings.model, settings.dimensions as usize)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn request(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let expected = inputs.len();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(EmbeddingInput::StringArray(inputs))
            .dimensions(self.dimensions as u32)
            .build()
            .map_err(|e| LecternError::Embedding(format!("Failed to build request: {}", e)))?;

        let mut data = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| LecternError::OpenAI(format!("Embedding API error: {}", e)))?
            .data;

        if data.len() != expected {
            return Err(LecternError::Embedding(format!(
                "Expected {} embeddings, got {}",
                expected,
                data.len()
            )));
        }

        // Response order is not guaranteed
        data.sort_by_key(|e| e.index);
        data.into_iter()
            .map(|e| check_dimensions(e.embedding, self.dimensions))
            .collect()
    }
}

/// Reject vectors that could not be compared with the stored chunks.
fn check_dimensions(vector: Vec<f32>, expected: usize) -> Result<Vec<f32>> {
    if vector.len() == expected {
        Ok(vector)
    } else {
        Err(LecternError::Embedding(format!(
            "Embedding has {} dimensions, store expects {}",
            vector.len(),
            expected
        )))
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.request(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| LecternError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, passages), fields(count = passages.len()))]
    async fn embed_passages(&self, passages: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(passages.len());
        for batch in passages.chunks(BATCH_SIZE) {
            vectors.extend(self.request(batch.to_vec()).await?);
        }
        debug!(model = %self.model, "Embedded {} passages", vectors.len());
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedder_from_settings() {
        let settings = EmbeddingSettings {
            model: "text-embedding-3-small".to_string(),
            dimensions: 512,
        };
        let embedder = OpenAIEmbedder::from_settings(&settings).unwrap();
        assert_eq!(embedder.dimensions(), 512);
        assert_eq!(embedder.model(), "text-embedding-3-small");
    }

    #[test]
    fn test_dimension_mismatch() {
        assert!(check_dimensions(vec![0.0; 4], 4).is_ok());
        let err = check_dimensions(vec![0.0; 3], 4).unwrap_err();
        assert!(err.to_string().contains("store expects 4"));
    }

    #[tokio::test]
    async fn test_empty_passages_skip_the_api() {
        let embedder = OpenAIEmbedder::new("text-embedding-3-small", 8).unwrap();
        assert!(embedder.embed_passages(&[]).await.unwrap().is_empty());
    }
}
