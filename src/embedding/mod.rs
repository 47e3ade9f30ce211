//! Query embeddings for passage retrieval.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Produces vectors comparable with the stored chunk embeddings.
///
/// Queries and passages share one vector space; `dimensions` must match the
/// vectors already held by the store.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed course passages, in input order.
    async fn embed_passages(&self, passages: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(passages.len());
        for passage in passages {
            vectors.push(self.embed_query(passage).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize;
}
