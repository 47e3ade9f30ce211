//! In-memory vector store implementation.
//!
//! Useful for testing and small datasets.

use super::{cosine_similarity, rank, ChunkFilter, Course, CourseChunk, ScoredChunk, VectorStore};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// In-memory vector store.
pub struct MemoryVectorStore {
    courses: RwLock<BTreeMap<String, Course>>,
    chunks: RwLock<HashMap<String, CourseChunk>>,
}

fn poisoned<T>(_: T) -> LecternError {
    LecternError::VectorStore("lock poisoned".to_string())
}

impl MemoryVectorStore {
    /// Create a new in-memory vector store.
    pub fn new() -> Self {
        Self {
            courses: RwLock::new(BTreeMap::new()),
            chunks: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn upsert_course(&self, course: &Course) -> Result<()> {
        let mut courses = self.courses.write().map_err(poisoned)?;
        courses.insert(course.title.clone(), course.clone());
        Ok(())
    }

    async fn upsert_chunks(&self, chunks: &[CourseChunk]) -> Result<usize> {
        let mut store = self.chunks.write().map_err(poisoned)?;
        for chunk in chunks {
            store.insert(chunk.id.to_string(), chunk.clone());
        }
        Ok(chunks.len())
    }

    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
        filter: &ChunkFilter,
    ) -> Result<Vec<ScoredChunk>> {
        let chunks = self.chunks.read().map_err(poisoned)?;

        let results: Vec<ScoredChunk> = chunks
            .values()
            .filter(|chunk| filter.matches(chunk))
            .map(|chunk| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query_embedding, &chunk.embedding),
            })
            .filter(|r| r.score >= min_score)
            .collect();

        Ok(rank(results, limit))
    }

    async fn list_courses(&self) -> Result<Vec<Course>> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(courses.values().cloned().collect())
    }

    async fn get_course(&self, title: &str) -> Result<Option<Course>> {
        let courses = self.courses.read().map_err(poisoned)?;
        Ok(courses.get(title).cloned())
    }

    async fn chunk_count(&self) -> Result<usize> {
        let chunks = self.chunks.read().map_err(poisoned)?;
        Ok(chunks.len())
    }
}
