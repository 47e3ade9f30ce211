//! Retrieval backend for course materials.
//!
//! The tools only see the narrow [`CourseSearch`] contract. Behind it,
//! [`IndexedCourseSearch`] ranks embedded chunks held by a [`VectorStore`]
//! (SQLite or in-memory) and resolves fuzzy course names against the catalog.

mod memory;
#[cfg(test)]
pub(crate) mod mock;
mod search;
mod sqlite;

pub use memory::MemoryVectorStore;
pub use search::IndexedCourseSearch;
pub use sqlite::SqliteVectorStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A lesson entry in the course catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub lesson_number: u32,
    pub lesson_title: String,
    #[serde(default)]
    pub lesson_link: Option<String>,
}

/// Catalog metadata for one course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    /// Canonical title, unique within the catalog.
    pub title: String,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub course_link: Option<String>,
    /// Lessons in catalog order.
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    /// Find the link for a lesson by number.
    pub fn lesson_link(&self, lesson_number: u32) -> Option<&str> {
        self.lessons
            .iter()
            .find(|l| l.lesson_number == lesson_number)
            .and_then(|l| l.lesson_link.as_deref())
    }
}

/// An embedded passage of course content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseChunk {
    pub id: Uuid,
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub content: String,
    pub embedding: Vec<f32>,
    /// Position of this chunk within its course.
    pub chunk_index: i32,
    pub indexed_at: DateTime<Utc>,
}

impl CourseChunk {
    pub fn new(
        course_title: impl Into<String>,
        lesson_number: Option<u32>,
        content: impl Into<String>,
        embedding: Vec<f32>,
        chunk_index: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_title: course_title.into(),
            lesson_number,
            content: content.into(),
            embedding,
            chunk_index,
            indexed_at: Utc::now(),
        }
    }
}

/// A chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: CourseChunk,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Restricts a similarity search to one course and/or lesson.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkFilter {
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
}

impl ChunkFilter {
    pub fn matches(&self, chunk: &CourseChunk) -> bool {
        self.course_title
            .as_ref()
            .is_none_or(|t| *t == chunk.course_title)
            && self
                .lesson_number
                .is_none_or(|n| chunk.lesson_number == Some(n))
    }
}

/// Metadata attached to each search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub course_title: String,
    pub lesson_number: Option<u32>,
}

/// Outcome of a backend search: an error message, or ordered hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResults {
    pub documents: Vec<String>,
    pub metadata: Vec<ChunkMetadata>,
    pub error: Option<String>,
}

impl SearchResults {
    pub fn from_error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn push(&mut self, document: impl Into<String>, metadata: ChunkMetadata) {
        self.documents.push(document.into());
        self.metadata.push(metadata);
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Hits as (document, metadata) pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChunkMetadata)> {
        self.documents
            .iter()
            .map(String::as_str)
            .zip(self.metadata.iter())
    }
}

/// Storage for the course catalog and embedded chunks.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace a course catalog entry.
    async fn upsert_course(&self, course: &Course) -> Result<()>;

    /// Bulk upsert chunks.
    async fn upsert_chunks(&self, chunks: &[CourseChunk]) -> Result<usize>;

    /// Rank chunks passing `filter` by similarity, keeping those at or above `min_score`.
    async fn search_with_threshold(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
        filter: &ChunkFilter,
    ) -> Result<Vec<ScoredChunk>>;

    /// All catalog entries, ordered by title.
    async fn list_courses(&self) -> Result<Vec<Course>>;

    /// A single catalog entry by exact title.
    async fn get_course(&self, title: &str) -> Result<Option<Course>>;

    /// Get total chunk count.
    async fn chunk_count(&self) -> Result<usize>;
}

/// The lookups the course tools are allowed to make.
#[async_trait]
pub trait CourseSearch: Send + Sync {
    /// Search passages, optionally restricted to a (fuzzy) course name and lesson.
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults>;

    /// Resolve a partial course title to its canonical title.
    async fn resolve_course_name(&self, partial: &str) -> Result<Option<String>>;

    /// Link for a lesson of a known course.
    async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>>;

    /// Full catalog metadata.
    async fn get_all_courses_metadata(&self) -> Result<Vec<Course>>;

    /// Titles of every course in the catalog.
    async fn get_existing_course_titles(&self) -> Result<Vec<String>>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Sort hits by score descending and keep the best `limit`.
pub(crate) fn rank(mut results: Vec<ScoredChunk>, limit: usize) -> Vec<ScoredChunk> {
    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(limit);
    results
}
