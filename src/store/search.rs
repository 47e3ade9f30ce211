//! Course search over an embedded chunk store.

use super::{ChunkFilter, ChunkMetadata, Course, CourseSearch, SearchResults, VectorStore};
use crate::embedding::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// [`CourseSearch`] backed by a [`VectorStore`] and an [`Embedder`].
pub struct IndexedCourseSearch {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    max_results: usize,
    min_score: f32,
}

impl IndexedCourseSearch {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            max_results: 5,
            min_score: 0.0,
        }
    }

    /// Cap the number of passages per search.
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Drop passages scoring below `min_score`.
    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    async fn run_search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        let course_title = match course_name {
            Some(name) => match self.resolve_course_name(name).await? {
                Some(title) => Some(title),
                None => {
                    return Ok(SearchResults::from_error(format!(
                        "No course found matching '{}'",
                        name
                    )))
                }
            },
            None => None,
        };

        let filter = ChunkFilter {
            course_title,
            lesson_number,
        };

        let embedding = self.embedder.embed_query(query).await?;
        let hits = self
            .store
            .search_with_threshold(&embedding, self.max_results, self.min_score, &filter)
            .await?;

        debug!(hits = hits.len(), ?filter, "Course search complete");

        let mut results = SearchResults::default();
        for hit in hits {
            results.push(
                hit.chunk.content,
                ChunkMetadata {
                    course_title: hit.chunk.course_title,
                    lesson_number: hit.chunk.lesson_number,
                },
            );
        }
        Ok(results)
    }
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard overlap between the word sets of two strings.
fn word_overlap(a: &str, b: &str) -> f32 {
    let (a, b) = (words(a), words(b));
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f32 / union as f32
}

/// Pick the catalog title best matching `partial`.
///
/// Exact (case-insensitive) beats substring, which beats the highest
/// non-zero word overlap. Ties keep the first title in catalog order.
fn best_title_match<'a>(partial: &str, titles: &'a [String]) -> Option<&'a str> {
    let needle = partial.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    if let Some(title) = titles.iter().find(|t| t.to_lowercase() == needle) {
        return Some(title.as_str());
    }

    if let Some(title) = titles.iter().find(|t| t.to_lowercase().contains(&needle)) {
        return Some(title.as_str());
    }

    let mut best: Option<(&str, f32)> = None;
    for title in titles {
        let score = word_overlap(&needle, title);
        if score > 0.0 && best.is_none_or(|(_, s)| score > s) {
            best = Some((title.as_str(), score));
        }
    }
    best.map(|(title, _)| title)
}

#[async_trait]
impl CourseSearch for IndexedCourseSearch {
    #[instrument(skip(self))]
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        // Backend failures surface as a soft error the tool relays verbatim
        match self.run_search(query, course_name, lesson_number).await {
            Ok(results) => Ok(results),
            Err(e) => {
                warn!("Course search failed: {}", e);
                Ok(SearchResults::from_error(format!("Search error: {}", e)))
            }
        }
    }

    #[instrument(skip(self))]
    async fn resolve_course_name(&self, partial: &str) -> Result<Option<String>> {
        let titles = self.get_existing_course_titles().await?;
        let resolved = best_title_match(partial, &titles).map(str::to_string);
        debug!(?resolved, "Resolved course name");
        Ok(resolved)
    }

    async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        let course = self.store.get_course(course_title).await?;
        Ok(course.and_then(|c| c.lesson_link(lesson_number).map(str::to_string)))
    }

    async fn get_all_courses_metadata(&self) -> Result<Vec<Course>> {
        self.store.list_courses().await
    }

    async fn get_existing_course_titles(&self) -> Result<Vec<String>> {
        let courses = self.store.list_courses().await?;
        Ok(courses.into_iter().map(|c| c.title).collect())
    }
}
