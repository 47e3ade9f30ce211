//! Canned course backend for tool and engine tests.

use super::{ChunkMetadata, Course, CourseSearch, Lesson, SearchResults};
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// A search call as the backend received it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedSearch {
    pub query: String,
    pub course_name: Option<String>,
    pub lesson_number: Option<u32>,
}

pub(crate) struct FakeCourseSearch {
    courses: Vec<Course>,
    results: SearchResults,
    fail_search: bool,
    fail_links: bool,
    searches: Mutex<Vec<RecordedSearch>>,
}

impl FakeCourseSearch {
    pub(crate) fn new(courses: Vec<Course>) -> Self {
        Self {
            courses,
            results: SearchResults::default(),
            fail_search: false,
            fail_links: false,
            searches: Mutex::new(Vec::new()),
        }
    }

    /// Results returned by every search.
    pub(crate) fn with_results(mut self, results: SearchResults) -> Self {
        self.results = results;
        self
    }

    /// Make `search` return a hard error.
    pub(crate) fn failing_search(mut self) -> Self {
        self.fail_search = true;
        self
    }

    /// Make `get_lesson_link` return a hard error.
    pub(crate) fn failing_links(mut self) -> Self {
        self.fail_links = true;
        self
    }

    pub(crate) fn searches(&self) -> Vec<RecordedSearch> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl CourseSearch for FakeCourseSearch {
    async fn search(
        &self,
        query: &str,
        course_name: Option<&str>,
        lesson_number: Option<u32>,
    ) -> Result<SearchResults> {
        self.searches.lock().unwrap().push(RecordedSearch {
            query: query.to_string(),
            course_name: course_name.map(str::to_string),
            lesson_number,
        });
        if self.fail_search {
            return Err(LecternError::VectorStore("backend unavailable".to_string()));
        }
        Ok(self.results.clone())
    }

    async fn resolve_course_name(&self, partial: &str) -> Result<Option<String>> {
        let needle = partial.to_lowercase();
        Ok(self
            .courses
            .iter()
            .find(|c| c.title.to_lowercase().contains(&needle))
            .map(|c| c.title.clone()))
    }

    async fn get_lesson_link(&self, course_title: &str, lesson_number: u32) -> Result<Option<String>> {
        if self.fail_links {
            return Err(LecternError::VectorStore("link lookup failed".to_string()));
        }
        Ok(self
            .courses
            .iter()
            .find(|c| c.title == course_title)
            .and_then(|c| c.lesson_link(lesson_number))
            .map(str::to_string))
    }

    async fn get_all_courses_metadata(&self) -> Result<Vec<Course>> {
        Ok(self.courses.clone())
    }

    async fn get_existing_course_titles(&self) -> Result<Vec<String>> {
        Ok(self.courses.iter().map(|c| c.title.clone()).collect())
    }
}

/// "Intro" with two linked lessons, as used across the tool tests.
pub(crate) fn intro_course() -> Course {
    Course {
        title: "Intro".to_string(),
        instructor: Some("Ada Lovelace".to_string()),
        course_link: Some("https://example.com/intro".to_string()),
        lessons: vec![
            Lesson {
                lesson_number: 1,
                lesson_title: "Variables".to_string(),
                lesson_link: Some("https://example.com/intro/1".to_string()),
            },
            Lesson {
                lesson_number: 2,
                lesson_title: "Loops".to_string(),
                lesson_link: Some("https://example.com/intro/2".to_string()),
            },
        ],
    }
}

/// One hit per `(document, course, lesson)` triple.
pub(crate) fn results(hits: &[(&str, &str, Option<u32>)]) -> SearchResults {
    let mut out = SearchResults::default();
    for (doc, course, lesson) in hits {
        out.push(
            *doc,
            ChunkMetadata {
                course_title: course.to_string(),
                lesson_number: *lesson,
            },
        );
    }
    out
}
