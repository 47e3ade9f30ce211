//! Passage search over course content.

use super::{non_blank, parse_args, Citation, Tool, ToolDeclaration, ToolOutput};
use crate::error::Result;
use crate::store::{CourseSearch, SearchResults};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

pub const SEARCH_TOOL_NAME: &str = "search_course_content";

/// Course title the backend reports when it cannot attribute a passage.
const UNKNOWN_COURSE: &str = "unknown";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Searches course materials with optional course and lesson filters.
pub struct ContentSearchTool {
    backend: Arc<dyn CourseSearch>,
}

impl ContentSearchTool {
    pub fn new(backend: Arc<dyn CourseSearch>) -> Self {
        Self { backend }
    }

    /// Render hits as `[title - Lesson n]` headed passages and build one
    /// citation per passage.
    async fn format_results(&self, results: &SearchResults) -> (String, Vec<Citation>) {
        let mut passages = Vec::with_capacity(results.len());
        let mut citations = Vec::with_capacity(results.len());

        for (document, meta) in results.iter() {
            let title = match meta.lesson_number {
                Some(n) => format!("{} - Lesson {}", meta.course_title, n),
                None => meta.course_title.clone(),
            };
            passages.push(format!("[{}]\n{}", title, document));

            let url = match meta.lesson_number {
                Some(n) if meta.course_title != UNKNOWN_COURSE => {
                    self.lesson_link(&meta.course_title, n).await
                }
                _ => None,
            };
            citations.push(Citation::new(title, url));
        }

        (passages.join("\n\n"), citations)
    }

    async fn lesson_link(&self, course_title: &str, lesson_number: u32) -> Option<String> {
        match self.backend.get_lesson_link(course_title, lesson_number).await {
            Ok(link) => link,
            Err(e) => {
                warn!(course = course_title, lesson = lesson_number, "Lesson link lookup failed: {}", e);
                None
            }
        }
    }
}

fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(course) = course_name {
        message.push_str(&format!(" in course '{}'", course));
    }
    if let Some(lesson) = lesson_number {
        message.push_str(&format!(" in lesson {}", lesson));
    }
    message.push('.');
    message
}

#[async_trait]
impl Tool for ContentSearchTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: SEARCH_TOOL_NAME.to_string(),
            description: "Search course materials with smart course name matching and lesson filtering"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description": "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    #[instrument(skip_all)]
    async fn execute(&self, args: &serde_json::Value) -> Result<ToolOutput> {
        let args: SearchArgs = parse_args(SEARCH_TOOL_NAME, args)?;
        let course_name = non_blank(args.course_name);

        debug!(query = %args.query, ?course_name, lesson = ?args.lesson_number, "Searching course content");

        let results = self
            .backend
            .search(&args.query, course_name.as_deref(), args.lesson_number)
            .await?;

        if let Some(error) = &results.error {
            return Ok(ToolOutput::with_citations(error.clone(), Vec::new()));
        }

        if results.is_empty() {
            return Ok(ToolOutput::with_citations(
                no_results_message(course_name.as_deref(), args.lesson_number),
                Vec::new(),
            ));
        }

        let (text, citations) = self.format_results(&results).await;
        Ok(ToolOutput::with_citations(text, citations))
    }

    fn tracks_citations(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LecternError;
    use crate::store::mock::{intro_course, results, FakeCourseSearch};

    fn build(backend: FakeCourseSearch) -> (ContentSearchTool, Arc<FakeCourseSearch>) {
        let backend = Arc::new(backend);
        (ContentSearchTool::new(backend.clone()), backend)
    }

    #[test]
    fn test_declaration_schema() {
        let (tool, _) = build(FakeCourseSearch::new(vec![]));
        let decl = tool.declaration();
        assert_eq!(decl.name, "search_course_content");
        assert_eq!(decl.input_schema["type"], "object");
        assert_eq!(decl.input_schema["required"], json!(["query"]));
        assert!(decl.input_schema["properties"]["lesson_number"].is_object());
        assert!(tool.tracks_citations());
    }

    #[tokio::test]
    async fn test_formats_passages_with_citations() {
        let backend = FakeCourseSearch::new(vec![intro_course()]).with_results(results(&[
            ("A variable stores a value.", "Intro", Some(1)),
            ("Course overview.", "Intro", None),
        ]));
        let (tool, backend) = build(backend);

        let output = tool.execute(&json!({"query": "variable"})).await.unwrap();

        assert_eq!(
            output.text,
            "[Intro - Lesson 1]\nA variable stores a value.\n\n[Intro]\nCourse overview."
        );
        assert_eq!(
            output.citations.unwrap(),
            vec![
                Citation::new("Intro - Lesson 1", Some("https://example.com/intro/1".to_string())),
                Citation::new("Intro", None),
            ]
        );
        assert_eq!(backend.searches()[0].query, "variable");
    }

    #[tokio::test]
    async fn test_passes_filters_to_backend() {
        let backend = FakeCourseSearch::new(vec![intro_course()])
            .with_results(results(&[("Loops repeat.", "Intro", Some(2))]));
        let (tool, backend) = build(backend);

        tool.execute(&json!({"query": "loops", "course_name": "intro", "lesson_number": 2}))
            .await
            .unwrap();

        let searches = backend.searches();
        let recorded = &searches[0];
        assert_eq!(recorded.course_name.as_deref(), Some("intro"));
        assert_eq!(recorded.lesson_number, Some(2));
    }

    #[tokio::test]
    async fn test_empty_results_name_filters() {
        let (tool, _) = build(FakeCourseSearch::new(vec![intro_course()]));

        let output = tool
            .execute(&json!({"query": "x", "course_name": "Intro", "lesson_number": 0}))
            .await
            .unwrap();
        assert_eq!(output.text, "No relevant content found in course 'Intro' in lesson 0.");
        assert_eq!(output.citations, Some(vec![]));

        let output = tool.execute(&json!({"query": "x", "course_name": ""})).await.unwrap();
        assert_eq!(output.text, "No relevant content found.");
    }

    #[tokio::test]
    async fn test_backend_error_is_returned_verbatim() {
        let backend = FakeCourseSearch::new(vec![])
            .with_results(SearchResults::from_error("No course found matching 'Cooking'"));
        let (tool, _) = build(backend);

        let output = tool
            .execute(&json!({"query": "x", "course_name": "Cooking"}))
            .await
            .unwrap();
        assert_eq!(output.text, "No course found matching 'Cooking'");
        assert_eq!(output.citations, Some(vec![]));
    }

    #[tokio::test]
    async fn test_unknown_course_gets_no_link() {
        let backend = FakeCourseSearch::new(vec![intro_course()])
            .with_results(results(&[("Orphan passage.", "unknown", Some(1))]));
        let (tool, _) = build(backend);

        let output = tool.execute(&json!({"query": "x"})).await.unwrap();
        assert_eq!(output.citations.unwrap(), vec![Citation::new("unknown - Lesson 1", None)]);
    }

    #[tokio::test]
    async fn test_link_failure_omits_url() {
        let backend = FakeCourseSearch::new(vec![intro_course()])
            .with_results(results(&[("A variable stores a value.", "Intro", Some(1))]))
            .failing_links();
        let (tool, _) = build(backend);

        let output = tool.execute(&json!({"query": "variable"})).await.unwrap();
        assert_eq!(output.citations.unwrap(), vec![Citation::new("Intro - Lesson 1", None)]);
    }

    #[tokio::test]
    async fn test_bad_arguments_and_hard_failures() {
        let (tool, _) = build(FakeCourseSearch::new(vec![]));
        let err = tool.execute(&json!({"course_name": "Intro"})).await.unwrap_err();
        assert!(matches!(err, LecternError::ToolArguments(_)));

        let (tool, _) = build(FakeCourseSearch::new(vec![]).failing_search());
        let err = tool.execute(&json!({"query": "x"})).await.unwrap_err();
        assert!(err.to_string().contains("backend unavailable"));
    }
}
