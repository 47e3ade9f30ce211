//! Course outline lookup.

use super::{parse_args, Citation, Tool, ToolDeclaration, ToolOutput};
use crate::error::Result;
use crate::store::{Course, CourseSearch};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, instrument};

pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_title: String,
}

/// Returns a course's title, instructor, link and lesson list.
pub struct OutlineTool {
    backend: Arc<dyn CourseSearch>,
}

impl OutlineTool {
    pub fn new(backend: Arc<dyn CourseSearch>) -> Self {
        Self { backend }
    }
}

/// Render an outline, one item per line.
fn render_outline(course: &Course) -> String {
    let mut lines = vec![format!("**{}**", course.title)];

    if let Some(instructor) = course.instructor.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Instructor: {}", instructor));
    }
    if let Some(link) = course.course_link.as_deref().filter(|s| !s.is_empty()) {
        lines.push(format!("Course Link: {}", link));
    }

    lines.push(format!("Lessons ({} total):", course.lessons.len()));
    if course.lessons.is_empty() {
        lines.push("No lessons found for this course.".to_string());
    } else {
        lines.extend(
            course
                .lessons
                .iter()
                .map(|l| format!("  {}. {}", l.lesson_number, l.lesson_title)),
        );
    }

    lines.join("\n")
}

#[async_trait]
impl Tool for OutlineTool {
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: OUTLINE_TOOL_NAME.to_string(),
            description: "Get complete course outline including title, course link, and all lessons"
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "course_title": {
                        "type": "string",
                        "description": "Course title to get outline for (partial matches work)"
                    }
                },
                "required": ["course_title"]
            }),
        }
    }

    #[instrument(skip_all)]
    async fn execute(&self, args: &serde_json::Value) -> Result<ToolOutput> {
        let args: OutlineArgs = parse_args(OUTLINE_TOOL_NAME, args)?;

        let Some(resolved) = self.backend.resolve_course_name(&args.course_title).await? else {
            let titles = self.backend.get_existing_course_titles().await?;
            return Ok(ToolOutput::with_citations(
                format!(
                    "No course found matching '{}'. Available courses: {}",
                    args.course_title,
                    titles.join(", ")
                ),
                Vec::new(),
            ));
        };

        debug!(requested = %args.course_title, %resolved, "Resolved course for outline");

        let course = self
            .backend
            .get_all_courses_metadata()
            .await?
            .into_iter()
            .find(|c| c.title == resolved);

        let Some(course) = course else {
            return Ok(ToolOutput::with_citations(
                format!("Course metadata not found for '{}'", resolved),
                Vec::new(),
            ));
        };

        let citation = Citation::new(
            format!("{} - Course Outline", course.title),
            course.course_link.clone().filter(|s| !s.is_empty()),
        );

        Ok(ToolOutput::with_citations(render_outline(&course), vec![citation]))
    }

    fn tracks_citations(&self) -> bool {
        true
    }
}
