//! Courses command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::open_store;
use anyhow::Result;

/// Run the courses command.
pub async fn run_courses(settings: Settings) -> Result<()> {
    preflight::check(Operation::Courses, &settings)?;
    let store = open_store(&settings)?;

    match store.list_courses().await {
        Ok(courses) => {
            if courses.is_empty() {
                Output::info("No courses indexed yet.");
            } else {
                Output::header(&format!("Courses ({})", courses.len()));
                println!();

                for course in &courses {
                    Output::course_info(course);
                }

                let total_lessons: usize = courses.iter().map(|c| c.lessons.len()).sum();
                println!();
                Output::kv("Total courses", &courses.len().to_string());
                Output::kv("Total lessons", &total_lessons.to_string());
                Output::kv("Indexed chunks", &store.chunk_count().await?.to_string());
            }
        }
        Err(e) => {
            Output::error(&format!("Failed to list courses: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
