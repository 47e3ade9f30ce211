//! CLI output formatting utilities.

use crate::store::Course;
use crate::tools::Citation;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a course with its lesson count.
    pub fn course_info(course: &Course) {
        let mut details = format!("{} lessons", course.lessons.len());
        if let Some(instructor) = &course.instructor {
            details = format!("{}, {}", instructor, details);
        }
        println!(
            "  {} {} ({})",
            style("*").cyan(),
            style(&course.title).bold(),
            details
        );
        if let Some(link) = &course.course_link {
            println!("    {}", style(link).dim());
        }
    }

    /// Print the sources behind an answer.
    pub fn sources(sources: &[Citation]) {
        if sources.is_empty() {
            return;
        }
        println!("\n{}", style("Sources:").dim());
        for source in sources {
            match &source.url {
                Some(url) => println!("  {} {} {}", style("*").cyan(), source.title, style(url).dim()),
                None => println!("  {} {}", style("*").cyan(), source.title),
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
