//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::Assistant;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    max_rounds: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.model.model = model;
    }
    if let Some(max_rounds) = max_rounds {
        settings.rag.max_rounds = max_rounds;
    }

    let assistant = Assistant::from_settings(&settings)?;

    let spinner = Output::spinner("Searching course materials...");

    match assistant.query(question, None).await {
        Ok(response) => {
            spinner.finish_and_clear();
            println!("\n{}", response.answer);
            Output::sources(&response.sources);
            println!();
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
