//! Answers with their provenance.

use crate::tools::Citation;
use serde::Serialize;

/// An answer with the citations reported while producing it.
#[derive(Debug, Clone, Serialize)]
pub struct RagResponse {
    /// The generated answer.
    pub answer: String,
    /// Citations from the tools the model called.
    pub sources: Vec<Citation>,
    /// Model calls used.
    #[serde(skip)]
    pub rounds: usize,
}

impl RagResponse {
    /// Format the response for display.
    pub fn format_for_display(&self) -> String {
        let mut output = self.answer.clone();

        if !self.sources.is_empty() {
            output.push_str("\n\n--- Sources ---\n");
            for source in &self.sources {
                output.push_str(&format!("\n{}", source.title));
                if let Some(url) = &source.url {
                    output.push_str(&format!("\n  {}", url));
                }
            }
        }

        output
    }
}
