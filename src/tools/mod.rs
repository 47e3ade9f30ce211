//! Lookup tools the model can call during a conversation.
//!
//! A [`Tool`] declares itself with a name, description and JSON input schema,
//! and executes against untyped JSON arguments. Tools that record provenance
//! return [`Citation`]s alongside their text; the [`ToolRegistry`] routes those
//! into a per-request [`CitationCollector`].

mod outline;
mod registry;
mod search;

pub use crate::llm::ToolDeclaration;
pub use outline::OutlineTool;
pub(crate) use registry::not_found;
pub use registry::{CitationCollector, ToolRegistry};
pub use search::ContentSearchTool;

use crate::error::{LecternError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Where part of an answer came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Display title, e.g. `Intro - Lesson 1`.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Citation {
    pub fn new(title: impl Into<String>, url: Option<String>) -> Self {
        Self {
            title: title.into(),
            url,
        }
    }
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.url {
            Some(url) => write!(f, "{} ({})", self.title, url),
            None => write!(f, "{}", self.title),
        }
    }
}

/// Result of one tool execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Text handed back to the model.
    pub text: String,
    /// `Some` replaces the tool's stored citations, even when empty.
    pub citations: Option<Vec<Citation>>,
}

impl ToolOutput {
    /// Plain text, leaving stored citations untouched.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            citations: None,
        }
    }

    pub fn with_citations(text: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            text: text.into(),
            citations: Some(citations),
        }
    }
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declaration surfaced to the model. The name must be non-empty.
    fn declaration(&self) -> ToolDeclaration;

    /// Run with the model-supplied arguments.
    async fn execute(&self, args: &serde_json::Value) -> Result<ToolOutput>;

    /// Whether this tool reports citations.
    fn tracks_citations(&self) -> bool {
        false
    }
}

/// Deserialize model-supplied arguments into a typed struct.
pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, args: &serde_json::Value) -> Result<T> {
    serde_json::from_value(args.clone())
        .map_err(|e| LecternError::ToolArguments(format!("{}: {}", tool, e)))
}

/// Treat blank optional strings as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
