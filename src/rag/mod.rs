//! Question answering over the course catalog.
//!
//! [`Assistant`] owns a [`ConversationEngine`](crate::engine::ConversationEngine)
//! and a registry holding the content search and outline tools. Each query
//! returns the answer together with the citations its tool calls reported.

mod assistant;
mod history;
mod response;

pub use assistant::{open_store, Assistant, CourseStats};
pub use history::ChatHistory;
pub use response::RagResponse;
