//! Lectern - Course Materials Assistant
//!
//! A retrieval-augmented question-answering assistant for course materials.
//! Lectern talks to a hosted language model and lets it call lookup tools
//! (content search, course outlines) over a document index, across several
//! rounds, before producing a grounded answer with citations.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management and prompt templates
//! - `llm` - Model service protocol types and provider adapters
//! - `tools` - Tool trait, registry, citation tracking and the course tools
//! - `engine` - Round-based conversation engine
//! - `store` - Retrieval backend contract and vector store implementations
//! - `embedding` - Embedding generation
//! - `rag` - Assistant facade wiring the pieces together
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern::config::Settings;
//! use lectern::rag::Assistant;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let assistant = Assistant::from_settings(&settings)?;
//!
//!     let response = assistant.query("What does lesson 2 of the MCP course cover?", None).await?;
//!     println!("{}", response.format_for_display());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Populating the catalog
//!
//! Lectern does not parse course documents. The `ask`, `chat` and `serve`
//! commands read whatever the configured store already holds, so an empty
//! SQLite file yields "no content found" answers. An ingestion step, run
//! once per course with the same embedding model and dimensions as
//! `[embedding]`, writes the catalog entry and the embedded chunks:
//!
//! ```rust,no_run
//! use lectern::config::Settings;
//! use lectern::embedding::{Embedder, OpenAIEmbedder};
//! use lectern::rag::open_store;
//! use lectern::store::{Course, CourseChunk, Lesson, VectorStore};
//!
//! # async fn ingest() -> lectern::Result<()> {
//! let settings = Settings::load()?;
//! let store = open_store(&settings)?;
//! let embedder = OpenAIEmbedder::from_settings(&settings.embedding)?;
//!
//! store
//!     .upsert_course(&Course {
//!         title: "Intro to Programming".to_string(),
//!         instructor: Some("Ada Lovelace".to_string()),
//!         course_link: Some("https://example.com/intro".to_string()),
//!         lessons: vec![Lesson {
//!             lesson_number: 1,
//!             lesson_title: "Variables".to_string(),
//!             lesson_link: Some("https://example.com/intro/1".to_string()),
//!         }],
//!     })
//!     .await?;
//!
//! let passages = vec!["A variable names a value.".to_string()];
//! let vectors = embedder.embed_passages(&passages).await?;
//! let chunks: Vec<_> = passages
//!     .iter()
//!     .zip(vectors)
//!     .enumerate()
//!     .map(|(i, (text, vector))| CourseChunk::new("Intro to Programming", Some(1), text.as_str(), vector, i as i32))
//!     .collect();
//! store.upsert_chunks(&chunks).await?;
//! # Ok(())
//! # }
//! ```
//!
//! The `memory` store provider starts empty on every run and is meant for tests.

pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod llm;
pub mod openai;
pub mod rag;
pub mod store;
pub mod tools;

pub use error::{LecternError, Result};
