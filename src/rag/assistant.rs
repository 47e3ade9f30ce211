//! The course assistant: engine, tools and backend wired together.

use super::RagResponse;
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::engine::ConversationEngine;
use crate::error::{LecternError, Result};
use crate::llm::create_service;
use crate::store::{
    Course, CourseSearch, IndexedCourseSearch, MemoryVectorStore, SqliteVectorStore, VectorStore,
};
use crate::tools::{ContentSearchTool, OutlineTool, ToolDeclaration, ToolRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Catalog summary for listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseStats {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Answers questions about the course catalog using the search and outline tools.
pub struct Assistant {
    engine: ConversationEngine,
    registry: ToolRegistry,
    declarations: Vec<ToolDeclaration>,
    backend: Arc<dyn CourseSearch>,
    max_rounds: usize,
}

impl Assistant {
    /// Create an assistant over `backend`, registering the content search
    /// and outline tools.
    pub fn new(
        engine: ConversationEngine,
        backend: Arc<dyn CourseSearch>,
        max_rounds: usize,
    ) -> Result<Self> {
        let mut registry = ToolRegistry::new();
        registry.register(ContentSearchTool::new(backend.clone()))?;
        registry.register(OutlineTool::new(backend.clone()))?;
        let declarations = registry.declarations();

        Ok(Self {
            engine,
            registry,
            declarations,
            backend,
            max_rounds,
        })
    }

    /// Build the model service, store, embedder and prompts from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let service = create_service(&settings.model)?;
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let engine = ConversationEngine::from_settings(service, &settings.model).with_prompts(prompts);

        let store = open_store(settings)?;
        let embedder = Arc::new(OpenAIEmbedder::from_settings(&settings.embedding)?);
        let backend = IndexedCourseSearch::new(store, embedder)
            .with_max_results(settings.rag.max_results)
            .with_min_score(settings.rag.min_score);

        info!(
            model = %settings.model.model,
            provider = %settings.model.provider,
            store = %settings.vector_store.provider,
            "Assistant ready"
        );

        Self::new(engine, Arc::new(backend), settings.rag.max_rounds)
    }

    /// Answer a question, with optional prior conversation text.
    ///
    /// Sources come from this request's tool calls only; the registry's
    /// shared citation cache is reset afterwards.
    #[instrument(skip(self, history), fields(question = %question))]
    pub async fn query(&self, question: &str, history: Option<&str>) -> Result<RagResponse> {
        let result = self
            .engine
            .generate_with_sources(
                question,
                history,
                Some(&self.declarations),
                Some(&self.registry),
                self.max_rounds,
            )
            .await;
        self.registry.clear_citations();
        let generation = result?;

        for call in &generation.tool_calls {
            debug!(round = call.round, is_error = call.is_error, "Tool call: {}", call);
        }

        Ok(RagResponse {
            answer: generation.answer,
            sources: generation.citations,
            rounds: generation.rounds,
        })
    }

    /// Every course in the catalog.
    pub async fn courses(&self) -> Result<Vec<Course>> {
        self.backend.get_all_courses_metadata().await
    }

    pub async fn course_stats(&self) -> Result<CourseStats> {
        let course_titles = self.backend.get_existing_course_titles().await?;
        Ok(CourseStats {
            total_courses: course_titles.len(),
            course_titles,
        })
    }

    pub fn model(&self) -> &str {
        self.engine.model()
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }
}

/// Open the configured vector store.
pub fn open_store(settings: &Settings) -> Result<Arc<dyn VectorStore>> {
    match settings.vector_store.provider.as_str() {
        "sqlite" => Ok(Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?)),
        "memory" => Ok(Arc::new(MemoryVectorStore::new())),
        other => Err(LecternError::Config(format!(
            "Unknown vector store provider: {}",
            other
        ))),
    }
}
