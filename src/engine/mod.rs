//! Multi-round tool orchestration.
//!
//! [`ConversationEngine::generate`] drives one question through at most
//! `round_budget` model calls. After each response, [`decide`] picks between
//! running the requested tools for another round and finishing. Every
//! tool-use block is answered by exactly one correlated tool-result block, in
//! request order, before the next call. Tool failures become error results
//! for the model; only the model call itself can fail the conversation.

mod decision;

pub use decision::{decide, RoundDecision, FALLBACK_ANSWER};

use crate::config::{ModelSettings, Prompts};
use crate::error::{LecternError, Result};
use crate::llm::{
    ContentBlock, Message, ModelRequest, ModelResponse, ModelService, ToolChoice, ToolDeclaration,
};
use crate::tools::{not_found, Citation, CitationCollector, ToolRegistry};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of one conversation.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Final answer text.
    pub answer: String,
    /// Citations reported by the tools during this conversation.
    pub citations: Vec<Citation>,
    /// Number of model calls made.
    pub rounds: usize,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Record of a tool call made during a conversation.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Round the call was requested in.
    pub round: usize,
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Text fed back to the model.
    pub result: String,
    /// Whether the tool failed.
    pub is_error: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// Runs the round protocol against a model service.
pub struct ConversationEngine {
    service: Arc<dyn ModelService>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    prompts: Prompts,
}

impl ConversationEngine {
    pub fn new(service: Arc<dyn ModelService>, model: impl Into<String>) -> Self {
        Self {
            service,
            model: model.into(),
            max_tokens: 800,
            temperature: 0.0,
            prompts: Prompts::default(),
        }
    }

    /// Create an engine using the model, token and temperature settings.
    pub fn from_settings(service: Arc<dyn ModelService>, settings: &ModelSettings) -> Self {
        Self::new(service, &settings.model)
            .with_max_tokens(settings.max_tokens)
            .with_temperature(settings.temperature)
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Use custom prompt templates for the system instructions.
    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Answer `query`, returning only the text.
    ///
    /// Tool citations remain readable through
    /// [`ToolRegistry::latest_citations`] afterwards.
    pub async fn generate(
        &self,
        query: &str,
        history: Option<&str>,
        declarations: Option<&[ToolDeclaration]>,
        registry: Option<&ToolRegistry>,
        round_budget: usize,
    ) -> Result<String> {
        let generation = self
            .generate_with_sources(query, history, declarations, registry, round_budget)
            .await?;
        Ok(generation.answer)
    }

    /// Answer `query`, returning the text with its citations and a tool trace.
    #[instrument(skip(self, history, declarations, registry), fields(model = %self.model))]
    pub async fn generate_with_sources(
        &self,
        query: &str,
        history: Option<&str>,
        declarations: Option<&[ToolDeclaration]>,
        registry: Option<&ToolRegistry>,
        round_budget: usize,
    ) -> Result<Generation> {
        if round_budget == 0 {
            return Err(LecternError::InvalidInput(
                "round budget must be at least 1".to_string(),
            ));
        }

        let system = self.prompts.system_instructions(round_budget, history);
        let declarations = declarations.filter(|d| !d.is_empty());

        let mut messages = vec![Message::user(query)];
        let mut collector = CitationCollector::new();
        let mut tool_calls = Vec::new();

        for round in 1..=round_budget {
            debug!("Conversation round {}/{}", round, round_budget);

            let request = ModelRequest {
                model: self.model.clone(),
                max_tokens: self.max_tokens,
                temperature: self.temperature,
                system: system.clone(),
                messages: messages.clone(),
                tools: declarations.map(<[ToolDeclaration]>::to_vec),
                tool_choice: declarations.map(|_| ToolChoice::Auto),
            };

            let response = self.service.create_message(&request).await?;
            let decision = decide(&response, round, round_budget);
            messages.push(Message::assistant_blocks(response.replayable_content()));

            if let Some(answer) = decision.into_answer() {
                info!(rounds = round, tool_calls = tool_calls.len(), "Conversation finished");
                return Ok(Generation {
                    answer,
                    citations: collector.into_latest(),
                    rounds: round,
                    tool_calls,
                });
            }

            let results = self
                .run_tools(&response, round, registry, &mut collector, &mut tool_calls)
                .await;
            messages.push(Message::user_blocks(results));
        }

        // The final round never continues, so the loop always returns
        Ok(Generation {
            answer: FALLBACK_ANSWER.to_string(),
            citations: collector.into_latest(),
            rounds: round_budget,
            tool_calls,
        })
    }

    /// Execute every tool-use block in request order, producing one
    /// correlated result block each. Never fails.
    async fn run_tools(
        &self,
        response: &ModelResponse,
        round: usize,
        registry: Option<&ToolRegistry>,
        collector: &mut CitationCollector,
        records: &mut Vec<ToolCallRecord>,
    ) -> Vec<ContentBlock> {
        let mut results = Vec::new();

        for (id, name, input) in response.tool_uses() {
            info!("Calling tool: {} with args: {}", name, input);

            let outcome = match registry {
                Some(registry) => registry.execute_collecting(name, input, collector).await,
                None => Ok(not_found(name)),
            };

            let (block, result, is_error) = match outcome {
                Ok(text) => (ContentBlock::tool_result(id, text.clone()), text, false),
                Err(e) => {
                    warn!(tool = name, "Tool execution failed: {}", e);
                    let text = format!("Tool execution error: {}", e);
                    (ContentBlock::tool_error(id, text.clone()), text, true)
                }
            };

            results.push(block);
            records.push(ToolCallRecord {
                round,
                name: name.to_string(),
                arguments: input.to_string(),
                result,
                is_error,
            });
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::{text_response, tool_use_response, ScriptedModelService};
    use crate::llm::{MessageContent, Role};
    use crate::store::mock::{intro_course, results, FakeCourseSearch};
    use crate::tools::{ContentSearchTool, OutlineTool, Tool, ToolOutput};
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn declaration(&self) -> ToolDeclaration {
            ToolDeclaration {
                name: "flaky_lookup".to_string(),
                description: "always fails".to_string(),
                input_schema: json!({"type": "object", "properties": {}, "required": []}),
            }
        }

        async fn execute(&self, _args: &serde_json::Value) -> Result<ToolOutput> {
            Err(LecternError::Tool("index offline".to_string()))
        }
    }

    fn course_registry() -> ToolRegistry {
        let backend = Arc::new(
            FakeCourseSearch::new(vec![intro_course()])
                .with_results(results(&[("A variable stores a value.", "Intro", Some(1))])),
        );
        let mut registry = ToolRegistry::new();
        registry
            .register(ContentSearchTool::new(backend.clone()))
            .unwrap();
        registry.register(OutlineTool::new(backend)).unwrap();
        registry
    }

    fn engine(service: &Arc<ScriptedModelService>) -> ConversationEngine {
        ConversationEngine::new(service.clone(), "test-model")
    }

    /// Tool results carried by the user turn at `index` of a request.
    fn tool_results(request: &ModelRequest, index: usize) -> Vec<(String, String, bool)> {
        let message = &request.messages[index];
        assert_eq!(message.role, Role::User);
        message
            .blocks()
            .into_iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => Some((tool_use_id, content, is_error)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_direct_answer_single_call_without_tools() {
        let service = Arc::new(ScriptedModelService::new(vec![text_response("Paris.")]));

        let answer = engine(&service)
            .generate("Capital of France?", None, None, None, 2)
            .await
            .unwrap();

        assert_eq!(answer, "Paris.");
        assert_eq!(service.call_count(), 1);
        let requests = service.requests();
        let request = &requests[0];
        assert!(request.tools.is_none());
        assert!(request.tool_choice.is_none());
        assert_eq!(request.messages, vec![Message::user("Capital of France?")]);
        assert_eq!(request.model, "test-model");
    }

    #[tokio::test]
    async fn test_declarations_enable_auto_tool_choice() {
        let service = Arc::new(ScriptedModelService::new(vec![text_response("Hi.")]));
        let registry = course_registry();
        let declarations = registry.declarations();

        engine(&service)
            .generate("Hello", None, Some(&declarations), Some(&registry), 2)
            .await
            .unwrap();

        let requests = service.requests();
        let request = &requests[0];
        assert_eq!(request.tools.as_deref(), Some(declarations.as_slice()));
        assert_eq!(request.tool_choice, Some(ToolChoice::Auto));
    }

    #[tokio::test]
    async fn test_variable_scenario_with_citation() {
        let service = Arc::new(ScriptedModelService::new(vec![
            tool_use_response(&[("toolu_1", "search_course_content", json!({"query": "variable"}))]),
            text_response("A variable stores a value."),
        ]));
        let registry = course_registry();
        let declarations = registry.declarations();

        let answer = engine(&service)
            .generate("What is a variable?", None, Some(&declarations), Some(&registry), 2)
            .await
            .unwrap();

        assert_eq!(answer, "A variable stores a value.");
        assert_eq!(service.call_count(), 2);
        assert_eq!(
            registry.latest_citations(),
            vec![Citation::new(
                "Intro - Lesson 1",
                Some("https://example.com/intro/1".to_string())
            )]
        );

        let requests = service.requests();
        let second = &requests[1];
        assert_eq!(second.messages.len(), 3);
        assert_eq!(second.messages[1].role, Role::Assistant);
        let results = tool_results(second, 2);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "toolu_1");
        assert!(results[0].1.starts_with("[Intro - Lesson 1]\n"));
        assert!(!results[0].2);
    }

    #[tokio::test]
    async fn test_generation_reports_sources_and_trace() {
        let service = Arc::new(ScriptedModelService::new(vec![
            tool_use_response(&[("toolu_1", "search_course_content", json!({"query": "variable"}))]),
            text_response("A variable stores a value."),
        ]));
        let registry = course_registry();
        let declarations = registry.declarations();

        let generation = engine(&service)
            .generate_with_sources("What is a variable?", None, Some(&declarations), Some(&registry), 2)
            .await
            .unwrap();

        assert_eq!(generation.rounds, 2);
        assert_eq!(generation.citations.len(), 1);
        assert_eq!(generation.citations[0].title, "Intro - Lesson 1");
        assert_eq!(generation.tool_calls.len(), 1);
        assert_eq!(
            generation.tool_calls[0].to_string(),
            r#"search_course_content({"query":"variable"})"#
        );
        assert_eq!(generation.tool_calls[0].round, 1);
    }

    #[tokio::test]
    async fn test_mixed_content_runs_no_tools() {
        let mut mixed = tool_use_response(&[(
            "toolu_1",
            "search_course_content",
            json!({"query": "variable"}),
        )]);
        mixed
            .content
            .insert(0, ContentBlock::text("A variable is a named value."));
        let service = Arc::new(ScriptedModelService::new(vec![mixed]));
        let registry = course_registry();
        let declarations = registry.declarations();

        let generation = engine(&service)
            .generate_with_sources("What is a variable?", None, Some(&declarations), Some(&registry), 3)
            .await
            .unwrap();

        assert_eq!(generation.answer, "A variable is a named value.");
        assert_eq!(service.call_count(), 1);
        assert!(generation.tool_calls.is_empty());
        assert!(registry.latest_citations().is_empty());
    }

    #[tokio::test]
    async fn test_failing_tool_is_fed_back() {
        let service = Arc::new(ScriptedModelService::new(vec![
            tool_use_response(&[("toolu_1", "flaky_lookup", json!({}))]),
            text_response("The index is unavailable right now."),
        ]));
        let mut registry = ToolRegistry::new();
        registry.register(FailingTool).unwrap();
        let declarations = registry.declarations();

        let answer = engine(&service)
            .generate("Look it up", None, Some(&declarations), Some(&registry), 2)
            .await
            .unwrap();

        assert_eq!(answer, "The index is unavailable right now.");
        assert_eq!(service.call_count(), 2);

        let results = tool_results(&service.requests()[1], 2);
        assert_eq!(results[0].0, "toolu_1");
        assert!(results[0].1.starts_with("Tool execution error:"));
        assert!(results[0].1.contains("index offline"));
        assert!(results[0].2);
    }

    #[tokio::test]
    async fn test_budget_of_one_never_runs_tools() {
        let service = Arc::new(ScriptedModelService::new(vec![tool_use_response(&[(
            "toolu_1",
            "search_course_content",
            json!({"query": "variable"}),
        )])]));
        let registry = course_registry();
        let declarations = registry.declarations();

        let generation = engine(&service)
            .generate_with_sources("What is a variable?", None, Some(&declarations), Some(&registry), 1)
            .await
            .unwrap();

        assert_eq!(service.call_count(), 1);
        assert_eq!(generation.answer, FALLBACK_ANSWER);
        assert!(generation.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_two_tool_rounds_then_answer() {
        let service = Arc::new(ScriptedModelService::new(vec![
            tool_use_response(&[("toolu_1", "get_course_outline", json!({"course_title": "Intro"}))]),
            tool_use_response(&[(
                "toolu_2",
                "search_course_content",
                json!({"query": "variables", "course_name": "Intro", "lesson_number": 1}),
            )]),
            text_response("Lesson 1 of Intro covers variables."),
        ]));
        let registry = course_registry();
        let declarations = registry.declarations();

        let generation = engine(&service)
            .generate_with_sources("What does lesson 1 of Intro cover?", None, Some(&declarations), Some(&registry), 3)
            .await
            .unwrap();

        assert_eq!(generation.answer, "Lesson 1 of Intro covers variables.");
        assert_eq!(service.call_count(), 3);
        assert_eq!(generation.rounds, 3);
        let names: Vec<_> = generation.tool_calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["get_course_outline", "search_course_content"]);

        // The search tool registered first, so its citations take precedence
        assert_eq!(generation.citations[0].title, "Intro - Lesson 1");

        let requests = service.requests();
        let third = &requests[2];
        assert_eq!(third.messages.len(), 5);
        assert_eq!(tool_results(third, 2)[0].0, "toolu_1");
        assert_eq!(tool_results(third, 4)[0].0, "toolu_2");
    }

    #[tokio::test]
    async fn test_same_round_calls_answered_in_request_order() {
        let service = Arc::new(ScriptedModelService::new(vec![
            tool_use_response(&[
                ("toolu_b", "get_course_outline", json!({"course_title": "Intro"})),
                ("toolu_a", "search_course_content", json!({"query": "loops"})),
                ("toolu_c", "missing_tool", json!({})),
            ]),
            text_response("Done."),
        ]));
        let registry = course_registry();
        let declarations = registry.declarations();

        engine(&service)
            .generate("Outline and loops", None, Some(&declarations), Some(&registry), 2)
            .await
            .unwrap();

        let results = tool_results(&service.requests()[1], 2);
        let ids: Vec<_> = results.iter().map(|r| r.0.as_str()).collect();
        assert_eq!(ids, vec!["toolu_b", "toolu_a", "toolu_c"]);
        assert!(results[0].1.starts_with("**Intro**"));
        assert_eq!(results[2].1, "Tool 'missing_tool' not found");
    }

    #[tokio::test]
    async fn test_tool_use_without_registry_is_answered() {
        let service = Arc::new(ScriptedModelService::new(vec![
            tool_use_response(&[("toolu_1", "search_course_content", json!({"query": "x"}))]),
            text_response("No tools available."),
        ]));

        let answer = engine(&service)
            .generate("Question", None, None, None, 2)
            .await
            .unwrap();

        assert_eq!(answer, "No tools available.");
        let results = tool_results(&service.requests()[1], 2);
        assert_eq!(results[0].0, "toolu_1");
        assert!(results[0].1.contains("not found"));
    }

    #[tokio::test]
    async fn test_assistant_turn_drops_blank_and_unrecognized_blocks() {
        let mut first = tool_use_response(&[("toolu_1", "search_course_content", json!({"query": "variable"}))]);
        first.content.insert(0, ContentBlock::Unknown);
        first.content.insert(1, ContentBlock::text(" \n "));
        let service = Arc::new(ScriptedModelService::new(vec![first, text_response("A named value.")]));
        let registry = course_registry();
        let declarations = registry.declarations();

        let answer = engine(&service)
            .generate("What is a variable?", None, Some(&declarations), Some(&registry), 2)
            .await
            .unwrap();

        assert_eq!(answer, "A named value.");
        let requests = service.requests();
        let echoed = &requests[1].messages[1];
        assert_eq!(echoed.role, Role::Assistant);
        assert_eq!(
            echoed.blocks(),
            vec![ContentBlock::tool_use("toolu_1", "search_course_content", json!({"query": "variable"}))]
        );
        assert_eq!(tool_results(&requests[1], 2)[0].0, "toolu_1");
    }

    #[tokio::test]
    async fn test_history_in_system_instructions() {
        let service = Arc::new(ScriptedModelService::new(vec![text_response("Sure.")]));

        engine(&service)
            .generate("And loops?", Some("User: What is a variable?\nAssistant: A named value."), None, None, 2)
            .await
            .unwrap();

        let requests = service.requests();
        let request = &requests[0];
        assert!(request.system.contains("up to 2 tool calls"));
        assert!(request
            .system
            .ends_with("Previous conversation:\nUser: What is a variable?\nAssistant: A named value."));
        // History stays out of the turn sequence
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].content, MessageContent::Text("And loops?".to_string()));
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let service = Arc::new(ScriptedModelService::new(vec![tool_use_response(&[(
            "toolu_1",
            "search_course_content",
            json!({"query": "variable"}),
        )])]));
        service.push_error(LecternError::Provider {
            status: 529,
            message: "overloaded".to_string(),
        });
        let registry = course_registry();
        let declarations = registry.declarations();

        let err = engine(&service)
            .generate("What is a variable?", None, Some(&declarations), Some(&registry), 3)
            .await
            .unwrap_err();

        assert!(matches!(err, LecternError::Provider { status: 529, .. }));
        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_budget_rejected() {
        let service = Arc::new(ScriptedModelService::new(vec![text_response("unused")]));

        let err = engine(&service)
            .generate("Question", None, None, None, 0)
            .await
            .unwrap_err();

        assert!(matches!(err, LecternError::InvalidInput(_)));
        assert_eq!(service.call_count(), 0);
    }

    #[tokio::test]
    async fn test_settings_apply_to_requests() {
        let service = Arc::new(ScriptedModelService::new(vec![text_response("ok")]));
        let settings = ModelSettings {
            model: "claude-test".to_string(),
            max_tokens: 123,
            temperature: 0.5,
            ..Default::default()
        };

        ConversationEngine::from_settings(service.clone(), &settings)
            .generate("q", None, None, None, 1)
            .await
            .unwrap();

        let requests = service.requests();
        let request = &requests[0];
        assert_eq!(request.model, "claude-test");
        assert_eq!(request.max_tokens, 123);
        assert!((request.temperature - 0.5).abs() < f32::EPSILON);
    }
}
