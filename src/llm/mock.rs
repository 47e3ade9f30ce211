//! Scripted model service for tests.
//!
//! Responses are popped from a queue in order and every request is recorded
//! for later assertions. No network is involved.

use super::types::{ContentBlock, ModelRequest, ModelResponse, StopReason, Usage};
use super::ModelService;
use crate::error::{LecternError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub(crate) struct ScriptedModelService {
    responses: Mutex<VecDeque<Result<ModelResponse>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModelService {
    pub(crate) fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a hard failure for the next call.
    pub(crate) fn push_error(&self, error: LecternError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub(crate) fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelService for ScriptedModelService {
    fn name(&self) -> &str {
        "Scripted"
    }

    async fn create_message(&self, request: &ModelRequest) -> Result<ModelResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LecternError::ModelService("script exhausted".to_string())))
    }
}

/// A final text answer.
pub(crate) fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        model: "scripted".to_string(),
        usage: Usage::default(),
    }
}

/// A response consisting only of the given tool-use requests.
pub(crate) fn tool_use_response(calls: &[(&str, &str, serde_json::Value)]) -> ModelResponse {
    ModelResponse {
        content: calls
            .iter()
            .map(|(id, name, input)| ContentBlock::tool_use(*id, *name, input.clone()))
            .collect(),
        stop_reason: StopReason::ToolUse,
        model: "scripted".to_string(),
        usage: Usage::default(),
    }
}
