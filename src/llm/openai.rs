//! OpenAI chat completions service.
//!
//! Translates the block protocol to chat messages: tool-use blocks become
//! assistant tool calls and each tool-result block becomes a tool message.

use super::types::{
    ContentBlock, Message, MessageContent, ModelRequest, ModelResponse, Role, StopReason, Usage,
};
use super::ModelService;
use crate::error::{LecternError, Result};
use crate::openai::create_client_with;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs,
    FinishReason, FunctionCall, FunctionObject,
};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// OpenAI-compatible model service.
pub struct OpenAiService {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
}

impl OpenAiService {
    /// Create a new service; the API key comes from `OPENAI_API_KEY`.
    pub fn new(timeout: Duration, api_base: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: create_client_with(timeout, api_base)?,
        })
    }
}

fn build_err(e: impl std::fmt::Display) -> LecternError {
    LecternError::ModelService(format!("failed to build chat request: {}", e))
}

/// Convert the block protocol into chat completion messages.
fn to_chat_messages(system: &str, messages: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut out: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system.to_string())
            .build()
            .map_err(build_err)?
            .into(),
    ];

    for message in messages {
        match (message.role, &message.content) {
            (Role::User, MessageContent::Text(text)) => {
                out.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(text.clone())
                        .build()
                        .map_err(build_err)?
                        .into(),
                );
            }
            (Role::User, MessageContent::Blocks(blocks)) => {
                for block in blocks {
                    match block {
                        ContentBlock::Text { text } => out.push(
                            ChatCompletionRequestUserMessageArgs::default()
                                .content(text.clone())
                                .build()
                                .map_err(build_err)?
                                .into(),
                        ),
                        ContentBlock::ToolResult {
                            tool_use_id,
                            content,
                            ..
                        } => out.push(
                            ChatCompletionRequestToolMessageArgs::default()
                                .tool_call_id(tool_use_id.clone())
                                .content(content.clone())
                                .build()
                                .map_err(build_err)?
                                .into(),
                        ),
                        ContentBlock::ToolUse { .. } | ContentBlock::Unknown => {
                            warn!("Dropping non-user block found in a user turn");
                        }
                    }
                }
            }
            (Role::Assistant, content) => {
                let blocks = match content {
                    MessageContent::Text(text) => vec![ContentBlock::text(text.clone())],
                    MessageContent::Blocks(blocks) => blocks.clone(),
                };

                let text = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::Text { text } => Some(text.as_str()),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                let tool_calls: Vec<ChatCompletionMessageToolCall> = blocks
                    .iter()
                    .filter_map(|b| match b {
                        ContentBlock::ToolUse { id, name, input } => Some(ChatCompletionMessageToolCall {
                            id: id.clone(),
                            r#type: ChatCompletionToolType::Function,
                            function: FunctionCall {
                                name: name.clone(),
                                arguments: input.to_string(),
                            },
                        }),
                        _ => None,
                    })
                    .collect();

                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if !text.is_empty() {
                    args.content(text);
                }
                if !tool_calls.is_empty() {
                    args.tool_calls(tool_calls);
                }
                out.push(args.build().map_err(build_err)?.into());
            }
        }
    }

    Ok(out)
}

/// Convert one chat completion choice back into blocks and a stop reason.
fn from_chat_choice(
    content: Option<String>,
    tool_calls: Option<Vec<ChatCompletionMessageToolCall>>,
    finish_reason: Option<FinishReason>,
) -> (Vec<ContentBlock>, StopReason) {
    let mut blocks = Vec::new();

    if let Some(text) = content.filter(|t| !t.is_empty()) {
        blocks.push(ContentBlock::text(text));
    }

    for call in tool_calls.unwrap_or_default() {
        // Unparseable arguments are passed through as a string; the tool rejects them
        let input = serde_json::from_str(&call.function.arguments)
            .unwrap_or(serde_json::Value::String(call.function.arguments.clone()));
        blocks.push(ContentBlock::tool_use(call.id, call.function.name, input));
    }

    let stop_reason = match finish_reason {
        Some(FinishReason::ToolCalls) => StopReason::ToolUse,
        Some(FinishReason::Stop) => StopReason::EndTurn,
        Some(FinishReason::Length) => StopReason::MaxTokens,
        _ => StopReason::Unknown,
    };

    (blocks, stop_reason)
}

#[async_trait]
impl ModelService for OpenAiService {
    fn name(&self) -> &str {
        "OpenAI"
    }

    #[instrument(skip_all, fields(model = %request.model, messages = request.messages.len()))]
    async fn create_message(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let messages = to_chat_messages(&request.system, &request.messages)?;

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model)
            .messages(messages)
            .max_completion_tokens(request.max_tokens)
            .temperature(request.temperature);

        if let Some(tools) = &request.tools {
            let tools: Vec<ChatCompletionTool> = tools
                .iter()
                .map(|t| ChatCompletionTool {
                    r#type: ChatCompletionToolType::Function,
                    function: FunctionObject {
                        name: t.name.clone(),
                        description: Some(t.description.clone()),
                        parameters: Some(t.input_schema.clone()),
                        strict: None,
                    },
                })
                .collect();
            args.tools(tools);
            if request.tool_choice.is_some() {
                args.tool_choice(ChatCompletionToolChoiceOption::Auto);
            }
        }

        let chat_request = args.build().map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| LecternError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LecternError::ModelService("No choices in response".to_string()))?;

        let (content, stop_reason) = from_chat_choice(
            choice.message.content,
            choice.message.tool_calls,
            choice.finish_reason,
        );

        debug!(?stop_reason, blocks = content.len(), "OpenAI response");

        Ok(ModelResponse {
            content,
            stop_reason,
            model: response.model,
            usage: response
                .usage
                .map(|u| Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                })
                .unwrap_or_default(),
        })
    }
}
