//! OpenAI chat completions implementation.

use super::{Completion, CompletionProvider, Role, ToolCall, Turn};
use crate::capabilities::CapabilitySpec;
use crate::error::{CineError, Result};
use crate::question::TokenUsage;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs, ChatCompletionTool,
    ChatCompletionToolChoiceOption, ChatCompletionToolType, CreateChatCompletionRequestArgs,
    CreateChatCompletionResponse, FunctionCall, FunctionObject,
};
use async_openai::Client;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Chat completions backed by the OpenAI API.
pub struct OpenAICompletion {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAICompletion {
    pub fn new(client: Client<OpenAIConfig>, model: &str) -> Self {
        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAICompletion {
    #[instrument(skip(self, transcript, catalogue), fields(turns = transcript.len(), tools = catalogue.map_or(0, |c| c.len())))]
    async fn complete(
        &self,
        transcript: &[Turn],
        catalogue: Option<&[CapabilitySpec]>,
    ) -> Result<Completion> {
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(to_request_messages(transcript)?);

        if let Some(specs) = catalogue.filter(|c| !c.is_empty()) {
            args.tools(tool_definitions(specs))
                .tool_choice(ChatCompletionToolChoiceOption::Auto);
        }

        let request = args
            .build()
            .map_err(|e| CineError::Completion(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CineError::OpenAI(format!("Chat completion error: {}", e)))?;

        let completion = from_response(response)?;
        debug!(
            "Completion used {} prompt / {} completion tokens, {} tool calls",
            completion.usage.prompt_tokens,
            completion.usage.completion_tokens,
            completion.tool_calls.len()
        );
        Ok(completion)
    }
}

/// Convert the transcript into OpenAI request messages.
pub(crate) fn to_request_messages(transcript: &[Turn]) -> Result<Vec<ChatCompletionRequestMessage>> {
    let build_err = |e: async_openai::error::OpenAIError| CineError::Completion(e.to_string());

    transcript
        .iter()
        .map(|turn| -> Result<ChatCompletionRequestMessage> {
            let message: ChatCompletionRequestMessage = match turn.role {
                Role::Requester => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()
                    .map_err(build_err)?
                    .into(),
                Role::System => ChatCompletionRequestSystemMessageArgs::default()
                    .content(turn.content.clone())
                    .build()
                    .map_err(build_err)?
                    .into(),
                Role::Assistant => {
                    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                    if !turn.content.is_empty() {
                        builder.content(turn.content.clone());
                    }
                    if !turn.tool_calls.is_empty() {
                        builder.tool_calls(
                            turn.tool_calls
                                .iter()
                                .map(|call| ChatCompletionMessageToolCall {
                                    id: call.id.clone(),
                                    r#type: ChatCompletionToolType::Function,
                                    function: FunctionCall {
                                        name: call.name.clone(),
                                        arguments: call.arguments.clone(),
                                    },
                                })
                                .collect::<Vec<_>>(),
                        );
                    }
                    builder.build().map_err(build_err)?.into()
                }
                Role::ToolResult => ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(turn.tool_call_id.clone().unwrap_or_default())
                    .content(turn.content.clone())
                    .build()
                    .map_err(build_err)?
                    .into(),
            };
            Ok(message)
        })
        .collect()
}

/// Advertise each capability as a function taking one required string `title`.
pub(crate) fn tool_definitions(catalogue: &[CapabilitySpec]) -> Vec<ChatCompletionTool> {
    catalogue
        .iter()
        .map(|spec| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: spec.name.clone(),
                description: Some(spec.description.clone()),
                parameters: Some(serde_json::json!({
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "The movie name. The movie name should be a string without quotation marks."
                        }
                    },
                    "required": ["title"]
                })),
                strict: None,
            },
        })
        .collect()
}

/// Extract content, usage and tool calls from the first choice.
pub(crate) fn from_response(response: CreateChatCompletionResponse) -> Result<Completion> {
    let usage = response
        .usage
        .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| CineError::Completion("No choices in response".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|call| ToolCall {
            id: call.id,
            name: call.function.name,
            arguments: call.function.arguments,
        })
        .collect();

    Ok(Completion {
        content: choice.message.content,
        usage,
        tool_calls,
    })
}
