//! Google Gemini provider with SSE streaming and function calling

use crate::provider::{LlmError, LlmProvider, LlmResult, LlmStream};
use crate::types::{ContentBlock, LlmContent, LlmMessage, LlmRequest, LlmTool, StreamDelta, Usage};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: GEMINI_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn stream_url(&self, model: &str) -> String {
        let model = model.strip_prefix("models/").unwrap_or(model);
        format!("{}/models/{}:streamGenerateContent?alt=sse", self.base_url, model)
    }
}

#[async_trait::async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str { "gemini" }

    fn models(&self) -> &[&str] {
        &["gemini-3-flash-preview", "gemini-2.5-flash", "gemini-2.5-pro"]
    }

    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream> {
        let body = build_request(&request);
        debug!("Gemini request: model={}, contents={}", request.model, body.contents.len());

        let response = self.client
            .post(self.stream_url(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini error {}: {}", status, error_text);

            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthFailed(error_text),
                429 => LlmError::RateLimited { retry_after_ms: 60000 },
                _ => LlmError::RequestFailed(format!("{}: {}", status, error_text)),
            });
        }

        let stream = parse_sse_stream(response.bytes_stream());
        Ok(Box::pin(stream))
    }
}

/// Map the provider-neutral request onto Gemini's `generateContent` body.
fn build_request(request: &LlmRequest) -> GenerateContentRequest {
    // functionResponse parts are keyed by name, tool_result blocks by id.
    let tool_names: HashMap<&str, &str> = request
        .messages
        .iter()
        .flat_map(|m| m.tool_uses())
        .collect();

    GenerateContentRequest {
        contents: request
            .messages
            .iter()
            .map(|m| map_message(m, &tool_names))
            .collect(),
        system_instruction: request.system.as_ref().map(|sys| Content {
            role: None,
            parts: vec![Part::text(sys.clone())],
        }),
        tools: request.tools.as_ref().filter(|t| !t.is_empty()).map(|tools| {
            vec![GeminiTool {
                function_declarations: tools.iter().map(map_tool).collect(),
            }]
        }),
        generation_config: GenerationConfig {
            temperature: request.temperature,
            max_output_tokens: request.max_tokens,
        },
    }
}

fn map_message(message: &LlmMessage, tool_names: &HashMap<&str, &str>) -> Content {
    let role = if message.role == "assistant" { "model" } else { "user" };
    let parts = match &message.content {
        LlmContent::Text(text) => vec![Part::text(text.clone())],
        LlmContent::Blocks(blocks) => blocks
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => Part::text(text.clone()),
                ContentBlock::ToolUse { id, name, input } => Part {
                    function_call: Some(FunctionCall {
                        name: name.clone(),
                        args: input.clone(),
                        id: Some(id.clone()),
                    }),
                    ..Part::default()
                },
                ContentBlock::ToolResult { tool_use_id, content, is_error } => {
                    let key = if is_error.unwrap_or(false) { "error" } else { "result" };
                    let mut response = serde_json::Map::new();
                    response.insert(key.to_string(), Value::String(content.clone()));
                    Part {
                        function_response: Some(FunctionResponse {
                            name: tool_names
                                .get(tool_use_id.as_str())
                                .map(|n| n.to_string())
                                .unwrap_or_else(|| "tool".to_string()),
                            response: Value::Object(response),
                            id: Some(tool_use_id.clone()),
                        }),
                        ..Part::default()
                    }
                }
            })
            .collect(),
    };
    Content { role: Some(role.to_string()), parts }
}

fn map_tool(tool: &LlmTool) -> FunctionDeclaration {
    FunctionDeclaration {
        name: tool.name.clone(),
        description: tool.description.clone(),
        parameters: tool.input_schema.clone(),
    }
}

/// Gemini sends one full `GenerateContentResponse` chunk per SSE event.
/// Function calls arrive whole, so each becomes a start/delta/end triple.
fn parse_sse_stream(
    bytes_stream: impl futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static,
) -> impl futures::Stream<Item = LlmResult<StreamDelta>> + Send {
    async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut call_index = 0usize;
        let mut stop_reason: Option<String> = None;
        let mut usage: Option<Usage> = None;

        tokio::pin!(bytes_stream);

        while let Some(chunk_result) = bytes_stream.next().await {
            let chunk = match chunk_result {
                Ok(c) => c,
                Err(e) => {
                    yield Err(LlmError::StreamError(e.to_string()));
                    continue;
                }
            };

            // Bytes until a whole event is buffered; a chunk may end mid-character.
            buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

            while let Some(event_end) = buffer.windows(2).position(|w| w == b"\n\n") {
                let event_bytes: Vec<u8> = buffer.drain(..event_end + 2).collect();
                let event_str = match String::from_utf8(event_bytes) {
                    Ok(s) => s,
                    Err(e) => {
                        yield Err(LlmError::InvalidResponse(e.to_string()));
                        continue;
                    }
                };

                let event_data: String = event_str
                    .lines()
                    .filter_map(|line| line.strip_prefix("data:"))
                    .map(str::trim_start)
                    .collect();

                if event_data.is_empty() { continue; }

                let chunk: GenerateContentResponse = match serde_json::from_str(&event_data) {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(LlmError::InvalidResponse(e.to_string()));
                        continue;
                    }
                };

                if let Some(err) = chunk.error {
                    yield Err(LlmError::StreamError(err.message));
                    continue;
                }
                if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
                    yield Err(LlmError::Blocked(reason));
                    continue;
                }
                if let Some(meta) = chunk.usage_metadata {
                    usage = Some(Usage {
                        input_tokens: meta.prompt_token_count,
                        output_tokens: meta.candidates_token_count,
                    });
                }

                let Some(candidate) = chunk.candidates.into_iter().next() else { continue };
                if candidate.finish_reason.is_some() {
                    stop_reason = candidate.finish_reason;
                }

                for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
                    if let Some(text) = part.text {
                        if !text.is_empty() {
                            yield Ok(StreamDelta::Text(text));
                        }
                    }
                    if let Some(call) = part.function_call {
                        call_index += 1;
                        let id = call.id.unwrap_or_else(|| format!("gemini_call_{}", call_index));
                        yield Ok(StreamDelta::ToolCallStart { id: id.clone(), name: call.name });
                        yield Ok(StreamDelta::ToolCallDelta {
                            id: id.clone(),
                            arguments: call.args.to_string(),
                        });
                        yield Ok(StreamDelta::ToolCallEnd { id });
                    }
                }
            }
        }

        debug!("Gemini stream complete: finish_reason={:?}", stop_reason);
        yield Ok(StreamDelta::Done { stop_reason, usage });
    }
}

// ============================================================
// Wire types
// ============================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<GeminiTool>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: String) -> Self {
        Self { text: Some(text), ..Self::default() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiTool {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
