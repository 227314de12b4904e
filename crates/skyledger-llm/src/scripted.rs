//! ScriptedProvider - canned service replies for offline use and tests
//!
//! Each call to `complete_stream` pops the next reply. Once the script is
//! exhausted the fallback reply is used.

use crate::provider::{LlmError, LlmProvider, LlmResult, LlmStream};
use crate::types::{LlmRequest, StreamDelta};
use async_stream::stream;
use serde_json::Value;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// One canned reply
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    /// Text-only reply
    Text(String),
    /// A single tool call
    ToolCall { name: String, args: Value },
    /// Several tool calls in one reply
    MultiToolCall(Vec<(String, Value)>),
    /// Text followed by a tool call
    TextThenTool { text: String, name: String, args: Value },
    /// The request itself fails
    Error(String),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn tool_call(name: impl Into<String>, args: Value) -> Self {
        Self::ToolCall { name: name.into(), args }
    }
}

pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    fallback: ScriptedReply,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedProvider {
    /// Replies consumed in order
    pub fn sequence(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            fallback: ScriptedReply::Text("(script exhausted)".into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The same reply every time
    pub fn constant(reply: ScriptedReply) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: reply,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Every request received so far, in order.
    pub async fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_reply(&self, request: LlmRequest) -> (usize, ScriptedReply) {
        let mut requests = self.requests.lock().await;
        requests.push(request);
        let n = requests.len();
        drop(requests);

        let reply = self
            .replies
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        (n, reply)
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str { "scripted" }

    fn models(&self) -> &[&str] { &[""] }

    async fn complete_stream(&self, request: LlmRequest) -> LlmResult<LlmStream> {
        let (n, reply) = self.next_reply(request).await;

        let calls: Vec<(String, Value)> = match &reply {
            ScriptedReply::Error(message) => return Err(LlmError::RequestFailed(message.clone())),
            ScriptedReply::Text(_) => Vec::new(),
            ScriptedReply::ToolCall { name, args } => vec![(name.clone(), args.clone())],
            ScriptedReply::MultiToolCall(calls) => calls.clone(),
            ScriptedReply::TextThenTool { name, args, .. } => vec![(name.clone(), args.clone())],
        };
        let text = match reply {
            ScriptedReply::Text(text) | ScriptedReply::TextThenTool { text, .. } => Some(text),
            _ => None,
        };

        Ok(Box::pin(stream! {
            if let Some(text) = text {
                // Chunked like a real service
                let chars: Vec<char> = text.chars().collect();
                for chunk in chars.chunks(20) {
                    yield Ok(StreamDelta::Text(chunk.iter().collect()));
                }
            }
            let stop = if calls.is_empty() { "STOP" } else { "TOOL_CALL" };
            for (i, (name, args)) in calls.into_iter().enumerate() {
                let id = format!("call_{}_{}", n, i + 1);
                yield Ok(StreamDelta::ToolCallStart { id: id.clone(), name });
                yield Ok(StreamDelta::ToolCallDelta { id: id.clone(), arguments: args.to_string() });
                yield Ok(StreamDelta::ToolCallEnd { id });
            }
            yield Ok(StreamDelta::Done { stop_reason: Some(stop.to_string()), usage: None });
        }))
    }
}
