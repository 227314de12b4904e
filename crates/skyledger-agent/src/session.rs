//! Dialogue state for one chat session
//!
//! Two parallel records are kept: the service-facing dialogue history
//! (`LlmMessage`s, including tool calls and tool results) and the
//! user-facing transcript (`ChatMessage`s). Neither is ever rolled back.

use skyledger_core::{ChatMessage, SessionKey};
use skyledger_llm::{ContentBlock, LlmContent, LlmMessage};
use tokio::sync::RwLock;

pub struct Session {
    pub key: SessionKey,
    system_prompt: Option<String>,
    messages: RwLock<Vec<LlmMessage>>,
    transcript: RwLock<Vec<ChatMessage>>,
}

impl Session {
    /// New session whose transcript opens with `greeting`, if any.
    pub fn new(key: SessionKey, system_prompt: Option<&str>, greeting: Option<&str>) -> Self {
        Self {
            key,
            system_prompt: system_prompt.map(String::from),
            messages: RwLock::new(Vec::new()),
            transcript: RwLock::new(greeting.map(ChatMessage::bot).into_iter().collect()),
        }
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Record a user utterance in both history and transcript.
    pub async fn add_user_message(&self, content: &str) {
        self.messages.write().await.push(LlmMessage::user(content));
        self.transcript.write().await.push(ChatMessage::user(content));
    }

    pub async fn add_assistant_text(&self, content: &str) {
        self.messages.write().await.push(LlmMessage::assistant(content));
    }

    pub async fn add_assistant_with_tools(&self, text: Option<&str>, tool_calls: Vec<ContentBlock>) {
        let mut blocks = Vec::new();
        if let Some(t) = text.filter(|t| !t.is_empty()) {
            blocks.push(ContentBlock::Text { text: t.to_string() });
        }
        blocks.extend(tool_calls);
        self.messages.write().await.push(LlmMessage {
            role: "assistant".to_string(),
            content: LlmContent::Blocks(blocks),
        });
    }

    /// Feed a tool result back, keyed by the originating call id.
    pub async fn add_tool_result(&self, tool_use_id: &str, content: &str, is_error: bool) {
        let block = ContentBlock::ToolResult {
            tool_use_id: tool_use_id.to_string(),
            content: content.to_string(),
            is_error: if is_error { Some(true) } else { None },
        };
        self.messages.write().await.push(LlmMessage {
            role: "user".to_string(),
            content: LlmContent::Blocks(vec![block]),
        });
    }

    /// Record the bot's reply in the transcript.
    pub async fn add_bot_message(&self, message: ChatMessage) {
        self.transcript.write().await.push(message);
    }

    pub async fn get_messages(&self) -> Vec<LlmMessage> {
        self.messages.read().await.clone()
    }

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.transcript.read().await.clone()
    }
}
