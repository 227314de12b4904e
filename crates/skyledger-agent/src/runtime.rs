//! Agent runtime - one conversational turn at a time
//!
//! A turn moves `Idle -> AwaitingModelReply`, then either straight to
//! `TurnComplete` (plain text) or through `ToolInvocationRequested` and a
//! second service call before completing. The session then returns to
//! `Idle`. Only one turn may be in flight.

use crate::session::Session;
use futures::StreamExt;
use skyledger_core::{
    Block, ChatMessage, Error, Result, SessionKey, SkyledgerConfig, CHAT_FAILURE_MESSAGE,
};
use skyledger_llm::{
    AccumulatedToolCall, ContentBlock, LlmProvider, LlmRequest, StreamDelta,
};
use skyledger_tools::ToolRegistry;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingModelReply,
    ToolInvocationRequested,
    TurnComplete,
}

#[derive(Clone, Debug)]
pub enum AgentEvent {
    StateChanged(SessionState),
    /// Streamed reply text
    Text(String),
    ToolExecuting {
        id: String,
        name: String,
    },
    ToolResult {
        id: String,
        name: String,
        result: String,
        is_error: bool,
    },
    BlockAppended(Block),
    Reply(ChatMessage),
    Error(String),
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
    pub greeting: Option<String>,
    /// Upper bound for each service call
    pub request_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::from(&SkyledgerConfig::default())
    }
}

impl From<&SkyledgerConfig> for AgentConfig {
    fn from(config: &SkyledgerConfig) -> Self {
        Self {
            model: config.service.model.clone(),
            max_tokens: config.service.max_tokens,
            temperature: config.service.temperature,
            system_prompt: config.service.system_prompt.clone(),
            greeting: Some(config.agent.greeting.clone()).filter(|g| !g.is_empty()),
            request_timeout: Duration::from_secs(config.agent.request_timeout_secs),
        }
    }
}

/// Text and tool calls gathered from one streamed reply.
#[derive(Debug, Default)]
struct ServiceReply {
    text: String,
    tool_calls: Vec<AccumulatedToolCall>,
}

pub struct AgentSession {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    session: Session,
    config: AgentConfig,
    state: Mutex<SessionState>,
    events: Option<mpsc::UnboundedSender<AgentEvent>>,
}

/// Returns the session to Idle when the turn ends, however it ends.
struct TurnGuard<'a> {
    agent: &'a AgentSession,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        self.agent.set_state(SessionState::Idle);
    }
}

impl AgentSession {
    pub fn new(
        key: SessionKey,
        provider: Arc<dyn LlmProvider>,
        tools: ToolRegistry,
        config: AgentConfig,
    ) -> Self {
        if !provider.supports_model(&config.model) {
            warn!(
                "Provider {} does not list model {}; requests may be rejected",
                provider.name(),
                config.model
            );
        }
        let session = Session::new(key, config.system_prompt.as_deref(), config.greeting.as_deref());
        Self {
            provider,
            tools: Arc::new(tools),
            session,
            config,
            state: Mutex::new(SessionState::Idle),
            events: None,
        }
    }

    /// Publish [`AgentEvent`]s on `tx` for a presentation layer.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<AgentEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn key(&self) -> &SessionKey {
        &self.session.key
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    pub fn is_busy(&self) -> bool {
        self.state() != SessionState::Idle
    }

    pub async fn transcript(&self) -> Vec<ChatMessage> {
        self.session.transcript().await
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run one conversational turn and return the bot's reply.
    ///
    /// Blank input and input arriving while a turn is in flight are
    /// rejected without recording anything. Every other failure becomes
    /// the generic apology as the bot's reply.
    pub async fn send(&self, utterance: &str) -> Result<ChatMessage> {
        if utterance.trim().is_empty() {
            return Err(Error::EmptyUtterance);
        }
        let _turn = self.begin_turn()?;

        self.session.add_user_message(utterance).await;

        let reply = match self.run_turn().await {
            Ok(text) => ChatMessage::bot(text),
            Err(e) => {
                error!(session = %self.session.key, "Turn failed: {}", e);
                self.emit(AgentEvent::Error(e.to_string()));
                ChatMessage::bot(CHAT_FAILURE_MESSAGE)
            }
        };

        self.session.add_bot_message(reply.clone()).await;
        self.emit(AgentEvent::Reply(reply.clone()));
        info!(
            "Turn complete: session={}, messages={}",
            self.session.key,
            self.session.message_count().await
        );
        Ok(reply)
    }

    fn begin_turn(&self) -> Result<TurnGuard<'_>> {
        let mut state = self.lock_state();
        if *state != SessionState::Idle {
            return Err(Error::SessionBusy);
        }
        *state = SessionState::AwaitingModelReply;
        drop(state);
        self.emit(AgentEvent::StateChanged(SessionState::AwaitingModelReply));
        Ok(TurnGuard { agent: self })
    }

    async fn run_turn(&self) -> Result<String> {
        let reply = self.call_service().await?;

        let mut calls = reply.tool_calls.into_iter();
        let Some(call) = calls.next() else {
            self.set_state(SessionState::TurnComplete);
            return self.finish(reply.text).await;
        };
        for extra in calls {
            warn!("Dropping extra tool call {} ({}): one call per turn", extra.name, extra.id);
        }

        self.set_state(SessionState::ToolInvocationRequested);
        let text = Some(reply.text.as_str()).filter(|t| !t.is_empty());
        self.session
            .add_assistant_with_tools(
                text,
                vec![ContentBlock::ToolUse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.parse_arguments().unwrap_or_default(),
                }],
            )
            .await;

        self.run_tool(&call).await?;

        self.set_state(SessionState::AwaitingModelReply);
        let follow_up = self.call_service().await?;
        if !follow_up.tool_calls.is_empty() {
            warn!(
                "Ignoring {} tool call(s) in the reply to a tool result",
                follow_up.tool_calls.len()
            );
        }
        self.set_state(SessionState::TurnComplete);
        self.finish(follow_up.text).await
    }

    /// Execute the tool and feed its result back into the dialogue.
    async fn run_tool(&self, call: &AccumulatedToolCall) -> Result<()> {
        self.emit(AgentEvent::ToolExecuting {
            id: call.id.clone(),
            name: call.name.clone(),
        });

        let outcome = match call.parse_arguments() {
            Ok(args) => self.tools.execute(&call.name, &args).await,
            Err(e) => Err(Error::malformed_arguments(&call.name, e.to_string())),
        };

        match outcome {
            Ok(output) => {
                if let Some(block) = output.block {
                    self.emit(AgentEvent::BlockAppended(block));
                }
                self.emit(AgentEvent::ToolResult {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    result: output.summary.clone(),
                    is_error: false,
                });
                self.session.add_tool_result(&call.id, &output.summary, false).await;
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.emit(AgentEvent::ToolResult {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    result: message.clone(),
                    is_error: true,
                });
                self.session.add_tool_result(&call.id, &message, true).await;
                Err(e)
            }
        }
    }

    async fn finish(&self, text: String) -> Result<String> {
        if text.trim().is_empty() {
            return Err(Error::service_failure("empty reply"));
        }
        self.session.add_assistant_text(&text).await;
        Ok(text)
    }

    async fn call_service(&self) -> Result<ServiceReply> {
        let request = LlmRequest {
            model: self.config.model.clone(),
            messages: self.session.get_messages().await,
            tools: Some(self.tools.get_definitions()),
            max_tokens: Some(self.config.max_tokens),
            temperature: self.config.temperature,
            system: self.session.system_prompt().map(String::from),
        };
        debug!(
            "Calling {} with {} messages",
            self.provider.name(),
            request.messages.len()
        );

        tokio::time::timeout(self.config.request_timeout, self.stream_reply(request))
            .await
            .map_err(|_| Error::Timeout {
                operation: "generative service",
                secs: self.config.request_timeout.as_secs(),
            })?
    }

    async fn stream_reply(&self, request: LlmRequest) -> Result<ServiceReply> {
        let stream = self
            .provider
            .complete_stream(request)
            .await
            .map_err(|e| Error::service_failure(e.to_string()))?;

        let mut reply = ServiceReply::default();
        let mut current_tool: Option<AccumulatedToolCall> = None;

        tokio::pin!(stream);

        while let Some(delta) = stream.next().await {
            match delta.map_err(|e| Error::service_failure(e.to_string()))? {
                StreamDelta::Text(text) => {
                    reply.text.push_str(&text);
                    self.emit(AgentEvent::Text(text));
                }
                StreamDelta::ToolCallStart { id, name } => {
                    current_tool = Some(AccumulatedToolCall { id, name, arguments: String::new() });
                }
                StreamDelta::ToolCallDelta { arguments, .. } => {
                    if let Some(ref mut tool) = current_tool {
                        tool.arguments.push_str(&arguments);
                    }
                }
                StreamDelta::ToolCallEnd { .. } => {
                    if let Some(tool) = current_tool.take() {
                        reply.tool_calls.push(tool);
                    }
                }
                StreamDelta::Done { stop_reason, .. } => {
                    debug!("Reply done: stop_reason={:?}", stop_reason);
                }
                StreamDelta::Error(e) => return Err(Error::service_failure(e)),
            }
        }

        Ok(reply)
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, next: SessionState) {
        *self.lock_state() = next;
        self.emit(AgentEvent::StateChanged(next));
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyledger_llm::{ScriptedProvider, ScriptedReply};

    fn agent(replies: Vec<ScriptedReply>) -> AgentSession {
        AgentSession::new(
            SessionKey::new("unit"),
            Arc::new(ScriptedProvider::sequence(replies)),
            ToolRegistry::new(),
            AgentConfig::default(),
        )
    }

    #[tokio::test]
    async fn plain_text_turn() {
        let agent = agent(vec![ScriptedReply::text("Hello! Ask me about the weather.")]);
        let reply = agent.send("hi").await.unwrap();
        assert_eq!(reply, ChatMessage::bot("Hello! Ask me about the weather."));
        assert_eq!(agent.state(), SessionState::Idle);
        // greeting, user, bot
        assert_eq!(agent.transcript().await.len(), 3);
        assert_eq!(agent.session().message_count().await, 2);
    }

    #[tokio::test]
    async fn blank_input_is_rejected() {
        let agent = agent(vec![]);
        assert!(matches!(agent.send("   ").await, Err(Error::EmptyUtterance)));
        assert_eq!(agent.transcript().await.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_yields_apology() {
        let agent = agent(vec![ScriptedReply::tool_call("getWeatherForLocation", serde_json::json!({}))]);
        let reply = agent.send("weather?").await.unwrap();
        assert_eq!(reply.text, CHAT_FAILURE_MESSAGE);
        assert!(!agent.is_busy());
    }

    #[tokio::test]
    async fn empty_reply_is_a_failure() {
        let agent = agent(vec![ScriptedReply::text("")]);
        let reply = agent.send("hi").await.unwrap();
        assert_eq!(reply.text, CHAT_FAILURE_MESSAGE);
    }

    #[test]
    fn config_from_settings() {
        let mut settings = SkyledgerConfig::default();
        settings.agent.request_timeout_secs = 5;
        settings.agent.greeting = String::new();
        let config = AgentConfig::from(&settings);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(config.greeting.is_none());
    }
}
