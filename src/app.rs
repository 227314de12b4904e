//! Wiring: one ledger, one coordinator, the form path, and the chat session

use crate::render;
use skyledger_agent::{AgentConfig, AgentSession};
use skyledger_chain::{IngestionCoordinator, SharedLedger};
use skyledger_core::{system_clock, Block, Clock, Error, Result, SessionKey, SkyledgerConfig};
use skyledger_llm::{GeminiProvider, LlmProvider};
use skyledger_tools::{
    create_default_registry, FormInput, GeminiWeatherOracle, ManualEntry, ObservationSource,
    SimulatedOracle, WeatherOracle,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const HELP: &str = "\
Commands:
  /add <country>|<state>|<district>   add an observation through the form
  /ledger                             list blocks, newest first
  /verify                             check chain linkage and digests
  /config                             show the effective configuration
  /help                               show this help
  /quit                               exit
Anything else is sent to the weather assistant.
";

/// A parsed REPL line.
#[derive(Debug, PartialEq)]
pub enum Command {
    Add(String),
    Ledger,
    Verify,
    Config,
    Help,
    Quit,
    Chat(String),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Self::Chat(line.to_string());
        };
        let (name, arg) = rest.split_once(' ').unwrap_or((rest, ""));
        match name {
            "add" => Self::Add(arg.trim().to_string()),
            "ledger" => Self::Ledger,
            "verify" => Self::Verify,
            "config" => Self::Config,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// What the REPL should do after a line.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Print(String),
    Quit,
}

pub struct App {
    config: SkyledgerConfig,
    ledger: SharedLedger,
    manual: ManualEntry,
    agent: Option<AgentSession>,
}

impl App {
    /// Build from configuration. Offline mode uses the simulated oracle and
    /// disables the chat assistant; otherwise an API key is required.
    pub fn build(config: SkyledgerConfig, offline: bool) -> Result<Self> {
        if offline {
            info!("Offline: simulated oracle, chat disabled");
            return Ok(Self::with_parts(config, Arc::new(SimulatedOracle::new()), None, system_clock()));
        }

        let api_key = config.api_key()?;
        let oracle: Arc<dyn WeatherOracle> = if config.oracle.simulated {
            Arc::new(SimulatedOracle::new())
        } else {
            Arc::new(
                GeminiWeatherOracle::new(&api_key, &config.oracle.model)
                    .with_base_url(&config.oracle.base_url),
            )
        };
        let provider: Arc<dyn LlmProvider> =
            Arc::new(GeminiProvider::new(&api_key).with_base_url(&config.service.base_url));
        Ok(Self::with_parts(config, oracle, Some(provider), system_clock()))
    }

    /// Build from explicit parts. `provider: None` disables chat.
    pub fn with_parts(
        config: SkyledgerConfig,
        oracle: Arc<dyn WeatherOracle>,
        provider: Option<Arc<dyn LlmProvider>>,
        clock: Clock,
    ) -> Self {
        let ledger = SharedLedger::new();
        let coordinator = IngestionCoordinator::new(ledger.clone());
        let source = ObservationSource::new(
            oracle,
            Duration::from_secs(config.agent.request_timeout_secs),
        )
        .with_clock(clock);

        let agent = provider.map(|provider| {
            AgentSession::new(
                SessionKey::new("repl"),
                provider,
                create_default_registry(source.clone(), coordinator.clone()),
                AgentConfig::from(&config),
            )
        });

        info!("Oracle: {}, chat: {}", source.oracle_name(), agent.is_some());
        Self {
            manual: ManualEntry::new(source, coordinator),
            ledger,
            agent,
            config,
        }
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn agent(&self) -> Option<&AgentSession> {
        self.agent.as_ref()
    }

    pub fn config(&self) -> &SkyledgerConfig {
        &self.config
    }

    /// Text shown when the REPL starts.
    pub async fn banner(&self) -> String {
        let mut out = format!("skyledger v{}\n", env!("CARGO_PKG_VERSION"));
        match &self.agent {
            Some(agent) => {
                for message in agent.transcript().await {
                    out.push_str(&render::format_message(&message));
                }
            }
            None => out.push_str("Chat assistant is off. Use /add to record observations.\n"),
        }
        out.push_str("Type /help for commands.\n");
        out
    }

    /// Manual form path.
    pub async fn add(&self, form: &FormInput) -> Result<Block> {
        self.manual.submit(form).await
    }

    /// Conversational path. Returns the bot's reply text.
    pub async fn chat(&self, utterance: &str) -> Result<String> {
        let agent = self
            .agent
            .as_ref()
            .ok_or_else(|| Error::Config("chat assistant is disabled".into()))?;
        Ok(agent.send(utterance).await?.text)
    }

    /// Handle one REPL line.
    pub async fn dispatch(&self, line: &str) -> Outcome {
        let text = match Command::parse(line) {
            Command::Quit => return Outcome::Quit,
            Command::Help => HELP.to_string(),
            Command::Config => self.config.to_toml(),
            Command::Ledger => render::format_ledger(&self.ledger.snapshot().await),
            Command::Verify => {
                let result = self.ledger.verify().await;
                render::format_verification(self.ledger.len().await, &result)
            }
            Command::Add(arg) => match FormInput::parse_pipe(&arg) {
                Ok(form) => match self.add(&form).await {
                    Ok(block) => render::format_block(&block),
                    Err(e) => format!("{}\n", e.user_message()),
                },
                Err(e) => format!("{} Usage: /add <country>|<state>|<district>\n", e.user_message()),
            },
            Command::Chat(utterance) => match self.chat(&utterance).await {
                Ok(reply) => render::format_message(&skyledger_core::ChatMessage::bot(reply)),
                Err(Error::Config(reason)) => format!("{}. Restart without --offline to chat.\n", reason),
                Err(e) => format!("{}\n", e.user_message()),
            },
            Command::Unknown(name) => format!("Unknown command /{}. Type /help.\n", name),
        };
        Outcome::Print(text)
    }
}
