//! Skyledger LLM - generative text service adapters with streaming support

pub mod gemini;
pub mod provider;
pub mod scripted;
pub mod types;

pub use gemini::GeminiProvider;
pub use provider::{LlmError, LlmProvider, LlmResult, LlmStream};
pub use scripted::{ScriptedProvider, ScriptedReply};
pub use types::*;
