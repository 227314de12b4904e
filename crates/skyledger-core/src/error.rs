//! Error types for Skyledger

use crate::types::LocationDescriptor;
use thiserror::Error;

/// Text shown to the user for any failed chat turn.
pub const CHAT_FAILURE_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

#[derive(Error, Debug)]
pub enum Error {
    #[error("oracle failure for {location}: {message}")]
    OracleFailure {
        location: LocationDescriptor,
        message: String,
    },

    #[error("service failure: {0}")]
    ServiceFailure(String),

    #[error("malformed arguments for tool {tool}: {reason}")]
    MalformedToolArguments { tool: String, reason: String },

    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("a turn is already in flight")]
    SessionBusy,

    #[error("empty utterance")]
    EmptyUtterance,

    #[error("form is incomplete: {0} is required")]
    IncompleteForm(&'static str),

    #[error("{operation} timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },

    #[error("config error: {0}")]
    Config(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn oracle_failure(location: &LocationDescriptor, message: impl Into<String>) -> Self {
        Self::OracleFailure {
            location: location.clone(),
            message: message.into(),
        }
    }

    pub fn service_failure(message: impl Into<String>) -> Self {
        Self::ServiceFailure(message.into())
    }

    pub fn malformed_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedToolArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// The single message a user sees when an action fails.
    ///
    /// Oracle failures keep the oracle's wording so the form path can show
    /// which location could not be fetched.
    pub fn user_message(&self) -> String {
        match self {
            Self::OracleFailure { message, .. } => message.clone(),
            Self::IncompleteForm(field) => format!("Please enter a {}.", field),
            Self::SessionBusy => "Please wait for the current reply.".to_string(),
            Self::EmptyUtterance => "Please type a message.".to_string(),
            _ => CHAT_FAILURE_MESSAGE.to_string(),
        }
    }
}
