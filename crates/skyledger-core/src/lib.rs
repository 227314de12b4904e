//! Skyledger Core - Observation types, error taxonomy, and configuration

pub mod config;
pub mod error;
pub mod types;

pub use config::SkyledgerConfig;
pub use error::{Error, Result, CHAT_FAILURE_MESSAGE};
pub use types::*;
