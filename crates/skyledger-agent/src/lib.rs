//! Skyledger Agent - the conversational path into the ledger

pub mod runtime;
pub mod session;

pub use runtime::{AgentConfig, AgentEvent, AgentSession, SessionState};
pub use session::Session;
