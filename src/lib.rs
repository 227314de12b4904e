//! Skyledger - a hash-chained ledger of weather observations, fed by a
//! manual form and a conversational assistant.

pub mod app;
pub mod render;

pub use app::{App, Command, Outcome};
