//! Individual tool implementations.
//!
//! To add a tool: create a file here, implement the Tool trait, and
//! register it in create_default_registry() in ../lib.rs.

pub mod weather;
