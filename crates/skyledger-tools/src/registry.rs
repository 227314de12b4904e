//! Tool registry and trait definitions
//!
//! Each tool is a self-contained module implementing the Tool trait and
//! registered in create_default_registry() in lib.rs.

use crate::invocation::ToolInvocation;
use serde_json::Value;
use skyledger_core::{Block, Error, Result};
use skyledger_llm::LlmTool;
use std::collections::HashMap;
use std::sync::Arc;

/// What a tool hands back to the conversation.
#[derive(Clone, Debug)]
pub struct ToolOutput {
    /// Natural-language result fed back to the service.
    pub summary: String,
    /// Block appended while running, if any.
    pub block: Option<Block>,
}

/// A capability the chat assistant can invoke.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name as the service sees it.
    fn name(&self) -> &str;

    /// Human-readable description sent to the service.
    fn description(&self) -> &str;

    /// JSON Schema for input parameters.
    fn input_schema(&self) -> Value;

    /// Run an already-validated invocation.
    async fn execute(&self, invocation: ToolInvocation) -> Result<ToolOutput>;

    fn to_llm_tool(&self) -> LlmTool {
        LlmTool {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: impl Tool + 'static) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Validate raw arguments and run the named tool.
    pub async fn execute(&self, name: &str, args: &Value) -> Result<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;
        let invocation = ToolInvocation::parse(name, args)?;
        tool.execute(invocation).await
    }

    /// Tool definitions advertised to the service, sorted by name.
    pub fn get_definitions(&self) -> Vec<LlmTool> {
        let mut defs: Vec<LlmTool> = self.tools.values().map(|t| t.to_llm_tool()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }
}
