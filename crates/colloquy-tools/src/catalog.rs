//! Tool catalog.
//!
//! Servers declare tools; the catalog is the single place the rest of the
//! engine asks "what exists, who may use it, what schema does the model
//! see".

use colloquy_core::ToolRef;
use colloquy_llm::LlmToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// A tool as declared by its server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Server that declares the tool.
    pub server: String,
    /// Tool name within the server.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON Schema for input parameters.
    pub input_schema: Value,
    /// Groups whose members may use tools from this server.
    pub groups: BTreeSet<String>,
    /// Declared compliance level, if any. Untagged tools are excluded
    /// whenever a compliance filter is active.
    pub compliance_level: Option<String>,
}

impl ToolDescriptor {
    /// Create a new descriptor with an open schema and no groups.
    pub fn new(server: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            name: name.into(),
            description: None,
            input_schema: serde_json::json!({"type": "object"}),
            groups: BTreeSet::new(),
            compliance_level: None,
        }
    }

    /// Set description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Set input schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Add an authorized group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    /// Set the compliance level.
    #[must_use]
    pub fn with_compliance_level(mut self, level: impl Into<String>) -> Self {
        self.compliance_level = Some(level.into());
        self
    }

    /// The tool reference for this descriptor.
    #[must_use]
    pub fn tool_ref(&self) -> ToolRef {
        ToolRef::new(&self.server, &self.name)
    }

    /// The `server:tool` wire form.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.server, self.name)
    }

    /// The schema handed to the LLM for this tool.
    #[must_use]
    pub fn to_llm_definition(&self) -> LlmToolDefinition {
        let mut def = LlmToolDefinition::new(self.full_name()).with_schema(self.input_schema.clone());
        if let Some(ref desc) = self.description {
            def = def.with_description(desc.clone());
        }
        def
    }
}

/// The set of declared tools.
#[derive(Debug, Clone, Default)]
pub struct ToolCatalog {
    tools: Vec<ToolDescriptor>,
}

impl ToolCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool. A descriptor with the same `server:tool` name
    /// replaces the previous one.
    pub fn register(&mut self, descriptor: ToolDescriptor) {
        self.tools
            .retain(|t| t.server != descriptor.server || t.name != descriptor.name);
        self.tools.push(descriptor);
    }

    /// Register a tool, builder style.
    #[must_use]
    pub fn with_tool(mut self, descriptor: ToolDescriptor) -> Self {
        self.register(descriptor);
        self
    }

    /// All descriptors.
    #[must_use]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    /// Look up a descriptor by reference.
    #[must_use]
    pub fn get(&self, tool: &ToolRef) -> Option<&ToolDescriptor> {
        self.tools
            .iter()
            .find(|t| t.server == tool.server && t.name == tool.name)
    }

    /// Descriptors for a selected subset, skipping unknown references.
    #[must_use]
    pub fn select(&self, refs: &BTreeSet<ToolRef>) -> Vec<ToolDescriptor> {
        refs.iter().filter_map(|r| self.get(r).cloned()).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_llm_definition() {
        let descriptor = ToolDescriptor::new("search", "web_lookup")
            .with_description("Look things up")
            .with_schema(serde_json::json!({"type": "object", "properties": {"query": {"type": "string"}}}));

        let def = descriptor.to_llm_definition();
        assert_eq!(def.name, "search:web_lookup");
        assert_eq!(def.description.as_deref(), Some("Look things up"));
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut catalog = ToolCatalog::new();
        catalog.register(ToolDescriptor::new("search", "web_lookup"));
        catalog.register(ToolDescriptor::new("search", "web_lookup").with_group("staff"));

        assert_eq!(catalog.len(), 1);
        let tool = catalog.get(&ToolRef::new("search", "web_lookup")).unwrap();
        assert!(tool.groups.contains("staff"));
    }

    #[test]
    fn test_select_skips_unknown() {
        let catalog = ToolCatalog::new().with_tool(ToolDescriptor::new("search", "web_lookup"));

        let mut refs = BTreeSet::new();
        refs.insert(ToolRef::new("search", "web_lookup"));
        refs.insert(ToolRef::new("missing", "tool"));

        let selected = catalog.select(&refs);
        assert_eq!(selected.len(), 1);
    }
}
