//! References to tools and retrieval sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to a tool declared by a server.
///
/// The wire form is `server:tool`, split at the first colon; tool names may
/// themselves contain colons.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ToolRef {
    /// Server that declares the tool.
    pub server: String,
    /// Tool name within the server.
    pub name: String,
}

impl ToolRef {
    /// Create a new tool reference.
    pub fn new(server: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            name: name.into(),
        }
    }

    /// Parse the `server:tool` wire form.
    ///
    /// Returns `None` if no colon is present.
    #[must_use]
    pub fn parse(full_name: &str) -> Option<Self> {
        full_name
            .split_once(':')
            .map(|(server, name)| Self::new(server, name))
    }

    /// The `server:tool` wire form.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.server, self.name)
    }
}

impl fmt::Display for ToolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.server, self.name)
    }
}

/// Reference to a document-retrieval source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceRef(pub String);

impl SourceRef {
    /// Create a new source reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
