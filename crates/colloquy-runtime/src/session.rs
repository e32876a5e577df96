//! Session state.
//!
//! A session is pure data with versioned mutation: every change bumps the
//! version counter, and the message list is append-only except for the two
//! surgical removals the moderation gate demands (a blocked input or
//! blocked output is stripped immediately, before any publish).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use colloquy_approval::{ApprovalManager, GrantStore};
use colloquy_authz::ComplianceFilter;
use colloquy_core::{SessionId, SourceRef, ToolRef, UserProfile};
use colloquy_guard::HistoryEntry;
use colloquy_llm::{Message, MessageContent, MessageRole};

/// A chat session.
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier.
    pub id: SessionId,
    /// The user this session belongs to.
    pub user: UserProfile,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Tools the user has selected for this session.
    pub selected_tools: BTreeSet<ToolRef>,
    /// Retrieval sources the user has selected.
    pub selected_sources: BTreeSet<SourceRef>,
    /// Active compliance filter, if any.
    pub compliance_filter: Option<ComplianceFilter>,
    /// Session approval manager (grants live as long as the session).
    pub approval: Arc<ApprovalManager>,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Estimated token count.
    pub token_count: usize,
    /// Mutation counter; bumps on every change.
    pub version: u64,
    /// Session metadata.
    pub metadata: SessionMetadata,
}

impl Session {
    /// Create a new session for a user.
    #[must_use]
    pub fn new(user: UserProfile) -> Self {
        Self::with_id(SessionId::new(), user)
    }

    /// Create with a specific session ID.
    #[must_use]
    pub fn with_id(id: SessionId, user: UserProfile) -> Self {
        Self {
            id,
            user,
            messages: Vec::new(),
            selected_tools: BTreeSet::new(),
            selected_sources: BTreeSet::new(),
            compliance_filter: None,
            approval: Arc::new(ApprovalManager::new(Arc::new(GrantStore::new()))),
            created_at: Utc::now(),
            token_count: 0,
            version: 0,
            metadata: SessionMetadata::default(),
        }
    }

    /// Select a tool for this session.
    #[must_use]
    pub fn with_tool(mut self, tool: ToolRef) -> Self {
        self.selected_tools.insert(tool);
        self
    }

    /// Select a retrieval source for this session.
    #[must_use]
    pub fn with_source(mut self, source: SourceRef) -> Self {
        self.selected_sources.insert(source);
        self
    }

    /// Set the compliance filter.
    #[must_use]
    pub fn with_compliance_filter(mut self, filter: ComplianceFilter) -> Self {
        self.compliance_filter = Some(filter);
        self
    }

    /// Add a message.
    pub fn add_message(&mut self, message: Message) {
        // Rough token estimate (4 chars per token), for context-limit
        // warnings rather than billing.
        let msg_tokens = match &message.content {
            MessageContent::Text(t) => t.len() / 4,
            _ => 100,
        };
        self.token_count = self.token_count.saturating_add(msg_tokens);
        self.messages.push(message);
        self.version = self.version.saturating_add(1);
    }

    /// Remove the most recent message, if any.
    ///
    /// This is the surgical removal the moderation gate requires; it is
    /// the only way a message leaves history short of a reset.
    pub fn remove_last_message(&mut self) -> Option<Message> {
        let removed = self.messages.pop();
        if removed.is_some() {
            self.version = self.version.saturating_add(1);
        }
        removed
    }

    /// Clear all messages.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
        self.token_count = 0;
        self.version = self.version.saturating_add(1);
    }

    /// Drop oldest messages beyond `max` to cap history growth.
    pub fn enforce_history_cap(&mut self, max: usize) {
        if self.messages.len() > max {
            let excess = self.messages.len().saturating_sub(max);
            self.messages.drain(..excess);
            self.version = self.version.saturating_add(1);
        }
    }

    /// The last `n` text messages as moderation history entries.
    #[must_use]
    pub fn history_for_moderation(&self, n: usize) -> Vec<HistoryEntry> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..]
            .iter()
            .filter_map(|m| {
                let role = match m.role {
                    MessageRole::System => "system",
                    MessageRole::User => "user",
                    MessageRole::Assistant => "assistant",
                    MessageRole::Tool => "tool",
                };
                m.text().map(|text| HistoryEntry::new(role, text))
            })
            .collect()
    }
}

/// Session metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Session title (generated or user-provided).
    pub title: Option<String>,
    /// Number of turns.
    pub turn_count: usize,
    /// Number of tool calls.
    pub tool_call_count: usize,
}

/// Serializable session state (for the storage collaborator).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializableSession {
    /// Session ID.
    pub id: String,
    /// User profile.
    pub user: UserProfile,
    /// Messages (JSON-encoded content).
    pub messages: Vec<serde_json::Value>,
    /// Selected tools.
    pub selected_tools: BTreeSet<ToolRef>,
    /// Selected sources.
    pub selected_sources: BTreeSet<SourceRef>,
    /// Compliance filter.
    #[serde(default)]
    pub compliance_filter: Option<ComplianceFilter>,
    /// Created at.
    pub created_at: DateTime<Utc>,
    /// Token count.
    pub token_count: usize,
    /// Mutation counter.
    #[serde(default)]
    pub version: u64,
    /// Metadata.
    pub metadata: SessionMetadata,
}

impl From<&Session> for SerializableSession {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id.0.to_string(),
            user: session.user.clone(),
            messages: session
                .messages
                .iter()
                .map(|m| serde_json::to_value(m).unwrap_or_default())
                .collect(),
            selected_tools: session.selected_tools.clone(),
            selected_sources: session.selected_sources.clone(),
            compliance_filter: session.compliance_filter.clone(),
            created_at: session.created_at,
            token_count: session.token_count,
            version: session.version,
            metadata: session.metadata.clone(),
        }
    }
}

impl SerializableSession {
    /// Convert back to an in-memory [`Session`].
    ///
    /// Messages that fail to decode are dropped rather than failing the
    /// whole restore.
    #[must_use]
    pub fn to_session(&self) -> Session {
        let id = SessionId::parse(&self.id).unwrap_or_default();
        let mut session = Session::with_id(id, self.user.clone());
        session.messages = self
            .messages
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect();
        session.selected_tools = self.selected_tools.clone();
        session.selected_sources = self.selected_sources.clone();
        session.compliance_filter = self.compliance_filter.clone();
        session.created_at = self.created_at;
        session.token_count = self.token_count;
        session.version = self.version;
        session.metadata = self.metadata.clone();
        session
    }
}
