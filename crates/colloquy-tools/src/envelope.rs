//! Envelope normalization.
//!
//! The remote tool protocol returns loosely-shaped JSON envelopes:
//! `{results, meta_data?, artifacts?}` on success, `{error}` on tool-side
//! failure, and occasionally garbage. This module is the single boundary
//! where those shapes become the closed [`ToolOutcome`] variant; no code
//! downstream of it branches on untyped maps.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to an artifact produced by a tool.
///
/// Artifact bytes are persisted out-of-band by the transport; only the
/// reference travels with the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRef {
    /// Artifact name.
    pub name: String,
    /// MIME hint, if declared.
    pub mime_type: Option<String>,
    /// Retrieval reference (storage key or download URL).
    pub reference: Option<String>,
}

/// Normalized result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ToolOutcome {
    /// The tool produced a payload.
    Success {
        /// Structured result value.
        payload: Value,
        /// References to out-of-band artifacts.
        artifacts: Vec<ArtifactRef>,
    },
    /// The tool reported a failure.
    Error {
        /// Failure description.
        message: String,
    },
}

impl ToolOutcome {
    /// Render the outcome as text for the model context.
    ///
    /// Artifact references are listed by name; artifact bytes never enter
    /// model context.
    #[must_use]
    pub fn render_for_model(&self) -> String {
        match self {
            Self::Success { payload, artifacts } => {
                let mut text = match payload {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                for artifact in artifacts {
                    let mime = artifact.mime_type.as_deref().unwrap_or("unknown");
                    let reference = artifact.reference.as_deref().unwrap_or("unavailable");
                    text.push_str(&format!(
                        "\n[artifact: {} ({mime}) -> {reference}]",
                        artifact.name
                    ));
                }
                text
            },
            Self::Error { message } => message.clone(),
        }
    }

    /// Whether this is a success outcome.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Normalize a raw transport envelope into a [`ToolOutcome`].
///
/// Malformed envelopes become `Error`, never a panic.
#[must_use]
pub fn normalize_envelope(raw: Value) -> ToolOutcome {
    let Value::Object(map) = raw else {
        return ToolOutcome::Error {
            message: "tool returned a non-object envelope".to_string(),
        };
    };

    if let Some(error) = map.get("error") {
        let message = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        return ToolOutcome::Error { message };
    }

    let Some(results) = map.get("results") else {
        return ToolOutcome::Error {
            message: "tool envelope missing `results` field".to_string(),
        };
    };

    let artifacts = map
        .get("artifacts")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(parse_artifact).collect())
        .unwrap_or_default();

    ToolOutcome::Success {
        payload: results.clone(),
        artifacts,
    }
}

/// Parse one artifact entry, dropping malformed ones.
fn parse_artifact(entry: &Value) -> Option<ArtifactRef> {
    let obj = entry.as_object()?;
    let name = obj.get("name")?.as_str()?.to_string();
    Some(ArtifactRef {
        name,
        mime_type: obj
            .get("mime_type")
            .and_then(Value::as_str)
            .map(String::from),
        reference: obj
            .get("reference")
            .and_then(Value::as_str)
            .map(String::from),
    })
}
