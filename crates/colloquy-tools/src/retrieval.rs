//! Document retrieval (RAG) client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use colloquy_core::SourceRef;

use crate::error::{ToolsError, ToolsResult};

/// A ranked snippet returned by the retrieval service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    /// Source the snippet came from.
    pub source: String,
    /// Snippet text.
    pub content: String,
    /// Relevance score, higher is better.
    pub score: f64,
}

/// The document-retrieval collaborator.
#[async_trait]
pub trait RetrievalClient: Send + Sync {
    /// Query the configured sources for snippets relevant to `text`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolsError`] when the retrieval service cannot be
    /// reached or returns garbage; callers degrade to an empty context.
    async fn query(
        &self,
        sources: &[SourceRef],
        text: &str,
        top_k: usize,
    ) -> ToolsResult<Vec<Snippet>>;
}

/// HTTP retrieval client.
pub struct HttpRetrievalClient {
    client: Client,
    endpoint: String,
}

impl HttpRetrievalClient {
    /// Create a client for the given retrieval endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl std::fmt::Debug for HttpRetrievalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRetrievalClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct WireSnippets {
    snippets: Vec<Snippet>,
}

#[async_trait]
impl RetrievalClient for HttpRetrievalClient {
    async fn query(
        &self,
        sources: &[SourceRef],
        text: &str,
        top_k: usize,
    ) -> ToolsResult<Vec<Snippet>> {
        debug!(source_count = sources.len(), top_k, "Querying retrieval service");

        let body = serde_json::json!({
            "sources": sources,
            "query": text,
            "top_k": top_k,
        });

        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(ToolsError::RetrievalFailed(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        let wire: WireSnippets = response
            .json()
            .await
            .map_err(|e| ToolsError::RetrievalFailed(e.to_string()))?;

        Ok(wire.snippets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_deserializes() {
        let snippet: Snippet = serde_json::from_str(
            r#"{"source": "handbook", "content": "PTO policy...", "score": 0.92}"#,
        )
        .unwrap();
        assert_eq!(snippet.source, "handbook");
        assert!(snippet.score > 0.9);
    }
}
