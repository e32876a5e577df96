//! Moderation backend implementations.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{GuardError, GuardResult};
use crate::types::{ModerationRequest, SecurityCheckResult};

/// Classifier behind the gate.
///
/// The production implementation is an HTTP call; tests script verdicts
/// and failures.
#[async_trait]
pub trait ModerationBackend: Send + Sync {
    /// Classify a piece of content.
    ///
    /// # Errors
    ///
    /// Returns a [`GuardError`] when the endpoint cannot be reached or
    /// answers with garbage; the gate resolves every error fail-open.
    async fn classify(&self, request: &ModerationRequest) -> GuardResult<SecurityCheckResult>;
}

/// HTTP moderation backend.
///
/// Posts `{content, check_type, username, history}` to the configured
/// endpoint and expects `{status, message, details}` back.
pub struct HttpModerationBackend {
    client: Client,
    endpoint: String,
}

impl HttpModerationBackend {
    /// Create a backend for the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl std::fmt::Debug for HttpModerationBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpModerationBackend")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ModerationBackend for HttpModerationBackend {
    async fn classify(&self, request: &ModerationRequest) -> GuardResult<SecurityCheckResult> {
        debug!(
            check_type = %request.check_type,
            username = %request.username,
            "Calling moderation endpoint"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GuardError::EndpointStatus {
                status: response.status().as_u16(),
            });
        }

        let result: SecurityCheckResult = response
            .json()
            .await
            .map_err(|e| GuardError::InvalidResponse(e.to_string()))?;

        Ok(result)
    }
}
