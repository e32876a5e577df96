//! The security check gate.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use colloquy_core::CheckType;

use crate::backend::ModerationBackend;
use crate::types::{HistoryEntry, ModerationRequest, SecurityCheckResult};

/// Default moderation call timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Gate configuration.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Per-call timeout for the moderation endpoint.
    pub timeout: Duration,
    /// Check types that are enabled. Disabled types resolve to `good`
    /// without a network call.
    pub enabled: HashSet<CheckType>,
}

impl GuardConfig {
    /// Enable or disable a check type.
    #[must_use]
    pub fn with_check(mut self, check_type: CheckType, enabled: bool) -> Self {
        if enabled {
            self.enabled.insert(check_type);
        } else {
            self.enabled.remove(&check_type);
        }
        self
    }

    /// Set the moderation call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            enabled: CheckType::ALL.into_iter().collect(),
        }
    }
}

/// The moderation gate.
///
/// `check()` never returns an error: a backend failure or timeout
/// resolves to a fail-open `good` verdict and increments the failure
/// counter. Callers enforce the verdict — a `blocked` result means the
/// content must be stripped from history and must never reach the
/// publisher.
pub struct SecurityCheckGate {
    backend: Arc<dyn ModerationBackend>,
    config: GuardConfig,
    /// Count of moderation calls that failed and resolved fail-open.
    fail_open_count: AtomicU64,
}

impl SecurityCheckGate {
    /// Create a gate over a backend.
    pub fn new(backend: Arc<dyn ModerationBackend>, config: GuardConfig) -> Self {
        Self {
            backend,
            config,
            fail_open_count: AtomicU64::new(0),
        }
    }

    /// Run one checkpoint.
    ///
    /// Resolves to `good` without a network call when the check type is
    /// disabled, and to `good` (fail-open) when the backend errors or the
    /// call exceeds the configured timeout.
    pub async fn check(
        &self,
        content: &str,
        check_type: CheckType,
        username: &str,
        history: Vec<HistoryEntry>,
    ) -> SecurityCheckResult {
        if !self.config.enabled.contains(&check_type) {
            debug!(check_type = %check_type, "Check type disabled, skipping");
            return SecurityCheckResult::good();
        }

        let request = ModerationRequest {
            content: content.to_string(),
            check_type,
            username: username.to_string(),
            history,
        };

        let outcome = tokio::time::timeout(self.config.timeout, self.backend.classify(&request)).await;

        match outcome {
            Ok(Ok(result)) => {
                debug!(
                    check_type = %check_type,
                    status = %result.status,
                    "Moderation check resolved"
                );
                result
            },
            Ok(Err(e)) => {
                self.fail_open_count.fetch_add(1, Ordering::Relaxed);
                warn!(
                    check_type = %check_type,
                    error = %e,
                    "Moderation call failed, failing open"
                );
                SecurityCheckResult::good()
            },
            Err(_) => {
                self.fail_open_count.fetch_add(1, Ordering::Relaxed);
                let timeout_ms = u64::try_from(self.config.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(
                    check_type = %check_type,
                    timeout_ms,
                    "Moderation call timed out, failing open"
                );
                SecurityCheckResult::good()
            },
        }
    }

    /// Number of checks that failed and resolved fail-open.
    #[must_use]
    pub fn fail_open_count(&self) -> u64 {
        self.fail_open_count.load(Ordering::Relaxed)
    }

    /// Gate configuration.
    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }
}

impl std::fmt::Debug for SecurityCheckGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityCheckGate")
            .field("config", &self.config)
            .field("fail_open_count", &self.fail_open_count)
            .finish_non_exhaustive()
    }
}
