//! Bridge from the self-contained config crate into domain configs.
//!
//! `colloquy-config` deliberately knows nothing about the rest of the
//! workspace; this module converts its sections into the configuration
//! types each subsystem actually consumes.

use std::time::Duration;

use colloquy_agent::AgentConfig;
use colloquy_config::Config;
use colloquy_core::CheckType;
use colloquy_guard::GuardConfig;
use colloquy_llm::ProviderConfig;
use colloquy_tools::EngineConfig;

use crate::orchestrator::OrchestratorConfig;

/// Build the LLM provider configuration.
#[must_use]
pub fn provider_config(config: &Config) -> ProviderConfig {
    let mut provider = ProviderConfig::new(
        config.model.api_key.clone().unwrap_or_default(),
        config.model.model.clone(),
    )
    .max_tokens(config.model.max_tokens)
    .temperature(config.model.temperature);
    if let Some(ref url) = config.model.api_url {
        provider = provider.base_url(url.clone());
    }
    provider
}

/// Build the moderation gate configuration.
#[must_use]
pub fn guard_config(config: &Config) -> GuardConfig {
    GuardConfig::default()
        .with_timeout(Duration::from_secs(config.guard.timeout_secs))
        .with_check(CheckType::Input, config.guard.check_input)
        .with_check(CheckType::Output, config.guard.check_output)
        .with_check(CheckType::Tool, config.guard.check_tool)
        .with_check(CheckType::Rag, config.guard.check_rag)
}

/// Build the tool engine configuration.
#[must_use]
pub fn engine_config(config: &Config) -> EngineConfig {
    EngineConfig {
        max_in_flight: config.tools.max_in_flight,
    }
}

/// Build the agent loop configuration.
#[must_use]
pub fn agent_config(config: &Config) -> AgentConfig {
    AgentConfig {
        max_steps: config.agent.max_steps,
        require_approval: config.agent.require_approval,
        ask_user_timeout: Duration::from_secs(config.agent.ask_user_timeout_secs),
    }
}

/// Build the orchestrator configuration.
#[must_use]
pub fn orchestrator_config(config: &Config) -> OrchestratorConfig {
    OrchestratorConfig {
        system_prompt: String::new(),
        moderation_history: 10,
        max_history: config.sessions.max_history_messages,
        retrieval_top_k: config.retrieval.top_k,
    }
}

/// The approval wait as a [`Duration`].
#[must_use]
pub fn approval_timeout(config: &Config) -> Duration {
    Duration::from_secs(config.agent.approval_timeout_secs)
}
