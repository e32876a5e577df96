//! Configuration bridging and the fail-open / fail-closed policy split,
//! exercised across crate boundaries.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use colloquy_authz::{ComplianceFilter, ToolAuthorizationPolicy};
use colloquy_core::{ChatMode, CheckType, UserProfile};
use colloquy_guard::{GuardConfig, SecurityCheckGate};
use colloquy_llm::ToolCall;
use colloquy_runtime::{Orchestrator, OrchestratorConfig, SessionStore, config_bridge};
use colloquy_test::{CollectingPublisher, MockLlmProvider, MockModerationBackend, MockToolTransport};
use colloquy_tools::{EngineConfig, ToolCatalog, ToolDescriptor, ToolExecutionEngine};

#[test]
fn config_drives_every_subsystem() {
    let config = colloquy_config::load_from_str(
        r#"
[model]
model = "test-model"
max_tokens = 512

[guard]
timeout_secs = 2
check_rag = false

[tools]
max_in_flight = 2

[agent]
max_steps = 5
require_approval = true
"#,
    )
    .unwrap();

    let provider = config_bridge::provider_config(&config);
    assert_eq!(provider.model, "test-model");
    assert_eq!(provider.max_tokens, 512);

    let guard = config_bridge::guard_config(&config);
    assert_eq!(guard.timeout, Duration::from_secs(2));
    assert!(!guard.enabled.contains(&CheckType::Rag));
    assert!(guard.enabled.contains(&CheckType::Output));

    let engine = config_bridge::engine_config(&config);
    assert_eq!(engine.max_in_flight, 2);

    let agent = config_bridge::agent_config(&config);
    assert_eq!(agent.max_steps, 5);
    assert!(agent.require_approval);
}

#[test]
fn authorization_is_a_pure_subset_filter() {
    let tools = vec![
        ToolDescriptor::new("search", "web_lookup")
            .with_group("staff")
            .with_compliance_level("low"),
        ToolDescriptor::new("search", "crawl").with_group("staff"),
        ToolDescriptor::new("hr", "payroll")
            .with_group("hr-admins")
            .with_compliance_level("high"),
    ];
    let groups: BTreeSet<String> = ["staff".to_string()].into_iter().collect();
    let filter = ComplianceFilter::new(["low".to_string(), "high".to_string()]);

    let allowed = ToolAuthorizationPolicy::authorize(&groups, Some(&filter), &tools);

    // Group filter removed hr:payroll, compliance filter removed the
    // untagged search:crawl (fail-closed: untagged is excluded).
    assert_eq!(allowed.len(), 1);
    assert_eq!(allowed[0].full_name(), "search:web_lookup");

    // Idempotent: same inputs, same outputs.
    let again = ToolAuthorizationPolicy::authorize(&groups, Some(&filter), &tools);
    assert_eq!(
        allowed.iter().map(ToolDescriptor::full_name).collect::<Vec<_>>(),
        again.iter().map(ToolDescriptor::full_name).collect::<Vec<_>>(),
    );
}

#[tokio::test]
async fn compliance_filter_is_fail_closed_through_a_whole_turn() {
    // The session has a compliance filter; search:crawl is untagged, so
    // the model never sees it and a hallucinated call to it is rejected.
    let catalog = ToolCatalog::new()
        .with_tool(
            ToolDescriptor::new("search", "web_lookup")
                .with_group("staff")
                .with_compliance_level("low"),
        )
        .with_tool(ToolDescriptor::new("search", "crawl").with_group("staff"));

    let publisher = CollectingPublisher::new();
    let gate = Arc::new(SecurityCheckGate::new(
        Arc::new(MockModerationBackend::allowing()),
        GuardConfig::default(),
    ));
    let transport = MockToolTransport::new()
        .with_text_result("search:crawl", "untagged data")
        .with_text_result("search:web_lookup", "tagged data");
    let engine = Arc::new(ToolExecutionEngine::new(
        Arc::new(transport.clone()),
        Arc::clone(&gate),
        EngineConfig::default(),
    ));
    let store = Arc::new(SessionStore::new());
    let session_id = store.create(UserProfile::new("alice").with_group("staff"));
    {
        let entry = store.get(&session_id).unwrap();
        let mut session = entry.lock().await;
        session.compliance_filter = Some(ComplianceFilter::new(["low".to_string()]));
    }

    let llm = MockLlmProvider::new()
        .push_tool_calls(vec![
            ToolCall::new("c1", "search:crawl"),
            ToolCall::new("c2", "search:web_lookup"),
        ])
        .push_text("used only the tagged tool");
    let orchestrator = Orchestrator::new(
        Arc::clone(&store),
        Arc::new(llm),
        catalog,
        gate,
        engine,
        Arc::new(publisher.clone()),
        OrchestratorConfig::default(),
    );

    orchestrator
        .handle_message(&session_id, "gather data", ChatMode::Tools)
        .await
        .unwrap();

    // Only the compliance-tagged tool was dispatched.
    assert_eq!(transport.invocations(), vec!["search:web_lookup"]);
    assert_eq!(publisher.count_of("tool_error"), 1);
    assert_eq!(publisher.count_of("tool_complete"), 1);
    assert_eq!(publisher.count_of("chat_response"), 1);
}

#[tokio::test]
async fn moderation_stays_fail_open_while_authorization_stays_fail_closed() {
    // Both policies degrade in the same turn: the moderation endpoint is
    // down (content proceeds) while authorization has nothing to grant
    // (no tools reach the model or the transport).
    let catalog = ToolCatalog::new()
        .with_tool(ToolDescriptor::new("search", "web_lookup").with_group("other-team"));

    let publisher = CollectingPublisher::new();
    let gate = Arc::new(SecurityCheckGate::new(
        Arc::new(MockModerationBackend::failing()),
        GuardConfig::default().with_timeout(Duration::from_millis(100)),
    ));
    let transport = MockToolTransport::new().with_text_result("search:web_lookup", "data");
    let engine = Arc::new(ToolExecutionEngine::new(
        Arc::new(transport.clone()),
        Arc::clone(&gate),
        EngineConfig::default(),
    ));
    let store = Arc::new(SessionStore::new());
    let session_id = store.create(UserProfile::new("alice").with_group("staff"));

    let llm = MockLlmProvider::new()
        .push_tool_calls(vec![ToolCall::new("c1", "search:web_lookup")])
        .push_text("made do without tools");
    let orchestrator = Orchestrator::new(
        Arc::clone(&store),
        Arc::new(llm),
        catalog,
        gate,
        engine,
        Arc::new(publisher.clone()),
        OrchestratorConfig::default(),
    );

    orchestrator
        .handle_message(&session_id, "hello", ChatMode::Tools)
        .await
        .unwrap();

    // Fail-open: the response was published despite the dead endpoint.
    assert_eq!(publisher.count_of("chat_response"), 1);
    // Fail-closed: the unauthorized call never reached the transport.
    assert!(transport.invocations().is_empty());
    assert_eq!(publisher.count_of("tool_error"), 1);
}
