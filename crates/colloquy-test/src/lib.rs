//! Colloquy Test - shared mock implementations for testing.
//!
//! Scripted fakes for every external collaborator: the LLM provider, the
//! tool transport, the moderation backend, and the event publisher.
//! Scenario tests drive the real orchestration code against these and
//! assert on the exact ordered event stream.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod logging;
mod mocks;

pub use logging::init_test_logging;
pub use mocks::{
    CollectingPublisher, MockLlmProvider, MockModerationBackend, MockRetrievalClient,
    MockToolTransport, ToolScript,
};
