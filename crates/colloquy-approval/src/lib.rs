//! Colloquy Approval - human confirmation for agent tool calls.
//!
//! When the agent loop is configured to require approval, each tool call
//! blocks until a human approves it, denies it, or a timeout converts
//! silence into an implicit denial. An approval can carry a scope —
//! function, server, or global — which stores a session-lifetime grant so
//! later calls it covers skip the prompt. Denials are never stored.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod grants;
mod manager;
mod request;

pub use grants::{Grant, GrantStore};
pub use manager::{ApprovalHandler, ApprovalManager, ApprovalOutcome, ApprovalProof};
pub use request::{ApprovalDecision, ApprovalRequest, ApprovalResponse, ApprovalScope, RequestId};
