//! Colloquy Config - layered configuration.
//!
//! Configuration merges embedded defaults, a user file
//! (`~/.colloquy/config.toml`), and a workspace file
//! (`{workspace}/.colloquy/config.toml`), then applies environment
//! variable overrides for secrets. Every section defaults to working
//! production values, so a bare `[section]` header is valid.
//!
//! This crate is deliberately self-contained: domain crates mirror these
//! section types into their own configs at the boundary (see the runtime's
//! config bridge) rather than this crate depending on the rest of the
//! workspace.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod error;
mod loader;
mod types;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_from_str};
pub use types::{
    AgentSection, Config, GuardSection, LoggingSection, ModelSection, RetrievalSection,
    SessionsSection, ToolsSection,
};
