//! Cross-crate scenario tests for the Colloquy orchestration engine.
//!
//! The tests live in `tests/`; this library is intentionally empty.

#![deny(unsafe_code)]
