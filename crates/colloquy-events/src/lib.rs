//! Colloquy Events - the only path content takes toward the user.
//!
//! The orchestrator and its collaborators never write to the web transport
//! directly; everything user-visible is a [`ChatEvent`] handed to an
//! [`EventPublisher`]. The [`EventBus`] implementation fans events out to
//! transport subscribers over a broadcast channel; tests use a collecting
//! publisher to assert on exact event order.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod bus;
mod event;
mod publisher;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::ChatEvent;
pub use publisher::EventPublisher;
