//! Core menu state machine
//!
//! Pure transitions over an immutable menu registry. All I/O happens in the
//! session store and the runtime's effect dispatcher.

mod effect;
pub mod input;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, PartyKind};
pub use input::{tokenize, Input};
pub use state::{Fields, MenuState, Session};
pub use transition::{advance, redisplay, TransitionResult};
