//! Temperature to output evaluation of a channel's control contract.
//!
//! The device executes the curve; this module defines what its output must
//! be for a given temperature, previous output and latch state.

pub mod cool_holder;
pub mod curve;
pub mod evaluator;

pub use cool_holder::LatchState;
pub use curve::Curve;
pub use evaluator::{evaluate, Evaluation, PlugController};
