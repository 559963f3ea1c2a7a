//! Systems
//!
//! Time-driven model updates run once per fixed tick.

pub mod orchestrator;

pub use orchestrator::{advance, TickReport};
