//! Part state and the relationship graph between parts.

pub mod part;
pub mod relationships;

pub use part::{Biography, DialogueBank, PartState, PartStore};
pub use relationships::Relationships;
