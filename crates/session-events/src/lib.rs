//! Shared data types for the parts conference session engine.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for all other crates in the workspace: the core model
//! produces these values, the session layer renders, records and verifies them.

pub mod action;
pub mod ids;
pub mod session;
pub mod snapshot;

// Re-export id types
pub use ids::PartId;

// Re-export action vocabulary
pub use action::{ActionName, ActionRequest, BiographyField, BlendReason, ParseActionError};

// Re-export snapshot types
pub use snapshot::{
    BiographyFlags, BlendSnapshot, BubbleSnapshot, MessageSnapshot, ModelSnapshot,
    OrchestratorTimers, PartVerification, PendingSnapshot, RngCounts, VerificationSnapshot,
};

// Re-export recorded session types
pub use session::{
    current_platform, generate_session_id, FinalState, RecordedAction, RecordedSession,
    SessionFormatError, CODE_VERSION, SESSION_FORMAT_VERSION,
};
