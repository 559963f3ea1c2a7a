//! Model Errors

use session_events::PartId;

/// Errors raised by model and controller operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown part: {0}")]
    UnknownPart(PartId),
    #[error("part already registered: {0}")]
    DuplicatePart(PartId),
    #[error("{0} is not seated in the conference")]
    NotATarget(PartId),
    #[error("{0} is not blended")]
    NotBlended(PartId),
    #[error("{action} needs a {what}")]
    MissingArgument {
        action: &'static str,
        what: &'static str,
    },
}
