//! Action Controller
//!
//! Dispatches named actions to their handlers. Handlers assume they run
//! inside a transaction and mutate the model only through its accessors.
//! Failure is a result, not an error: a refused action may still change
//! state (a wary part grows needier) and is returned with `success: false`.

mod conference;
mod self_energy;

use serde::{Deserialize, Serialize};

use session_events::{ActionName, ActionRequest, PartId};

use crate::error::ModelError;
use crate::transaction::ActContext;

/// Hint for the presentation layer about how to acknowledge a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UiFeedback {
    ThoughtBubble { part: PartId, text: String },
    Shake { part: PartId },
    Highlight { part: PartId },
    Celebrate { part: PartId },
}

/// Outcome of one controller action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
    /// Short descriptions of what changed
    #[serde(default)]
    pub state_changes: Vec<String>,
    #[serde(default)]
    pub feedback: Option<UiFeedback>,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            state_changes: Vec::new(),
            feedback: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::ok(message)
        }
    }

    pub fn with_change(mut self, change: impl Into<String>) -> Self {
        self.state_changes.push(change.into());
        self
    }

    pub fn with_feedback(mut self, feedback: UiFeedback) -> Self {
        self.feedback = Some(feedback);
        self
    }
}

/// Runs one action against the model.
pub fn apply_action(ctx: &mut ActContext<'_>, request: &ActionRequest) -> ActionResult {
    let outcome = match request.action {
        ActionName::NoticePart => conference::notice_part(ctx, &request.subject),
        ActionName::SpontaneousBlend => conference::spontaneous_blend(ctx, &request.subject),
        ActionName::Blend => conference::blend(ctx, &request.subject),
        ActionName::DismissPart => conference::dismiss_part(ctx, &request.subject),
        ActionName::InvitePart => match &request.target {
            Some(target) => conference::invite_part(ctx, &request.subject, target),
            None => Err(ModelError::MissingArgument {
                action: "invite_part",
                what: "target",
            }),
        },
        ActionName::FeelToward => self_energy::feel_toward(ctx, &request.subject),
        ActionName::RayFieldSelect => match request.field {
            Some(field) => self_energy::ray_field_select(ctx, &request.subject, field),
            None => Err(ModelError::MissingArgument {
                action: "ray_field_select",
                what: "biography field",
            }),
        },
        ActionName::Unburden => self_energy::unburden(ctx, &request.subject),
    };

    let result = outcome.unwrap_or_else(|e| ActionResult::fail(e.to_string()));
    tracing::debug!(%request, success = result.success, message = %result.message, "action");
    result
}

/// Registered-part check shared by every handler.
fn require_part(ctx: &ActContext<'_>, id: &PartId) -> Result<String, ModelError> {
    Ok(ctx.model.parts().require(id)?.name.clone())
}


#[cfg(test)]
mod tests {
    use super::test_support::Harness;
    use super::*;

    #[test]
    fn test_missing_target_is_a_failed_result() {
        let mut h = Harness::new(&["a"]);
        let result = h.run(ActionRequest::new(ActionName::InvitePart, "a"));
        assert!(!result.success);
        assert!(result.message.contains("target"));
    }

    #[test]
    fn test_unknown_part_is_a_failed_result() {
        let mut h = Harness::new(&[]);
        let result = h.run(ActionRequest::new(ActionName::NoticePart, "ghost"));
        assert!(!result.success);
        assert_eq!(result.message, "unknown part: ghost");
    }

    #[test]
    fn test_result_builders() {
        let result = ActionResult::ok("done")
            .with_change("+target a")
            .with_feedback(UiFeedback::Highlight { part: PartId::new("a") });
        assert!(result.success);
        assert_eq!(result.state_changes, vec!["+target a"]);
        assert!(!ActionResult::fail("no").success);
    }
}
