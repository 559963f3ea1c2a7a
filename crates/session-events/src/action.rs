//! Action Vocabulary
//!
//! The fixed set of named actions accepted by the controller, and the request
//! value that names one action against one part.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PartId;

/// Named controller actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    /// Bring an idle part into the conference, or ask a blended part to separate
    NoticePart,
    /// Extend curiosity toward a seated part
    FeelToward,
    /// Ask the part on the self-ray about one biography field
    RayFieldSelect,
    /// A part pushes its way toward the center on its own
    SpontaneousBlend,
    /// Deliberately let a seated part blend
    Blend,
    /// Let a seated part leave the conference
    DismissPart,
    /// Invite a part to sit beside a target as support
    InvitePart,
    /// Release a part's burden
    Unburden,
}

impl ActionName {
    pub const ALL: [ActionName; 8] = [
        ActionName::NoticePart,
        ActionName::FeelToward,
        ActionName::RayFieldSelect,
        ActionName::SpontaneousBlend,
        ActionName::Blend,
        ActionName::DismissPart,
        ActionName::InvitePart,
        ActionName::Unburden,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ActionName::NoticePart => "notice_part",
            ActionName::FeelToward => "feel_toward",
            ActionName::RayFieldSelect => "ray_field_select",
            ActionName::SpontaneousBlend => "spontaneous_blend",
            ActionName::Blend => "blend",
            ActionName::DismissPart => "dismiss_part",
            ActionName::InvitePart => "invite_part",
            ActionName::Unburden => "unburden",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionName::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ParseActionError::UnknownAction(s.to_string()))
    }
}

/// Biography facts a part can reveal through the self-ray.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiographyField {
    Age,
    Identity,
    Job,
    JobAppraisal,
    JobImpact,
}

impl BiographyField {
    pub const ALL: [BiographyField; 5] = [
        BiographyField::Age,
        BiographyField::Identity,
        BiographyField::Job,
        BiographyField::JobAppraisal,
        BiographyField::JobImpact,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BiographyField::Age => "age",
            BiographyField::Identity => "identity",
            BiographyField::Job => "job",
            BiographyField::JobAppraisal => "job_appraisal",
            BiographyField::JobImpact => "job_impact",
        }
    }
}

impl fmt::Display for BiographyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BiographyField {
    type Err = ParseActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BiographyField::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ParseActionError::UnknownField(s.to_string()))
    }
}

/// Why a part is blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendReason {
    Spontaneous,
    UserInitiated,
}

impl fmt::Display for BlendReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlendReason::Spontaneous => write!(f, "spontaneous"),
            BlendReason::UserInitiated => write!(f, "user_initiated"),
        }
    }
}

/// One action invocation: a name, the part it addresses, and optional extras.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: ActionName,
    pub subject: PartId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<PartId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<BiographyField>,
}

impl ActionRequest {
    pub fn new(action: ActionName, subject: impl Into<PartId>) -> Self {
        Self {
            action,
            subject: subject.into(),
            target: None,
            field: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<PartId>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_field(mut self, field: BiographyField) -> Self {
        self.field = Some(field);
        self
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.action, self.subject)?;
        if let Some(target) = &self.target {
            write!(f, " -> {}", target)?;
        }
        if let Some(field) = self.field {
            write!(f, ", {}", field)?;
        }
        write!(f, ")")
    }
}

/// Error parsing an action or field name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseActionError {
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("unknown biography field: {0}")]
    UnknownField(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_name_parse() {
        for action in ActionName::ALL {
            assert_eq!(action.as_str().parse::<ActionName>().unwrap(), action);
        }
        assert!("dance".parse::<ActionName>().is_err());
    }

    #[test]
    fn test_action_name_serde_matches_as_str() {
        let json = serde_json::to_string(&ActionName::RayFieldSelect).unwrap();
        assert_eq!(json, "\"ray_field_select\"");
    }

    #[test]
    fn test_request_display() {
        let request = ActionRequest::new(ActionName::RayFieldSelect, "critic")
            .with_field(BiographyField::JobImpact);
        assert_eq!(request.to_string(), "ray_field_select(critic, job_impact)");

        let invite = ActionRequest::new(ActionName::InvitePart, "manager").with_target("exile");
        assert_eq!(invite.to_string(), "invite_part(manager -> exile)");
    }

    #[test]
    fn test_request_skips_empty_options() {
        let request = ActionRequest::new(ActionName::NoticePart, "critic");
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("target"));
        assert!(!json.contains("field"));
    }
}
