//! Recorded Session Document
//!
//! A portable record of one session: seed, environment tags, the initial model,
//! and every user action with the RNG consumption and state observed right
//! after it. The document is plain JSON so it can be downloaded and attached
//! to bug reports.

use serde::{Deserialize, Serialize};

use crate::{ActionRequest, RngCounts, VerificationSnapshot};

/// Version of the recorded-session document layout.
pub const SESSION_FORMAT_VERSION: u32 = 1;

/// Version tag of the code that produced a recording.
pub const CODE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Platform tag, e.g. "linux-x86_64".
pub fn current_platform() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

/// Generates a fresh session ID.
pub fn generate_session_id() -> String {
    format!("ses_{}", uuid::Uuid::new_v4().simple())
}

/// One user action as it was transacted during recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    #[serde(flatten)]
    pub request: ActionRequest,
    /// Model tick at which the action was transacted
    pub tick: u64,
    /// Model elapsed seconds at which the action was transacted
    pub elapsed: f64,
    /// RNG draws taken so far, after the action
    pub rng: RngCounts,
    /// State right after the action, used only as a replay oracle
    pub snapshot: VerificationSnapshot,
}

/// Optional state at the moment recording stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalState {
    pub rng: RngCounts,
    pub snapshot: VerificationSnapshot,
    pub model: serde_json::Value,
}

/// A complete recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSession {
    pub format: u32,
    pub session_id: String,
    pub seed: u64,
    pub code_version: String,
    pub platform: String,
    /// Draws already taken when recording started
    #[serde(default)]
    pub initial_rng: RngCounts,
    /// Serialized model, relationships included
    pub initial_state: serde_json::Value,
    /// Tuning and view settings the session ran with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub actions: Vec<RecordedAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_state: Option<FinalState>,
}

impl RecordedSession {
    /// Parses and validates a recorded session document.
    ///
    /// Malformed documents are rejected as a whole; nothing is partially loaded.
    pub fn from_json(json: &str) -> Result<Self, SessionFormatError> {
        let session: RecordedSession = serde_json::from_str(json)?;
        session.validate()?;
        Ok(session)
    }

    pub fn to_json(&self) -> Result<String, SessionFormatError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks structural consistency of the document.
    pub fn validate(&self) -> Result<(), SessionFormatError> {
        if self.format != SESSION_FORMAT_VERSION {
            return Err(SessionFormatError::UnsupportedFormat(self.format));
        }
        if self.code_version.trim().is_empty() {
            return Err(SessionFormatError::MissingCodeVersion);
        }
        if !self.initial_state.is_object() {
            return Err(SessionFormatError::MissingInitialState);
        }

        let mut last_tick = 0;
        let mut last_rng = self.initial_rng;
        for (index, action) in self.actions.iter().enumerate() {
            if action.tick < last_tick {
                return Err(SessionFormatError::OutOfOrder { index });
            }
            if action.rng.model < last_rng.model || action.rng.cosmetic < last_rng.cosmetic {
                return Err(SessionFormatError::RngCountsDecrease { index });
            }
            last_tick = action.tick;
            last_rng = action.rng;
        }
        Ok(())
    }

    /// True if the recording was produced by a different code version.
    pub fn has_version_skew(&self) -> bool {
        self.code_version != CODE_VERSION
    }
}

/// Reasons a recorded session document is rejected at load time.
#[derive(Debug, thiserror::Error)]
pub enum SessionFormatError {
    #[error("malformed session document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported session format version {0}")]
    UnsupportedFormat(u32),
    #[error("session document has no code version")]
    MissingCodeVersion,
    #[error("session document has no initial state object")]
    MissingInitialState,
    #[error("recorded action {index} is earlier than the one before it")]
    OutOfOrder { index: usize },
    #[error("recorded action {index} reports fewer RNG draws than the one before it")]
    RngCountsDecrease { index: usize },
}
