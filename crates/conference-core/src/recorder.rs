//! Action Recorder
//!
//! Captures a session while it is being played: the seed, the initial model,
//! and each user action with the state observed right after it.

use session_events::{
    current_platform, generate_session_id, ActionRequest, FinalState, RecordedAction,
    RecordedSession, RngCounts, SessionFormatError, CODE_VERSION, SESSION_FORMAT_VERSION,
};

use crate::model::{InvariantViolation, SimulatorModel};

#[derive(Debug)]
pub struct ActionRecorder {
    session: RecordedSession,
}

impl ActionRecorder {
    /// Starts a recording from `model` at the given stream position.
    pub fn start(
        model: &SimulatorModel,
        seed: u64,
        rng: RngCounts,
    ) -> Result<Self, RecorderError> {
        Ok(Self {
            session: RecordedSession {
                format: SESSION_FORMAT_VERSION,
                session_id: generate_session_id(),
                seed,
                code_version: CODE_VERSION.to_string(),
                platform: current_platform(),
                initial_rng: rng,
                initial_state: model.to_json()?,
                config: None,
                actions: Vec::new(),
                final_state: None,
            },
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session.session_id
    }

    pub fn session(&self) -> &RecordedSession {
        &self.session
    }

    /// Attaches the settings the session runs with.
    pub fn set_config(&mut self, config: serde_json::Value) {
        self.session.config = Some(config);
    }

    /// Appends one transacted user action.
    pub fn record(&mut self, request: &ActionRequest, model: &SimulatorModel, rng: RngCounts) {
        tracing::debug!(%request, tick = model.tick(), "recording action");
        self.session.actions.push(RecordedAction {
            request: request.clone(),
            tick: model.tick(),
            elapsed: model.elapsed(),
            rng,
            snapshot: model.verification_snapshot(),
        });
    }

    /// Closes the recording with the final state.
    pub fn finish(
        mut self,
        model: &SimulatorModel,
        rng: RngCounts,
    ) -> Result<RecordedSession, RecorderError> {
        self.session.final_state = Some(FinalState {
            rng,
            snapshot: model.verification_snapshot(),
            model: model.to_json()?,
        });
        Ok(self.session)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("a recording is already in progress")]
    AlreadyRecording,
    #[error("no recording in progress")]
    NotRecording,
    #[error("cannot serialize model: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reasons a recorded session cannot be loaded for playback.
#[derive(Debug, thiserror::Error)]
pub enum SessionLoadError {
    #[error(transparent)]
    Format(#[from] SessionFormatError),
    #[error("initial state is not a valid model: {0}")]
    InvalidState(serde_json::Error),
    #[error("initial state breaks a model invariant: {0}")]
    Invariant(#[from] InvariantViolation),
}
