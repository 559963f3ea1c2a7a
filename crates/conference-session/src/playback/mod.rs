//! Session Playback
//!
//! Replays a recorded session through the same input surface a player uses:
//! advance model ticks until the recorded tick, open the subject's menu,
//! wait on the UI clock until the menu has opened, select the slice, then
//! compare the resulting state with the snapshot recorded after that action.
//!
//! Playback is a state machine stepped by the caller. Each step either runs
//! one tick (model or UI) or moves to the next phase, so a caller can drive
//! it from a frame loop and cancel between any two steps.

pub mod bundle;
pub mod verify;

use session_events::{ActionRequest, RecordedAction, RecordedSession, CODE_VERSION};

use conference_core::SessionLoadError;

use crate::config::SessionConfig;
use crate::session::SessionController;
pub use bundle::{DiagnosticBundle, RecentDraws};
pub use verify::{Difference, SyncMismatch};

pub mod playback_constants {
    /// UI seconds to wait for a menu to open before giving up
    pub const MENU_TIMEOUT: f64 = 5.0;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackPhase {
    /// Running model ticks until the action's recorded tick
    Advancing { index: usize },
    /// Menu requested; waiting on the UI clock for it to open
    AwaitingMenu {
        index: usize,
        wake_at: f64,
        deadline: f64,
    },
    /// Action performed; comparing against the recorded snapshot
    Verifying { index: usize },
    /// All actions replayed; running to the final recorded tick
    Draining,
    Finished,
    Failed,
    Cancelled,
}

impl PlaybackPhase {
    pub fn is_done(&self) -> bool {
        matches!(
            self,
            PlaybackPhase::Finished | PlaybackPhase::Failed | PlaybackPhase::Cancelled
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error(transparent)]
    Load(#[from] SessionLoadError),
    #[error("recorded settings are unreadable: {0}")]
    Config(#[source] serde_json::Error),
    #[error("replay diverged {0}")]
    Mismatch(Box<SyncMismatch>),
    #[error("menu for action {index} ({request}) did not open")]
    MenuTimeout { index: usize, request: ActionRequest },
    #[error("action {index} was recorded at tick {recorded} but replay is already at tick {actual}")]
    TickOvershoot {
        index: usize,
        recorded: u64,
        actual: u64,
    },
}

/// Summary of a completed or cancelled replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackReport {
    pub actions_verified: usize,
    pub ticks: u64,
    pub final_state_verified: bool,
    pub cancelled: bool,
}

#[derive(Debug)]
pub struct PlaybackController {
    recording: RecordedSession,
    session: SessionController,
    phase: PlaybackPhase,
    verified: usize,
    final_verified: bool,
}

impl PlaybackController {
    /// Loads a recording for replay. Settings come from `config` if given,
    /// else from the recording, else the defaults.
    pub fn new(
        recording: RecordedSession,
        config: Option<SessionConfig>,
    ) -> Result<Self, PlaybackError> {
        recording.validate().map_err(SessionLoadError::from)?;
        if recording.has_version_skew() {
            tracing::warn!(
                recorded = %recording.code_version,
                current = CODE_VERSION,
                "recording was made by a different version; replay may diverge"
            );
        }

        let config = match (config, &recording.config) {
            (Some(config), _) => config,
            (None, Some(value)) => SessionConfig::from_json(value).map_err(PlaybackError::Config)?,
            (None, None) => SessionConfig::default(),
        };
        let session = SessionController::from_recording(&recording, config)?;
        let phase = if recording.actions.is_empty() {
            PlaybackPhase::Draining
        } else {
            PlaybackPhase::Advancing { index: 0 }
        };
        tracing::info!(
            session = %recording.session_id,
            actions = recording.actions.len(),
            seed = recording.seed,
            "replay loaded"
        );

        Ok(Self {
            recording,
            session,
            phase,
            verified: 0,
            final_verified: false,
        })
    }

    pub fn phase(&self) -> &PlaybackPhase {
        &self.phase
    }

    pub fn session(&self) -> &SessionController {
        &self.session
    }

    pub fn recording(&self) -> &RecordedSession {
        &self.recording
    }

    pub fn actions_verified(&self) -> usize {
        self.verified
    }

    /// Stops the replay after the current step.
    pub fn cancel(&mut self) {
        if !self.phase.is_done() {
            tracing::info!(phase = ?self.phase, "replay cancelled");
            self.session.cancel_input();
            self.phase = PlaybackPhase::Cancelled;
        }
    }

    /// Runs one step. On error the phase becomes `Failed`.
    pub fn step(&mut self) -> Result<&PlaybackPhase, PlaybackError> {
        match self.next_phase() {
            Ok(next) => {
                self.phase = next;
                Ok(&self.phase)
            }
            Err(e) => {
                tracing::error!("replay failed: {}", e);
                self.phase = PlaybackPhase::Failed;
                Err(e)
            }
        }
    }

    /// Steps until the replay finishes, fails or is cancelled.
    pub fn run_to_end(&mut self) -> Result<PlaybackReport, PlaybackError> {
        while !self.phase.is_done() {
            self.step()?;
        }
        Ok(self.report())
    }

    pub fn report(&self) -> PlaybackReport {
        PlaybackReport {
            actions_verified: self.verified,
            ticks: self.session.model().tick(),
            final_state_verified: self.final_verified,
            cancelled: self.phase == PlaybackPhase::Cancelled,
        }
    }

    /// Collects the replay state for offline investigation of `mismatch`.
    pub fn diagnostic_bundle(&self, mismatch: &SyncMismatch) -> DiagnosticBundle {
        let simulator = self.session.simulator();
        let purposes = |p: Vec<&'static str>| -> Vec<String> {
            p.into_iter().map(String::from).collect()
        };
        DiagnosticBundle {
            session: self.recording.clone(),
            mismatch: mismatch.clone(),
            actual: simulator.verification_snapshot(),
            actual_rng: simulator.rng_counts(),
            recent_trace: simulator.recent_trace(),
            recent_draws: RecentDraws {
                model: purposes(simulator.rng().model.recent_purposes()),
                cosmetic: purposes(simulator.rng().cosmetic.recent_purposes()),
            },
        }
    }

    fn next_phase(&mut self) -> Result<PlaybackPhase, PlaybackError> {
        match self.phase.clone() {
            PlaybackPhase::Advancing { index } => self.advance_to(index),
            PlaybackPhase::AwaitingMenu {
                index,
                wake_at,
                deadline,
            } => self.await_menu(index, wake_at, deadline),
            PlaybackPhase::Verifying { index } => self.verify(index),
            PlaybackPhase::Draining => self.drain(),
            done => Ok(done),
        }
    }

    fn action(&self, index: usize) -> Option<&RecordedAction> {
        self.recording.actions.get(index)
    }

    fn advance_to(&mut self, index: usize) -> Result<PlaybackPhase, PlaybackError> {
        let Some(action) = self.recording.actions.get(index) else {
            return Ok(PlaybackPhase::Draining);
        };
        let tick = self.session.model().tick();
        if tick < action.tick {
            self.session.tick();
            return Ok(PlaybackPhase::Advancing { index });
        }
        if tick > action.tick {
            return Err(PlaybackError::TickOvershoot {
                index,
                recorded: action.tick,
                actual: tick,
            });
        }

        let menu = self.session.begin_input(&action.request);
        tracing::debug!(index, request = %action.request, ?menu, "replaying action");
        let now = self.session.scheduler().ui_time();
        Ok(PlaybackPhase::AwaitingMenu {
            index,
            wake_at: now + self.session.config().view.menu_open_duration,
            deadline: now + playback_constants::MENU_TIMEOUT,
        })
    }

    fn await_menu(
        &mut self,
        index: usize,
        wake_at: f64,
        deadline: f64,
    ) -> Result<PlaybackPhase, PlaybackError> {
        let Some(request) = self.action(index).map(|a| a.request.clone()) else {
            return Ok(PlaybackPhase::Draining);
        };
        let now = self.session.scheduler().ui_time();
        if now < wake_at || !self.session.input().is_open() {
            if now > deadline {
                self.session.cancel_input();
                return Err(PlaybackError::MenuTimeout { index, request });
            }
            self.session.tick_ui();
            return Ok(PlaybackPhase::AwaitingMenu {
                index,
                wake_at,
                deadline,
            });
        }

        if let Err(e) = self.session.finish_input(&request) {
            tracing::warn!(index, %request, "menu selection failed ({}); performing directly", e);
            self.session.cancel_input();
            self.session.perform(&request);
        }
        Ok(PlaybackPhase::Verifying { index })
    }

    fn verify(&mut self, index: usize) -> Result<PlaybackPhase, PlaybackError> {
        let Some(action) = self.recording.actions.get(index) else {
            return Ok(PlaybackPhase::Draining);
        };
        let simulator = self.session.simulator();
        verify::check(
            Some(index),
            Some(&action.request),
            &action.snapshot,
            action.rng,
            &simulator.verification_snapshot(),
            simulator.rng_counts(),
        )
        .map_err(|m| PlaybackError::Mismatch(Box::new(m)))?;

        self.verified += 1;
        tracing::debug!(index, tick = action.tick, "action verified");
        if index + 1 < self.recording.actions.len() {
            Ok(PlaybackPhase::Advancing { index: index + 1 })
        } else {
            Ok(PlaybackPhase::Draining)
        }
    }

    fn drain(&mut self) -> Result<PlaybackPhase, PlaybackError> {
        let Some(final_state) = &self.recording.final_state else {
            tracing::info!(actions = self.verified, "replay finished (no final state recorded)");
            return Ok(PlaybackPhase::Finished);
        };
        if self.session.model().tick() < final_state.snapshot.tick {
            self.session.tick();
            return Ok(PlaybackPhase::Draining);
        }

        let simulator = self.session.simulator();
        verify::check(
            None,
            None,
            &final_state.snapshot,
            final_state.rng,
            &simulator.verification_snapshot(),
            simulator.rng_counts(),
        )
        .map_err(|m| PlaybackError::Mismatch(Box::new(m)))?;

        self.final_verified = true;
        tracing::info!(
            actions = self.verified,
            tick = final_state.snapshot.tick,
            "replay finished in sync"
        );
        Ok(PlaybackPhase::Finished)
    }
}
