//! Transactions
//!
//! Every mutation of the model goes through [`Simulator::act`]. A transaction
//! snapshots the model, runs the mutation, diffs the result, writes one trace
//! line, and hands user-originated actions to the recorder.
//!
//! Transactions do not nest. Opening one while another is open is a logic
//! error and panics. A mutation that panics leaves the simulator poisoned:
//! every later `act` call panics too.

use session_events::{ActionRequest, RecordedSession, RngCounts, VerificationSnapshot};

use crate::actions::{apply_action, ActionResult};
use crate::config::Tuning;
use crate::diff::StateDiff;
use crate::events::{TraceEntry, TraceLog};
use crate::model::SimulatorModel;
use crate::recorder::{ActionRecorder, RecorderError, SessionLoadError};
use crate::rng::DualRng;
use crate::systems::orchestrator::{self, TickReport};

/// Trace target for transaction lines.
pub const TRACE_TARGET: &str = "conference::trace";

/// Mutable access handed to a transaction body.
pub struct ActContext<'a> {
    pub model: &'a mut SimulatorModel,
    pub rng: &'a mut DualRng,
    pub tuning: &'a Tuning,
}

/// Who opened a transaction. Only user transactions are recorded.
#[derive(Debug, Clone, PartialEq)]
pub enum ActOrigin {
    User(ActionRequest),
    System(&'static str),
}

impl ActOrigin {
    pub fn label(&self) -> String {
        match self {
            ActOrigin::User(request) => format!("user:{}", request),
            ActOrigin::System(label) => format!("system:{}", label),
        }
    }
}

/// Result of a transaction body plus what it changed.
#[derive(Debug, Clone)]
pub struct Transacted<R> {
    pub value: R,
    pub diff: StateDiff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionState {
    Idle,
    Open,
}

/// Owns the model, both RNG streams, the tuning, the trace log, and the
/// optional recorder.
#[derive(Debug)]
pub struct Simulator {
    model: SimulatorModel,
    rng: DualRng,
    tuning: Tuning,
    trace: TraceLog,
    recorder: Option<ActionRecorder>,
    state: TransactionState,
    /// Bumped by every transaction that changed something the view shows
    revision: u64,
}

impl Simulator {
    /// Simulator with entropy-seeded streams.
    pub fn new(model: SimulatorModel, tuning: Tuning) -> Self {
        Self::with_rng(model, tuning, DualRng::unseeded())
    }

    pub fn with_seed(model: SimulatorModel, tuning: Tuning, seed: u64) -> Self {
        Self::with_rng(model, tuning, DualRng::seeded(seed))
    }

    pub fn with_rng(model: SimulatorModel, tuning: Tuning, rng: DualRng) -> Self {
        Self {
            model,
            rng,
            tuning,
            trace: TraceLog::null(),
            recorder: None,
            state: TransactionState::Idle,
            revision: 0,
        }
    }

    /// Rebuilds the simulator a recording started from: the initial model,
    /// the seed, and both streams fast-forwarded to the recorded counts.
    pub fn from_recording(
        session: &RecordedSession,
        tuning: Tuning,
    ) -> Result<Self, SessionLoadError> {
        let model = SimulatorModel::from_json(session.initial_state.clone())
            .map_err(SessionLoadError::InvalidState)?;
        model.check_invariants()?;
        let mut rng = DualRng::seeded(session.seed);
        rng.fast_forward(session.initial_rng);
        Ok(Self::with_rng(model, tuning, rng))
    }

    pub fn with_trace_log(mut self, trace: TraceLog) -> Self {
        self.trace = trace;
        self
    }

    pub fn model(&self) -> &SimulatorModel {
        &self.model
    }

    pub fn rng(&self) -> &DualRng {
        &self.rng
    }

    pub fn rng_counts(&self) -> RngCounts {
        self.rng.counts()
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn in_transaction(&self) -> bool {
        self.state == TransactionState::Open
    }

    pub fn recent_trace(&self) -> Vec<String> {
        self.trace.recent()
    }

    pub fn verification_snapshot(&self) -> VerificationSnapshot {
        self.model.verification_snapshot()
    }

    /// Runs `mutation` as one transaction.
    ///
    /// # Panics
    ///
    /// If called while another transaction is open, or after a transaction
    /// body panicked.
    pub fn act<R>(
        &mut self,
        origin: ActOrigin,
        mutation: impl FnOnce(&mut ActContext<'_>) -> R,
    ) -> Transacted<R> {
        assert!(
            self.state == TransactionState::Idle,
            "transaction opened while another is in progress ({})",
            origin.label()
        );
        self.state = TransactionState::Open;

        let before = self.model.clone();
        let value = {
            let mut ctx = ActContext {
                model: &mut self.model,
                rng: &mut self.rng,
                tuning: &self.tuning,
            };
            mutation(&mut ctx)
        };
        let diff = StateDiff::between(&before, &self.model);

        if diff.touches_view() {
            self.revision += 1;
        }
        self.trace_transaction(&origin, &diff);

        if let ActOrigin::User(request) = &origin {
            if let Some(recorder) = self.recorder.as_mut() {
                recorder.record(request, &self.model, self.rng.counts());
            }
        }

        self.state = TransactionState::Idle;
        Transacted { value, diff }
    }

    /// Runs a controller action as a user transaction.
    pub fn perform(&mut self, request: &ActionRequest) -> Transacted<ActionResult> {
        self.act(ActOrigin::User(request.clone()), |ctx| {
            apply_action(ctx, request)
        })
    }

    /// Runs one orchestrator tick as a system transaction.
    pub fn advance_time(&mut self, dt: f64) -> Transacted<TickReport> {
        self.act(ActOrigin::System("advance_time"), |ctx| {
            orchestrator::advance(ctx, dt)
        })
    }

    fn trace_transaction(&mut self, origin: &ActOrigin, diff: &StateDiff) {
        let entry = TraceEntry {
            tick: self.model.tick(),
            elapsed: self.model.elapsed(),
            origin: origin.label(),
            summary: diff.describe(),
        };
        let user = matches!(origin, ActOrigin::User(_));
        if user || diff.is_discrete() {
            tracing::info!(target: TRACE_TARGET, "{}", entry.line());
            if let Err(e) = self.trace.log(&entry) {
                tracing::warn!("failed to write trace entry: {}", e);
            }
        } else {
            tracing::trace!(target: TRACE_TARGET, "{}", entry.line());
        }
    }

    // --- Recording ---

    pub fn is_recording(&self) -> bool {
        self.recorder.is_some()
    }

    /// Starts recording from the current state. Seeds the streams first if
    /// they were seeded from entropy.
    pub fn start_recording(&mut self) -> Result<(), RecorderError> {
        if self.recorder.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }
        let seed = self.rng.ensure_seeded();
        let recorder = ActionRecorder::start(&self.model, seed, self.rng.counts())?;
        tracing::info!(
            session = recorder.session_id(),
            seed,
            tick = self.model.tick(),
            "recording started"
        );
        self.recorder = Some(recorder);
        Ok(())
    }

    /// Stops recording and returns the finished session with its final state.
    pub fn stop_recording(&mut self) -> Result<RecordedSession, RecorderError> {
        let recorder = self.recorder.take().ok_or(RecorderError::NotRecording)?;
        let session = recorder.finish(&self.model, self.rng.counts())?;
        tracing::info!(
            session = %session.session_id,
            actions = session.actions.len(),
            "recording stopped"
        );
        Ok(session)
    }

    /// Stores the settings the session runs with in the recording.
    pub fn annotate_recording(&mut self, config: serde_json::Value) {
        if let Some(recorder) = self.recorder.as_mut() {
            recorder.set_config(config);
        }
    }

    /// The session recorded so far, without a final state.
    pub fn recording(&self) -> Option<&RecordedSession> {
        self.recorder.as_ref().map(ActionRecorder::session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::PartState;
    use session_events::{ActionName, PartId};
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn simulator() -> Simulator {
        let mut model = SimulatorModel::default();
        for id in ["a", "b"] {
            model.register_part(PartState::new(id, id)).unwrap();
        }
        Simulator::with_seed(model, Tuning::default(), 5)
    }

    #[test]
    fn test_act_returns_value_and_diff() {
        let mut sim = simulator();
        let done = sim.act(ActOrigin::System("test"), |ctx| {
            ctx.model.add_target_cloud(&PartId::new("a"));
            7
        });
        assert_eq!(done.value, 7);
        assert_eq!(done.diff.targets_added, vec![PartId::new("a")]);
        assert_eq!(sim.revision(), 1);
        assert!(!sim.in_transaction());
    }

    #[test]
    fn test_noop_transaction_keeps_revision() {
        let mut sim = simulator();
        let done = sim.act(ActOrigin::System("noop"), |_| ());
        assert!(done.diff.is_empty());
        assert_eq!(sim.revision(), 0);
    }

    #[test]
    fn test_perform_runs_controller() {
        let mut sim = simulator();
        let done = sim.perform(&ActionRequest::new(ActionName::NoticePart, "b"));
        assert!(done.value.success);
        assert_eq!(sim.model().targets(), &[PartId::new("b")]);
        assert!(sim.recent_trace()[0].contains("user:notice_part(b)"));
    }

    #[test]
    fn test_panicking_body_poisons_simulator() {
        let mut sim = simulator();
        let result = catch_unwind(AssertUnwindSafe(|| {
            sim.act::<()>(ActOrigin::System("boom"), |_| panic!("boom"));
        }));
        assert!(result.is_err());
        assert!(sim.in_transaction());

        let again = catch_unwind(AssertUnwindSafe(|| {
            sim.act(ActOrigin::System("after"), |_| ());
        }));
        assert!(again.is_err());
    }

    #[test]
    fn test_only_user_actions_recorded() {
        let mut sim = simulator();
        sim.start_recording().unwrap();

        sim.advance_time(1.0 / 60.0);
        sim.act(ActOrigin::System("arrival"), |ctx| {
            ctx.model.add_target_cloud(&PartId::new("a"))
        });
        sim.perform(&ActionRequest::new(ActionName::NoticePart, "b"));

        let session = sim.stop_recording().unwrap();
        assert_eq!(session.actions.len(), 1);
        assert_eq!(session.actions[0].request.subject, PartId::new("b"));
        assert_eq!(session.actions[0].tick, 1);
        assert!(session.final_state.is_some());
    }

    #[test]
    fn test_recording_twice_is_an_error() {
        let mut sim = simulator();
        sim.start_recording().unwrap();
        assert!(matches!(
            sim.start_recording(),
            Err(RecorderError::AlreadyRecording)
        ));
        sim.stop_recording().unwrap();
        assert!(matches!(
            sim.stop_recording(),
            Err(RecorderError::NotRecording)
        ));
    }

    #[test]
    fn test_from_recording_restores_rng_position() {
        let mut sim = simulator();
        sim.act(ActOrigin::System("warmup"), |ctx| {
            ctx.rng.model.random("warmup");
            ctx.rng.cosmetic.random("warmup");
        });
        sim.start_recording().unwrap();
        let session = sim.stop_recording().unwrap();

        let restored = Simulator::from_recording(&session, Tuning::default()).unwrap();
        assert_eq!(restored.rng_counts(), RngCounts { model: 1, cosmetic: 1 });
        assert_eq!(restored.model(), sim.model());
    }
}
