//! Session Controller
//!
//! Owns the simulator, the animated view, the input router and the clock,
//! and runs them in a fixed order each tick:
//!
//! 1. orchestrator tick (one transaction)
//! 2. view resync if the transaction changed anything it shows
//! 3. one animation step
//! 4. each completion the view reported, as its own transaction, each
//!    followed by a resync
//!
//! UI-only ticks advance the menus and nothing else, so input can be driven
//! while model time stands still.

use conference_core::{
    ActOrigin, ActionResult, DualRng, RecorderError, SessionLoadError, Simulator, SimulatorModel,
    TickReport,
};
use session_events::{ActionName, ActionRequest, ModelSnapshot, RecordedSession};

use crate::config::SessionConfig;
use crate::input::{InputError, InputRouter};
use crate::layout::SeatRing;
use crate::scheduler::Scheduler;
use crate::view::components::ViewEvent;
use crate::view::{ConferenceView, MenuKind};

pub mod session_constants {
    /// Settle rounds before giving up on a view that keeps reporting
    pub const MAX_SETTLE_ROUNDS: usize = 64;
    /// UI ticks a live driver waits for a menu to open
    pub const MAX_MENU_WAIT_TICKS: usize = 600;
}

/// What one model tick did.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub report: TickReport,
    pub completions: Vec<ViewEvent>,
}

#[derive(Debug)]
pub struct SessionController {
    simulator: Simulator,
    view: ConferenceView,
    input: InputRouter,
    scheduler: Scheduler,
    config: SessionConfig,
    synced_revision: Option<u64>,
}

impl SessionController {
    pub fn new(model: SimulatorModel, config: SessionConfig, rng: DualRng) -> Self {
        let simulator = Simulator::with_rng(model, config.tuning.clone(), rng);
        Self::from_simulator(simulator, config)
    }

    pub fn with_seed(model: SimulatorModel, config: SessionConfig, seed: u64) -> Self {
        Self::new(model, config, DualRng::seeded(seed))
    }

    /// Rebuilds the session a recording started from.
    pub fn from_recording(
        session: &RecordedSession,
        config: SessionConfig,
    ) -> Result<Self, SessionLoadError> {
        let simulator = Simulator::from_recording(session, config.tuning.clone())?;
        Ok(Self::from_simulator(simulator, config))
    }

    /// Wraps an existing simulator, e.g. one with a trace file attached.
    pub fn from_simulator(simulator: Simulator, config: SessionConfig) -> Self {
        let view = ConferenceView::new(
            config.view.clone(),
            SeatRing::new(config.view.layout.clone()),
        );
        let mut session = Self {
            simulator,
            view,
            input: InputRouter::new(),
            scheduler: Scheduler::new(config.view.fixed_dt),
            config,
            synced_revision: None,
        };
        session.settle();
        session
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn model(&self) -> &SimulatorModel {
        self.simulator.model()
    }

    pub fn view(&self) -> &ConferenceView {
        &self.view
    }

    pub fn input(&self) -> &InputRouter {
        &self.input
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        self.simulator.model().snapshot()
    }

    // === TICKS ===

    /// Runs one model tick.
    pub fn tick(&mut self) -> TickOutcome {
        let dt = self.scheduler.step();
        let report = self.simulator.advance_time(dt).value;
        self.sync_if_dirty();

        let now = self.view_time();
        let completions = self.view.run(dt as f32, now);
        self.apply_completions(&completions);

        self.input.advance(dt, self.config.view.menu_open_duration);
        TickOutcome {
            report,
            completions,
        }
    }

    /// Runs one UI-only tick: menus animate, model and view stand still.
    pub fn tick_ui(&mut self) {
        let dt = self.scheduler.ui_step();
        self.input.advance(dt, self.config.view.menu_open_duration);
    }

    /// Finishes every running animation and applies the completions that
    /// produces, until the view reports nothing more.
    pub fn settle(&mut self) {
        self.sync_if_dirty();
        for _ in 0..session_constants::MAX_SETTLE_ROUNDS {
            let events = self.view.settle_step(self.view_time());
            if events.is_empty() {
                return;
            }
            self.apply_completions(&events);
        }
        tracing::warn!(
            rounds = session_constants::MAX_SETTLE_ROUNDS,
            "view still reporting completions after settling"
        );
    }

    fn view_time(&self) -> f32 {
        self.simulator.model().elapsed() as f32
    }

    fn sync_if_dirty(&mut self) {
        let revision = self.simulator.revision();
        if self.synced_revision != Some(revision) {
            self.view.sync(&self.simulator.model().snapshot());
            self.synced_revision = Some(revision);
        }
    }

    fn apply_completions(&mut self, events: &[ViewEvent]) {
        for event in events {
            tracing::debug!(event = event.label(), part = %event.part(), "view completion");
            self.simulator
                .act(ActOrigin::System(event.label()), |ctx| match event {
                    ViewEvent::UnblendingCompleted(id) => {
                        let separating = ctx.model.blend_state(id).is_some_and(|b| b.separating);
                        if separating {
                            ctx.model.set_blending_degree(id, 0.0);
                            ctx.model.promote_blended_to_target(id);
                        }
                    }
                    ViewEvent::PendingBlendArrived(id) => {
                        ctx.model.complete_pending_blend(id);
                    }
                    ViewEvent::ExitFinished(id) => {
                        ctx.model.clear_displaced(id);
                    }
                });
            self.sync_if_dirty();
        }
    }

    // === ACTIONS ===

    /// Performs an action directly, without going through a menu.
    pub fn perform(&mut self, request: &ActionRequest) -> ActionResult {
        let result = self.simulator.perform(request).value;
        self.sync_if_dirty();
        result
    }

    /// Opens the menu that offers `request`: a click on the subject for
    /// part actions, a long press for biography fields. Falls back to
    /// opening the menu directly when the gesture lands elsewhere.
    pub fn begin_input(&mut self, request: &ActionRequest) -> MenuKind {
        let wanted = match request.action {
            ActionName::RayFieldSelect => MenuKind::RayField(request.subject.clone()),
            _ => MenuKind::Part(request.subject.clone()),
        };
        let snapshot = self.snapshot();
        let at = self
            .view
            .position(&request.subject)
            .unwrap_or_else(|| self.view.center());

        let opened = match wanted {
            MenuKind::RayField(_) => self.input.long_press(&self.view, &snapshot, at),
            MenuKind::Part(_) => self.input.click(&self.view, &snapshot, at),
        }
        .map(|menu| menu.kind.clone());

        match opened {
            Ok(kind) if kind == wanted => {}
            Ok(kind) => {
                tracing::debug!(?kind, ?wanted, "gesture opened another menu; opening directly");
                self.input.open_direct(wanted.clone(), at, &snapshot);
            }
            Err(e) => {
                tracing::debug!(%request, "gesture failed ({}); opening menu directly", e);
                self.input.open_direct(wanted.clone(), at, &snapshot);
            }
        }
        wanted
    }

    /// Selects `request` in the open menu and performs it.
    pub fn finish_input(&mut self, request: &ActionRequest) -> Result<ActionResult, InputError> {
        let chosen = self.input.select_request(request)?;
        Ok(self.perform(&chosen))
    }

    pub fn cancel_input(&mut self) {
        self.input.cancel();
    }

    /// Performs `request` the way a player would: gesture, wait for the
    /// menu to open, select the slice.
    pub fn perform_via_input(&mut self, request: &ActionRequest) -> ActionResult {
        self.begin_input(request);
        for _ in 0..session_constants::MAX_MENU_WAIT_TICKS {
            if self.input.is_open() {
                break;
            }
            self.tick_ui();
        }
        match self.finish_input(request) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(%request, "menu selection failed ({}); performing directly", e);
                self.input.cancel();
                self.perform(request)
            }
        }
    }

    // === RECORDING ===

    pub fn is_recording(&self) -> bool {
        self.simulator.is_recording()
    }

    /// Settles the view, then starts recording with the session settings
    /// attached.
    pub fn start_recording(&mut self) -> Result<(), RecorderError> {
        // Serialized up front so a failure leaves no recorder running
        let config = self.config.to_json()?;
        self.settle();
        self.simulator.start_recording()?;
        self.simulator.annotate_recording(config);
        Ok(())
    }

    pub fn stop_recording(&mut self) -> Result<RecordedSession, RecorderError> {
        self.simulator.stop_recording()
    }
}
