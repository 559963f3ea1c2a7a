//! Animated View
//!
//! Per-part visual state kept in a `bevy_ecs` world. The model is never read
//! from here directly: the session hands over a [`ModelSnapshot`] after each
//! transaction that touched the view, the schedule animates toward the
//! resolved targets, and the completions it detects go back to the session
//! to be applied as transactions.

pub mod components;
pub mod sync;
pub mod systems;

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;

use session_events::{ModelSnapshot, PartId};

use crate::config::ViewConfig;
use crate::layout::{Layout, LayoutProvider, Point};
use components::{
    view_constants, ActiveAnimation, AnimatedState, CompletionQueue, FiniteAnimation, FrameClock,
    InteractionCapabilities, SeatAssignments, ViewEvent, ViewIndex, ViewRole,
};

pub use components::MenuKind;

/// View settings as a world resource.
#[derive(Resource, Debug, Clone)]
pub struct ViewSettings(pub ViewConfig);

pub struct ConferenceView {
    world: World,
    schedule: Schedule,
    settle_schedule: Schedule,
}

impl ConferenceView {
    pub fn new(config: ViewConfig, layout: impl LayoutProvider + 'static) -> Self {
        let mut world = World::new();
        world.insert_resource(ViewSettings(config));
        world.insert_resource(Layout::new(layout));
        world.insert_resource(FrameClock::default());
        world.insert_resource(CompletionQueue::default());
        world.insert_resource(SeatAssignments::default());
        world.insert_resource(ViewIndex::default());

        let mut schedule = Schedule::default();
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule.add_systems(
            (
                systems::update_layout,
                systems::resolve_targets,
                systems::run_finite_animations,
                systems::smooth_toward_targets,
                systems::detect_completions,
            )
                .chain(),
        );

        let mut settle_schedule = Schedule::default();
        settle_schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        settle_schedule.add_systems(
            (
                systems::update_layout,
                systems::resolve_targets,
                systems::finish_animations,
                systems::snap_all,
                systems::detect_completions,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            settle_schedule,
        }
    }

    pub fn config(&self) -> &ViewConfig {
        &self.world.resource::<ViewSettings>().0
    }

    /// Applies the model state to the view.
    pub fn sync(&mut self, snapshot: &ModelSnapshot) {
        sync::sync_world(&mut self.world, snapshot, snapshot.elapsed as f32);
    }

    /// Runs one animation step and returns the completions it detected.
    pub fn run(&mut self, dt: f32, now: f32) -> Vec<ViewEvent> {
        *self.world.resource_mut::<FrameClock>() = FrameClock { dt, now };
        self.schedule.run(&mut self.world);
        self.world.resource_mut::<CompletionQueue>().drain_sorted()
    }

    /// Ends all animations and snaps every entity onto its target. Returns
    /// the completions that snapping produced.
    pub fn settle_step(&mut self, now: f32) -> Vec<ViewEvent> {
        *self.world.resource_mut::<FrameClock>() = FrameClock { dt: 0.0, now };
        self.settle_schedule.run(&mut self.world);
        self.world.resource_mut::<CompletionQueue>().drain_sorted()
    }

    pub fn center(&self) -> Point {
        self.world.resource::<Layout>().center()
    }

    fn entity(&self, id: &PartId) -> Option<Entity> {
        self.world.resource::<ViewIndex>().get(id)
    }

    pub fn state(&self, id: &PartId) -> Option<&AnimatedState> {
        self.world.get::<AnimatedState>(self.entity(id)?)
    }

    pub fn role(&self, id: &PartId) -> Option<ViewRole> {
        self.world.get::<ViewRole>(self.entity(id)?).copied()
    }

    pub fn animation(&self, id: &PartId) -> Option<&FiniteAnimation> {
        self.world
            .get::<ActiveAnimation>(self.entity(id)?)
            .and_then(|a| a.0.as_ref())
    }

    pub fn capabilities(&self, id: &PartId) -> Option<&InteractionCapabilities> {
        self.world.get::<InteractionCapabilities>(self.entity(id)?)
    }

    /// Current position of a part on screen.
    pub fn position(&self, id: &PartId) -> Option<Point> {
        self.state(id).map(AnimatedState::position)
    }

    /// The clickable part nearest to `point` within the hit radius. Parts
    /// that are faded out or running an exit cannot be hit.
    pub fn hit_test(&self, point: Point) -> Option<PartId> {
        let radius = self.config().hit_radius;
        let mut best: Option<(f32, &PartId)> = None;
        for (id, entity) in &self.world.resource::<ViewIndex>().map {
            let Some(state) = self.world.get::<AnimatedState>(*entity) else {
                continue;
            };
            if state.opacity < view_constants::MIN_CLICKABLE_OPACITY {
                continue;
            }
            let exiting = self
                .world
                .get::<ActiveAnimation>(*entity)
                .and_then(|a| a.0.as_ref())
                .is_some_and(|a| a.exit_remaining() > 0.0);
            if exiting {
                continue;
            }
            let distance = state.position().distance(point);
            if distance > radius {
                continue;
            }
            let closer = match best {
                None => true,
                Some((d, best_id)) => distance < d || (distance == d && id < best_id),
            };
            if closer {
                best = Some((distance, id));
            }
        }
        best.map(|(_, id)| id.clone())
    }

    /// Every part's displayed state, in id order.
    pub fn states(&self) -> Vec<(PartId, AnimatedState)> {
        let mut out: Vec<(PartId, AnimatedState)> = self
            .world
            .resource::<ViewIndex>()
            .map
            .iter()
            .filter_map(|(id, entity)| {
                self.world
                    .get::<AnimatedState>(*entity)
                    .map(|s| (id.clone(), s.clone()))
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }
}

impl std::fmt::Debug for ConferenceView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConferenceView")
            .field("parts", &self.world.resource::<ViewIndex>().map.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::layout::SeatRing;
    use session_events::{BlendReason, BlendSnapshot, PendingSnapshot};

    const DT: f32 = 1.0 / 60.0;

    fn pid(id: &str) -> PartId {
        PartId::new(id)
    }

    fn view() -> ConferenceView {
        ConferenceView::new(ViewConfig::default(), SeatRing::new(LayoutConfig::default()))
    }

    fn snapshot(ids: &[&str]) -> ModelSnapshot {
        ModelSnapshot {
            parts: ids.iter().map(|id| pid(id)).collect(),
            ..Default::default()
        }
    }

    fn run_for(view: &mut ConferenceView, seconds: f32, mut now: f32) -> (Vec<ViewEvent>, f32) {
        let mut events = Vec::new();
        let steps = (seconds / DT).ceil() as usize;
        for _ in 0..steps {
            now += DT;
            events.extend(view.run(DT, now));
        }
        (events, now)
    }

    #[test]
    fn test_target_moves_to_seat() {
        let mut view = view();
        let mut snap = snapshot(&["a"]);
        view.sync(&snap);
        snap.targets.push(pid("a"));
        view.sync(&snap);

        run_for(&mut view, 3.0, 0.0);
        let state = view.state(&pid("a")).unwrap();
        let seat_distance = state.position().distance(view.center());
        assert!((seat_distance - 220.0).abs() < 2.0);
        assert_eq!(view.role(&pid("a")), Some(ViewRole::Target));
    }

    #[test]
    fn test_pending_head_arrival_reported_once() {
        let mut view = view();
        let mut snap = snapshot(&["a"]);
        snap.pending.push(PendingSnapshot {
            part: pid("a"),
            reason: BlendReason::Spontaneous,
        });
        view.sync(&snap);

        let (events, _) = run_for(&mut view, 4.0, 0.0);
        assert_eq!(events, vec![ViewEvent::PendingBlendArrived(pid("a"))]);
    }

    #[test]
    fn test_separation_reports_unblending() {
        let mut view = view();
        let mut snap = snapshot(&["a"]);
        snap.blended.push(BlendSnapshot {
            part: pid("a"),
            degree: 1.0,
            reason: BlendReason::Spontaneous,
            separating: false,
        });
        view.sync(&snap);
        let (events, now) = run_for(&mut view, 2.0, 0.0);
        assert!(events.is_empty());
        assert!(view.state(&pid("a")).unwrap().blend > 0.99);

        snap.blended[0].separating = true;
        view.sync(&snap);
        let (events, _) = run_for(&mut view, 2.0, now);
        assert_eq!(events, vec![ViewEvent::UnblendingCompleted(pid("a"))]);
    }

    #[test]
    fn test_displaced_part_spirals_out_and_gates_newcomer() {
        let mut view = view();
        let mut snap = snapshot(&["a", "b"]);
        snap.targets.push(pid("b"));
        view.sync(&snap);
        view.settle_step(0.0);

        snap.targets.clear();
        snap.displaced.push(pid("b"));
        snap.blended.push(BlendSnapshot {
            part: pid("a"),
            degree: 1.0,
            reason: BlendReason::Spontaneous,
            separating: false,
        });
        view.sync(&snap);

        assert!(view.animation(&pid("b")).is_some_and(FiniteAnimation::is_spiral));
        assert!(matches!(
            view.animation(&pid("a")),
            Some(FiniteAnimation::ArrivalGate { .. })
        ));
        assert!(view.hit_test(view.position(&pid("b")).unwrap()).is_none());

        let (events, _) = run_for(&mut view, 0.5, 0.0);
        assert!(events.is_empty());
        assert_eq!(view.state(&pid("a")).unwrap().opacity, 0.0);

        let (events, _) = run_for(&mut view, 1.2, 0.5);
        assert_eq!(events, vec![ViewEvent::ExitFinished(pid("b"))]);
        assert!(view.animation(&pid("a")).is_none());
    }

    #[test]
    fn test_settle_finishes_everything() {
        let mut view = view();
        let mut snap = snapshot(&["a", "b"]);
        snap.displaced.push(pid("a"));
        snap.pending.push(PendingSnapshot {
            part: pid("b"),
            reason: BlendReason::UserInitiated,
        });
        view.sync(&snap);

        let events = view.settle_step(0.0);
        assert_eq!(
            events,
            vec![
                ViewEvent::PendingBlendArrived(pid("b")),
                ViewEvent::ExitFinished(pid("a")),
            ]
        );
        assert!(view.animation(&pid("a")).is_none());
        assert_eq!(view.position(&pid("b")), Some(view.center()));
    }

    #[test]
    fn test_dismissed_target_flies_out() {
        let mut view = view();
        let mut snap = snapshot(&["a"]);
        snap.targets.push(pid("a"));
        view.sync(&snap);
        view.settle_step(0.0);

        snap.targets.clear();
        view.sync(&snap);
        assert!(matches!(
            view.animation(&pid("a")),
            Some(FiniteAnimation::FlyOut { .. })
        ));
        run_for(&mut view, 1.0, 0.0);
        assert!(view.animation(&pid("a")).is_none());
    }

    #[test]
    fn test_hit_test_picks_nearest() {
        let mut view = view();
        let mut snap = snapshot(&["a", "b"]);
        snap.targets = vec![pid("a"), pid("b")];
        view.sync(&snap);
        view.settle_step(0.0);

        let a = view.position(&pid("a")).unwrap();
        assert_eq!(view.hit_test(a), Some(pid("a")));
        assert_eq!(view.hit_test(Point::new(a.x + 5.0, a.y)), Some(pid("a")));
        assert!(view.hit_test(view.center()).is_none());
    }
}
