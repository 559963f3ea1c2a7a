//! View components and resources.

use bevy_ecs::prelude::*;
use std::collections::HashMap;

use session_events::PartId;

use crate::layout::Point;

/// Visual scale per role
pub mod view_constants {
    pub const IDLE_SCALE: f32 = 0.7;
    pub const SEATED_SCALE: f32 = 1.0;
    pub const SUPPORTING_SCALE: f32 = 0.8;
    pub const BLENDED_SCALE: f32 = 1.3;
    /// Entities below this opacity cannot be clicked
    pub const MIN_CLICKABLE_OPACITY: f32 = 0.5;
}

/// Links an entity to the part it draws.
#[derive(Component, Debug, Clone, PartialEq, Eq)]
pub struct ViewPart {
    pub id: PartId,
}

/// Displayed values and the values they are smoothing toward.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct AnimatedState {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
    pub opacity: f32,
    pub blend: f32,
    pub target_x: f32,
    pub target_y: f32,
    pub target_scale: f32,
    pub target_opacity: f32,
    pub target_blend: f32,
    /// Blend degree at the end of the previous tick
    pub prev_blend: f32,
}

impl AnimatedState {
    pub fn at(point: Point, scale: f32) -> Self {
        Self {
            x: point.x,
            y: point.y,
            scale,
            opacity: 1.0,
            blend: 0.0,
            target_x: point.x,
            target_y: point.y,
            target_scale: scale,
            target_opacity: 1.0,
            target_blend: 0.0,
            prev_blend: 0.0,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn target_position(&self) -> Point {
        Point::new(self.target_x, self.target_y)
    }

    /// Jumps every displayed value to its target.
    pub fn snap(&mut self) {
        self.x = self.target_x;
        self.y = self.target_y;
        self.scale = self.target_scale;
        self.opacity = self.target_opacity;
        self.blend = self.target_blend;
    }
}

/// Where an entity should be, in layout terms.
#[derive(Component, Debug, Clone, PartialEq)]
pub enum PositionTarget {
    IdleLayout { index: usize, count: usize },
    Seat { index: usize, count: usize },
    StarOrbit { index: usize, count: usize },
    SupportingOffset { target: PartId, index: usize },
    /// Between the star and the seat the part will take once separated,
    /// weighted by its current blend degree
    BlendedStretch { seat_index: usize, seat_count: usize },
    FrozenAbsolute { x: f32, y: f32 },
}

/// The conference role the entity was last synced to.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRole {
    Idle,
    Target,
    Blended { separating: bool },
    /// First in the pending queue, travelling to the center
    PendingHead,
    Pending,
    Supporting,
    /// Displaced, spiralling out
    Exiting,
}

impl ViewRole {
    pub fn is_conferencing(self) -> bool {
        !matches!(self, ViewRole::Idle | ViewRole::Exiting)
    }
}

/// Finite animations that override smoothing while they run.
#[derive(Debug, Clone, PartialEq)]
pub enum FiniteAnimation {
    SpiralExit {
        origin: Point,
        start_radius: f32,
        start_angle: f32,
        elapsed: f32,
        duration: f32,
    },
    FlyOut {
        from: Point,
        to: Point,
        from_scale: f32,
        elapsed: f32,
        duration: f32,
    },
    /// Held invisible until `wake_at` (view seconds)
    ArrivalGate { wake_at: f32 },
}

impl FiniteAnimation {
    /// Seconds until an exit animation finishes; zero for gates.
    pub fn exit_remaining(&self) -> f32 {
        match self {
            FiniteAnimation::SpiralExit {
                elapsed, duration, ..
            }
            | FiniteAnimation::FlyOut {
                elapsed, duration, ..
            } => (duration - elapsed).max(0.0),
            FiniteAnimation::ArrivalGate { .. } => 0.0,
        }
    }

    pub fn is_spiral(&self) -> bool {
        matches!(self, FiniteAnimation::SpiralExit { .. })
    }
}

/// The finite animation currently running on an entity, if any.
#[derive(Component, Debug, Clone, Default, PartialEq)]
pub struct ActiveAnimation(pub Option<FiniteAnimation>);

/// Distance to the center last tick, for the pending head.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct ArrivalWatch {
    pub prev_distance: f32,
}

impl Default for ArrivalWatch {
    fn default() -> Self {
        Self {
            prev_distance: f32::INFINITY,
        }
    }
}

/// Which menu an interaction opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuKind {
    /// Actions on one part
    Part(PartId),
    /// Biography fields of the part on the self-ray
    RayField(PartId),
}

/// What the input layer may do with an entity, rebuilt when its role changes.
#[derive(Component, Debug, Clone, Default, PartialEq, Eq)]
pub struct InteractionCapabilities {
    pub click: Option<MenuKind>,
    pub long_press: Option<MenuKind>,
    /// Shows a tooltip on hover
    pub hover: bool,
}

// === RESOURCES ===

/// View time for the current schedule run.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrameClock {
    pub dt: f32,
    pub now: f32,
}

/// Events detected by the view that feed back into the model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ViewEvent {
    UnblendingCompleted(PartId),
    PendingBlendArrived(PartId),
    ExitFinished(PartId),
}

impl ViewEvent {
    pub fn label(&self) -> &'static str {
        match self {
            ViewEvent::UnblendingCompleted(_) => "unblending_completed",
            ViewEvent::PendingBlendArrived(_) => "pending_blend_arrived",
            ViewEvent::ExitFinished(_) => "exit_finished",
        }
    }

    pub fn part(&self) -> &PartId {
        match self {
            ViewEvent::UnblendingCompleted(id)
            | ViewEvent::PendingBlendArrived(id)
            | ViewEvent::ExitFinished(id) => id,
        }
    }
}

#[derive(Resource, Debug, Default)]
pub struct CompletionQueue {
    events: Vec<ViewEvent>,
}

impl CompletionQueue {
    pub fn push(&mut self, event: ViewEvent) {
        self.events.push(event);
    }

    /// Takes all queued events, sorted so the order does not depend on
    /// entity storage.
    pub fn drain_sorted(&mut self) -> Vec<ViewEvent> {
        let mut events = std::mem::take(&mut self.events);
        events.sort();
        events.dedup();
        events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Seat of every target as of the last sync, for supporting offsets.
#[derive(Resource, Debug, Default)]
pub struct SeatAssignments {
    pub seats: HashMap<PartId, (usize, usize)>,
}

/// Part id to entity.
#[derive(Resource, Debug, Default)]
pub struct ViewIndex {
    pub map: HashMap<PartId, Entity>,
}

impl ViewIndex {
    pub fn get(&self, id: &PartId) -> Option<Entity> {
        self.map.get(id).copied()
    }
}
