//! Model-to-view synchronization
//!
//! Derives each part's role and symbolic target from a model snapshot, and
//! starts the finite animations that role changes call for: a spiral for a
//! displaced part, a fly-out for a voluntary departure, and an arrival gate
//! for anything joining while exits are still running.

use bevy_ecs::prelude::*;
use std::collections::{BTreeMap, HashSet};

use session_events::{ModelSnapshot, PartId};

use super::components::{
    view_constants, ActiveAnimation, AnimatedState, ArrivalWatch, FiniteAnimation,
    InteractionCapabilities, MenuKind, PositionTarget, SeatAssignments, ViewIndex, ViewPart,
    ViewRole,
};
use super::ViewSettings;
use crate::layout::Layout;

/// Role and target a part should have according to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub role: ViewRole,
    pub target: PositionTarget,
}

/// Computes the placement of every part in the snapshot.
pub fn placements(snapshot: &ModelSnapshot) -> BTreeMap<PartId, Placement> {
    let mut out = BTreeMap::new();
    let part_count = snapshot.parts.len();

    for (index, id) in snapshot.parts.iter().enumerate() {
        out.insert(
            id.clone(),
            Placement {
                role: ViewRole::Idle,
                target: PositionTarget::IdleLayout {
                    index,
                    count: part_count,
                },
            },
        );
    }

    for id in &snapshot.displaced {
        if let Some(p) = out.get_mut(id) {
            p.role = ViewRole::Exiting;
        }
    }

    for (target, supporters) in &snapshot.supporting {
        for (index, id) in supporters.iter().enumerate() {
            if let Some(p) = out.get_mut(id) {
                p.role = ViewRole::Supporting;
                p.target = PositionTarget::SupportingOffset {
                    target: target.clone(),
                    index,
                };
            }
        }
    }

    for (position, pending) in snapshot.pending.iter().enumerate() {
        if let Some(p) = out.get_mut(&pending.part) {
            if position == 0 {
                p.role = ViewRole::PendingHead;
                p.target = PositionTarget::StarOrbit { index: 0, count: 1 };
            } else {
                p.role = ViewRole::Pending;
            }
        }
    }

    let seat_count = snapshot.targets.len();
    let separating: Vec<&PartId> = snapshot
        .blended
        .iter()
        .filter(|b| b.separating)
        .map(|b| &b.part)
        .collect();
    let settled: Vec<&PartId> = snapshot
        .blended
        .iter()
        .filter(|b| !b.separating)
        .map(|b| &b.part)
        .collect();

    for (index, id) in settled.iter().enumerate() {
        if let Some(p) = out.get_mut(*id) {
            p.role = ViewRole::Blended { separating: false };
            p.target = PositionTarget::StarOrbit {
                index,
                count: settled.len(),
            };
        }
    }
    // A separating part heads for the seat it will take once promoted
    for (index, id) in separating.iter().enumerate() {
        if let Some(p) = out.get_mut(*id) {
            p.role = ViewRole::Blended { separating: true };
            p.target = PositionTarget::BlendedStretch {
                seat_index: seat_count + index,
                seat_count: seat_count + separating.len(),
            };
        }
    }

    for (index, id) in snapshot.targets.iter().enumerate() {
        if let Some(p) = out.get_mut(id) {
            p.role = ViewRole::Target;
            p.target = PositionTarget::Seat {
                index,
                count: seat_count,
            };
        }
    }
    out
}

fn capabilities(id: &PartId, role: ViewRole, snapshot: &ModelSnapshot) -> InteractionCapabilities {
    if role == ViewRole::Exiting {
        return InteractionCapabilities::default();
    }
    let on_ray = role == ViewRole::Target && snapshot.self_ray.as_ref() == Some(id);
    InteractionCapabilities {
        click: Some(MenuKind::Part(id.clone())),
        long_press: on_ray.then(|| MenuKind::RayField(id.clone())),
        hover: true,
    }
}

/// Brings the view world in line with `snapshot`. `now` is the view time
/// the transitions start at.
pub fn sync_world(world: &mut World, snapshot: &ModelSnapshot, now: f32) {
    let placements = placements(snapshot);
    let settings = world.resource::<ViewSettings>().0.clone();
    let (center, edge) = {
        let layout = world.resource::<Layout>();
        (layout.center(), layout.edge_radius())
    };

    despawn_missing(world, &placements);

    let mut joining = Vec::new();
    for (id, placement) in &placements {
        let entity = match world.resource::<ViewIndex>().get(id) {
            Some(entity) => entity,
            None => spawn_part(world, id, &placement.target),
        };
        let Some(mut entity_mut) = world.get_entity_mut(entity) else {
            continue;
        };
        let old_role = entity_mut
            .get::<ViewRole>()
            .copied()
            .unwrap_or(ViewRole::Idle);
        let new_role = placement.role;
        let position = entity_mut
            .get::<AnimatedState>()
            .map(AnimatedState::position)
            .unwrap_or(center);

        let caps = capabilities(id, new_role, snapshot);
        if entity_mut.get::<InteractionCapabilities>() != Some(&caps) {
            entity_mut.insert(caps);
        }

        if old_role == new_role && new_role == ViewRole::Exiting {
            // Keep the frozen origin of a running spiral
            continue;
        }

        let mut animation = entity_mut
            .get::<ActiveAnimation>()
            .cloned()
            .unwrap_or_default();
        let mut target = placement.target.clone();

        if new_role != old_role {
            tracing::debug!(part = %id, from = ?old_role, to = ?new_role, "view role changed");
            match new_role {
                ViewRole::Exiting => {
                    target = PositionTarget::FrozenAbsolute {
                        x: position.x,
                        y: position.y,
                    };
                    animation.0 = Some(FiniteAnimation::SpiralExit {
                        origin: center,
                        start_radius: position.distance(center),
                        start_angle: position.angle_from(center),
                        elapsed: 0.0,
                        duration: settings.spiral.duration,
                    });
                }
                ViewRole::Idle if old_role.is_conferencing() => {
                    let scale = entity_mut
                        .get::<AnimatedState>()
                        .map(|s| s.scale)
                        .unwrap_or(view_constants::SEATED_SCALE);
                    animation.0 = Some(FiniteAnimation::FlyOut {
                        from: position,
                        to: center.polar(edge, position.angle_from(center)),
                        from_scale: scale,
                        elapsed: 0.0,
                        duration: settings.fly_out.duration,
                    });
                }
                _ => {
                    if old_role == ViewRole::Exiting {
                        animation.0 = None;
                    }
                    if new_role.is_conferencing() && !old_role.is_conferencing() {
                        joining.push(entity);
                    }
                }
            }
            if new_role == (ViewRole::Blended { separating: true }) {
                if let Some(mut state) = entity_mut.get_mut::<AnimatedState>() {
                    state.prev_blend = state.blend.max(1.0);
                }
            }
            if new_role == ViewRole::PendingHead {
                entity_mut.insert(ArrivalWatch::default());
            }
        }

        entity_mut.insert((new_role, target, animation));
    }

    gate_arrivals(world, &joining, now);

    let seats = snapshot
        .targets
        .iter()
        .enumerate()
        .map(|(index, id)| (id.clone(), (index, snapshot.targets.len())))
        .collect();
    world.resource_mut::<SeatAssignments>().seats = seats;
}

/// Holds joining entities invisible until every running exit is done.
fn gate_arrivals(world: &mut World, joining: &[Entity], now: f32) {
    let mut query = world.query::<&ActiveAnimation>();
    let longest_exit = query
        .iter(world)
        .filter_map(|a| a.0.as_ref())
        .filter(|a| a.is_spiral())
        .map(FiniteAnimation::exit_remaining)
        .fold(0.0_f32, f32::max);

    for &entity in joining {
        if let Some(mut active) = world.get_mut::<ActiveAnimation>(entity) {
            active.0 = if longest_exit > 0.0 {
                Some(FiniteAnimation::ArrivalGate {
                    wake_at: now + longest_exit,
                })
            } else {
                None
            };
        }
    }
}

fn spawn_part(world: &mut World, id: &PartId, target: &PositionTarget) -> Entity {
    let start = {
        let layout = world.resource::<Layout>();
        match target {
            PositionTarget::IdleLayout { index, count } => layout
                .idle_position(*index, *count)
                .unwrap_or_else(|| layout.center()),
            _ => layout.center(),
        }
    };
    let entity = world
        .spawn((
            ViewPart { id: id.clone() },
            AnimatedState::at(start, view_constants::IDLE_SCALE),
            target.clone(),
            ViewRole::Idle,
            ActiveAnimation::default(),
            ArrivalWatch::default(),
            InteractionCapabilities::default(),
        ))
        .id();
    world.resource_mut::<ViewIndex>().map.insert(id.clone(), entity);
    entity
}

fn despawn_missing(world: &mut World, placements: &BTreeMap<PartId, Placement>) {
    let known: HashSet<&PartId> = placements.keys().collect();
    let stale: Vec<(PartId, Entity)> = world
        .resource::<ViewIndex>()
        .map
        .iter()
        .filter(|(id, _)| !known.contains(id))
        .map(|(id, entity)| (id.clone(), *entity))
        .collect();
    for (id, entity) in stale {
        world.despawn(entity);
        world.resource_mut::<ViewIndex>().map.remove(&id);
    }
}
