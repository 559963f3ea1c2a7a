//! Per-tick view systems
//!
//! Run in this order every tick: move the layout, resolve symbolic targets,
//! advance finite animations, smooth toward targets, detect completions.

use bevy_ecs::prelude::*;
use std::f32::consts::TAU;

use super::components::{
    view_constants, ActiveAnimation, AnimatedState, ArrivalWatch, CompletionQueue, FiniteAnimation,
    FrameClock, PositionTarget, SeatAssignments, ViewEvent, ViewPart, ViewRole,
};
use super::ViewSettings;
use crate::layout::{Layout, LayoutProvider, Point};

pub fn update_layout(clock: Res<FrameClock>, mut layout: ResMut<Layout>) {
    layout.0.update(clock.now);
}

/// Turns a symbolic target into a point. `None` when the layout has no data
/// for it this tick.
pub fn resolve_point(
    layout: &dyn LayoutProvider,
    seats: &SeatAssignments,
    target: &PositionTarget,
    blend: f32,
) -> Option<Point> {
    match target {
        PositionTarget::IdleLayout { index, count } => layout.idle_position(*index, *count),
        PositionTarget::Seat { index, count } => layout.seat(*index, *count),
        PositionTarget::StarOrbit { index, count } => Some(layout.star_orbit(*index, *count)),
        PositionTarget::SupportingOffset { target, index } => {
            let (seat_index, seat_count) = seats.seats.get(target).copied()?;
            let seat = layout.seat(seat_index, seat_count)?;
            Some(layout.supporting_offset(seat, *index))
        }
        PositionTarget::BlendedStretch {
            seat_index,
            seat_count,
        } => {
            let seat = layout.seat(*seat_index, *seat_count)?;
            Some(seat.lerp(layout.center(), blend.clamp(0.0, 1.0)))
        }
        PositionTarget::FrozenAbsolute { x, y } => Some(Point::new(*x, *y)),
    }
}

fn role_targets(role: ViewRole, blend: f32) -> (f32, f32) {
    use view_constants::*;
    match role {
        ViewRole::Idle | ViewRole::Pending | ViewRole::Exiting => (IDLE_SCALE, 0.0),
        ViewRole::Target | ViewRole::PendingHead => (SEATED_SCALE, 0.0),
        ViewRole::Supporting => (SUPPORTING_SCALE, 0.0),
        ViewRole::Blended { separating: false } => (BLENDED_SCALE, 1.0),
        ViewRole::Blended { separating: true } => {
            (SEATED_SCALE + (BLENDED_SCALE - SEATED_SCALE) * blend, 0.0)
        }
    }
}

pub fn resolve_targets(
    layout: Res<Layout>,
    seats: Res<SeatAssignments>,
    mut query: Query<(&ViewPart, &ViewRole, &PositionTarget, &mut AnimatedState)>,
) {
    for (part, role, target, mut state) in query.iter_mut() {
        let (scale, blend) = role_targets(*role, state.blend);
        state.target_scale = scale;
        state.target_opacity = if *role == ViewRole::Exiting { 0.0 } else { 1.0 };
        state.target_blend = blend;

        // Only the position waits for layout data
        match resolve_point(&**layout, &seats, target, state.blend) {
            Some(point) => {
                state.target_x = point.x;
                state.target_y = point.y;
            }
            None => {
                tracing::trace!(part = %part.id, ?target, "no layout data; retrying next tick");
            }
        }
    }
}

pub fn run_finite_animations(
    clock: Res<FrameClock>,
    layout: Res<Layout>,
    settings: Res<ViewSettings>,
    mut completions: ResMut<CompletionQueue>,
    mut query: Query<(&ViewPart, &mut AnimatedState, &mut ActiveAnimation)>,
) {
    let edge = layout.edge_radius();
    for (part, mut state, mut active) in query.iter_mut() {
        let Some(animation) = active.0.as_mut() else {
            continue;
        };
        let finished = match animation {
            FiniteAnimation::SpiralExit {
                origin,
                start_radius,
                start_angle,
                elapsed,
                duration,
            } => {
                *elapsed += clock.dt;
                let t = progress(*elapsed, *duration);
                let radius = *start_radius + (edge - *start_radius) * t;
                let angle = *start_angle + settings.0.spiral.rotations * TAU * t;
                let point = origin.polar(radius, angle);
                let scale = state.scale;
                pin(&mut state, point, scale, 1.0 - t);
                if t >= 1.0 {
                    completions.push(ViewEvent::ExitFinished(part.id.clone()));
                }
                t >= 1.0
            }
            FiniteAnimation::FlyOut {
                from,
                to,
                from_scale,
                elapsed,
                duration,
            } => {
                *elapsed += clock.dt;
                let t = progress(*elapsed, *duration);
                let scale = *from_scale + (settings.0.fly_out.end_scale - *from_scale) * t;
                pin(&mut state, from.lerp(*to, t), scale, 1.0 - t);
                t >= 1.0
            }
            FiniteAnimation::ArrivalGate { wake_at } => {
                if clock.now >= *wake_at {
                    true
                } else {
                    state.snap();
                    state.opacity = 0.0;
                    false
                }
            }
        };
        if finished {
            active.0 = None;
        }
    }
}

fn progress(elapsed: f32, duration: f32) -> f32 {
    if duration <= 0.0 {
        1.0
    } else {
        (elapsed / duration).min(1.0)
    }
}

/// Sets displayed and target values together so smoothing leaves them alone.
fn pin(state: &mut AnimatedState, point: Point, scale: f32, opacity: f32) {
    state.x = point.x;
    state.y = point.y;
    state.target_x = point.x;
    state.target_y = point.y;
    state.scale = scale;
    state.target_scale = scale;
    state.opacity = opacity;
    state.target_opacity = opacity;
}

pub fn smooth_toward_targets(
    clock: Res<FrameClock>,
    settings: Res<ViewSettings>,
    mut query: Query<(&mut AnimatedState, &ActiveAnimation)>,
) {
    let smoothing = &settings.0.smoothing;
    let dt = clock.dt;
    for (mut state, active) in query.iter_mut() {
        if active.0.is_some() {
            continue;
        }
        let (x, y) = smoothing
            .position
            .step_point((state.x, state.y), (state.target_x, state.target_y), dt);
        state.x = x;
        state.y = y;
        state.scale = smoothing.scale.step(state.scale, state.target_scale, dt);
        state.opacity = smoothing.opacity.step(state.opacity, state.target_opacity, dt);
        state.blend = smoothing.blend.step(state.blend, state.target_blend, dt);
    }
}

/// Compares this tick's values with last tick's and queues crossings.
pub fn detect_completions(
    layout: Res<Layout>,
    settings: Res<ViewSettings>,
    mut completions: ResMut<CompletionQueue>,
    mut query: Query<(
        &ViewPart,
        &ViewRole,
        &ActiveAnimation,
        &mut AnimatedState,
        &mut ArrivalWatch,
    )>,
) {
    let epsilon = settings.0.unblend_epsilon;
    let threshold = settings.0.arrival_threshold;
    let center = layout.center();

    for (part, role, active, mut state, mut watch) in query.iter_mut() {
        if *role == (ViewRole::Blended { separating: true })
            && state.prev_blend > epsilon
            && state.blend <= epsilon
        {
            completions.push(ViewEvent::UnblendingCompleted(part.id.clone()));
        }
        state.prev_blend = state.blend;

        if *role == ViewRole::PendingHead && active.0.is_none() {
            let distance = state.position().distance(center);
            if watch.prev_distance >= threshold && distance < threshold {
                completions.push(ViewEvent::PendingBlendArrived(part.id.clone()));
            }
            watch.prev_distance = distance;
        }
    }
}

// === SETTLE ===

/// Ends every finite animation at once. Finished spirals still report
/// their exit.
pub fn finish_animations(
    mut completions: ResMut<CompletionQueue>,
    mut query: Query<(&ViewPart, &mut ActiveAnimation)>,
) {
    for (part, mut active) in query.iter_mut() {
        if let Some(animation) = active.0.take() {
            if animation.is_spiral() {
                completions.push(ViewEvent::ExitFinished(part.id.clone()));
            }
        }
    }
}

pub fn snap_all(mut query: Query<&mut AnimatedState>) {
    for mut state in query.iter_mut() {
        state.snap();
    }
}
