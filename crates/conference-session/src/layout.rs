//! Layout Providers
//!
//! The view never stores raw coordinates for conference roles. It asks a
//! layout provider where seat 2 of 5 is *this tick*, so a rotating seating
//! ring can be tracked without restarting interpolation.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::config::LayoutConfig;

/// A point in screen space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn lerp(self, other: Point, t: f32) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// Point at `radius` from `self` in direction `angle`.
    pub fn polar(self, radius: f32, angle: f32) -> Point {
        Point::new(self.x + radius * angle.cos(), self.y + radius * angle.sin())
    }

    pub fn angle_from(self, origin: Point) -> f32 {
        (self.y - origin.y).atan2(self.x - origin.x)
    }
}

/// Conference geometry, queried every tick.
///
/// Returning `None` means the provider has no data for that slot yet; the
/// view leaves the entity where it is and asks again next tick.
pub trait LayoutProvider: Send + Sync {
    /// Moves the layout to time `now` (view seconds).
    fn update(&mut self, now: f32);

    fn center(&self) -> Point;

    fn screen_size(&self) -> (f32, f32);

    fn seat(&self, index: usize, count: usize) -> Option<Point>;

    fn idle_position(&self, index: usize, count: usize) -> Option<Point>;

    /// Position of a blended part around the star at the center.
    fn star_orbit(&self, _index: usize, _count: usize) -> Point {
        self.center()
    }

    /// Position of the `index`-th supporting part of the target at `seat`.
    fn supporting_offset(&self, seat: Point, index: usize) -> Point {
        let angle = seat.angle_from(self.center()) + 0.35 * (index as f32 + 1.0);
        seat.polar(48.0, angle)
    }

    /// Distance from the center to the farthest screen corner.
    fn edge_radius(&self) -> f32 {
        let (w, h) = self.screen_size();
        (w * w + h * h).sqrt() / 2.0
    }
}

/// Seats evenly spaced on a slowly rotating ring around the screen center,
/// blended parts circling the center, idle parts on a strip along the
/// bottom edge.
#[derive(Debug, Clone)]
pub struct SeatRing {
    config: LayoutConfig,
    rotation: f32,
}

impl SeatRing {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            rotation: 0.0,
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }
}

impl LayoutProvider for SeatRing {
    fn update(&mut self, now: f32) {
        // Derived from time rather than accumulated so replays land on the
        // same angle
        self.rotation = (self.config.ring_speed * now).rem_euclid(TAU);
    }

    fn center(&self) -> Point {
        Point::new(self.config.screen_width / 2.0, self.config.screen_height / 2.0)
    }

    fn screen_size(&self) -> (f32, f32) {
        (self.config.screen_width, self.config.screen_height)
    }

    fn seat(&self, index: usize, count: usize) -> Option<Point> {
        if index >= count || index >= self.config.max_seats {
            return None;
        }
        let angle = self.rotation - TAU / 4.0 + TAU * index as f32 / count as f32;
        Some(self.center().polar(self.config.ring_radius, angle))
    }

    fn idle_position(&self, index: usize, count: usize) -> Option<Point> {
        if index >= count {
            return None;
        }
        let spacing = self.config.screen_width / (count as f32 + 1.0);
        Some(Point::new(
            spacing * (index as f32 + 1.0),
            self.config.screen_height - self.config.idle_margin,
        ))
    }

    fn star_orbit(&self, index: usize, count: usize) -> Point {
        if count <= 1 {
            return self.center();
        }
        let angle = -self.rotation + TAU * index as f32 / count as f32;
        self.center().polar(self.config.star_orbit_radius, angle)
    }

    fn supporting_offset(&self, seat: Point, index: usize) -> Point {
        let outward = seat.angle_from(self.center());
        let spread = 0.4 * (index as f32 - 0.5);
        seat.polar(self.config.supporting_distance, outward + spread)
    }
}

/// The active layout provider.
#[derive(Resource)]
pub struct Layout(pub Box<dyn LayoutProvider>);

impl Layout {
    pub fn new(provider: impl LayoutProvider + 'static) -> Self {
        Self(Box::new(provider))
    }
}

impl std::ops::Deref for Layout {
    type Target = dyn LayoutProvider;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
