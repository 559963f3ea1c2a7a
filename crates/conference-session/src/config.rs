//! Session Configuration
//!
//! Model tuning plus the settings of the animated view: smoothing per
//! property, finite animation timings, completion thresholds, and the seating
//! ring geometry. Loaded from one TOML file with `[tuning.*]` and `[view.*]`
//! sections; every key is optional.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use conference_core::{ConfigError, Tuning};

/// How a displayed value approaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Smoothing {
    /// Closes `1 - e^(-rate * dt)` of the remaining gap per step
    Exponential { rate: f32 },
    /// Moves at most `speed` units per second
    Linear { speed: f32 },
}

impl Smoothing {
    pub const SNAP: Smoothing = Smoothing::Linear { speed: 0.0 };

    /// A rate or speed of zero snaps straight to the target.
    pub fn is_snap(&self) -> bool {
        match *self {
            Smoothing::Exponential { rate } => rate <= 0.0,
            Smoothing::Linear { speed } => speed <= 0.0,
        }
    }

    pub fn step(&self, current: f32, target: f32, dt: f32) -> f32 {
        if self.is_snap() {
            return target;
        }
        match *self {
            Smoothing::Exponential { rate } => {
                current + (target - current) * (1.0 - (-rate * dt).exp())
            }
            Smoothing::Linear { speed } => {
                let max_step = speed * dt;
                let gap = target - current;
                if gap.abs() <= max_step {
                    target
                } else {
                    current + max_step * gap.signum()
                }
            }
        }
    }

    /// Steps a point, moving along the straight line for linear smoothing.
    pub fn step_point(&self, current: (f32, f32), target: (f32, f32), dt: f32) -> (f32, f32) {
        match *self {
            Smoothing::Linear { speed } if !self.is_snap() => {
                let (dx, dy) = (target.0 - current.0, target.1 - current.1);
                let distance = (dx * dx + dy * dy).sqrt();
                let max_step = speed * dt;
                if distance <= max_step {
                    target
                } else {
                    let k = max_step / distance;
                    (current.0 + dx * k, current.1 + dy * k)
                }
            }
            _ => (
                self.step(current.0, target.0, dt),
                self.step(current.1, target.1, dt),
            ),
        }
    }
}

/// Independent smoothing for each animated property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub position: Smoothing,
    pub scale: Smoothing,
    pub opacity: Smoothing,
    pub blend: Smoothing,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            position: Smoothing::Exponential { rate: 6.0 },
            scale: Smoothing::Exponential { rate: 8.0 },
            opacity: Smoothing::Linear { speed: 2.5 },
            blend: Smoothing::Linear { speed: 1.25 },
        }
    }
}

/// Forced exit of a displaced part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpiralConfig {
    pub duration: f32,
    pub rotations: f32,
}

impl Default for SpiralConfig {
    fn default() -> Self {
        Self {
            duration: 1.5,
            rotations: 1.5,
        }
    }
}

/// Voluntary departure toward the screen edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlyOutConfig {
    pub duration: f32,
    pub end_scale: f32,
}

impl Default for FlyOutConfig {
    fn default() -> Self {
        Self {
            duration: 0.8,
            end_scale: 1.8,
        }
    }
}

/// Seating ring geometry for the default layout provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub screen_width: f32,
    pub screen_height: f32,
    pub ring_radius: f32,
    /// Radians per second of ring rotation
    pub ring_speed: f32,
    pub max_seats: usize,
    pub star_orbit_radius: f32,
    pub supporting_distance: f32,
    /// Distance of the idle strip from the bottom edge
    pub idle_margin: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            screen_width: 1280.0,
            screen_height: 720.0,
            ring_radius: 220.0,
            ring_speed: 0.05,
            max_seats: 8,
            star_orbit_radius: 36.0,
            supporting_distance: 64.0,
            idle_margin: 48.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Seconds a pie menu takes to open
    pub menu_open_duration: f64,
    /// Distance to the center at which a pending blend counts as arrived
    pub arrival_threshold: f32,
    /// Blend degree at or below which a separating part counts as unblended
    pub unblend_epsilon: f32,
    /// Click radius around an entity
    pub hit_radius: f32,
    /// Seconds per tick
    pub fixed_dt: f64,
    pub smoothing: SmoothingConfig,
    pub spiral: SpiralConfig,
    pub fly_out: FlyOutConfig,
    pub layout: LayoutConfig,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            menu_open_duration: 0.25,
            arrival_threshold: 4.0,
            unblend_epsilon: 0.01,
            hit_radius: 28.0,
            fixed_dt: 1.0 / 60.0,
            smoothing: SmoothingConfig::default(),
            spiral: SpiralConfig::default(),
            fly_out: FlyOutConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

/// Everything a session runs with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub tuning: Tuning,
    pub view: ViewConfig,
}

impl SessionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reads the settings embedded in a recording.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
