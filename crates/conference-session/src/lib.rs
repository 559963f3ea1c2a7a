//! Parts Conference Session
//!
//! Runs a conference model together with its animated view: the session
//! controller and its fixed-timestep clock, the `bevy_ecs` view that resolves
//! symbolic positions against a live layout, pie-menu input, and playback of
//! recorded sessions with per-action verification.

pub mod config;
pub mod input;
pub mod layout;
pub mod playback;
pub mod scheduler;
pub mod session;
pub mod view;

pub use config::{SessionConfig, Smoothing, ViewConfig};
pub use input::{InputError, InputRouter, PieMenu, PieSlice};
pub use layout::{LayoutProvider, Point, SeatRing};
pub use playback::{
    DiagnosticBundle, PlaybackController, PlaybackError, PlaybackPhase, PlaybackReport,
    SyncMismatch,
};
pub use scheduler::Scheduler;
pub use session::{SessionController, TickOutcome};
pub use view::components::ViewEvent;
pub use view::{ConferenceView, MenuKind};
