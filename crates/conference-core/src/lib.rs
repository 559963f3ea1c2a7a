//! Parts Conference Core
//!
//! Headless model of a parts-conference session: the part store and its
//! relationship graph, the conference membership state, the action
//! controller, the per-tick orchestrator, and the transaction wrapper that
//! every mutation passes through.
//!
//! Randomness comes from two tracked streams. The model stream drives
//! decisions and is verified on replay; the cosmetic stream only picks
//! flavor text.

pub mod actions;
pub mod components;
pub mod config;
pub mod diff;
pub mod error;
pub mod events;
pub mod model;
pub mod recorder;
pub mod rng;
pub mod setup;
pub mod systems;
pub mod transaction;

pub use actions::{apply_action, ActionResult, UiFeedback};
pub use components::{Biography, DialogueBank, PartState, PartStore, Relationships};
pub use config::{ConfigError, Tuning};
pub use diff::StateDiff;
pub use error::ModelError;
pub use model::{
    AttentionDemand, BlendState, InvariantViolation, Message, PendingBlend, SimulatorModel,
    ThoughtBubble,
};
pub use recorder::{ActionRecorder, RecorderError, SessionLoadError};
pub use rng::{DualRng, TrackedRng};
pub use setup::{demo_scenario, Scenario, ScenarioError};
pub use systems::orchestrator::TickReport;
pub use transaction::{ActContext, ActOrigin, Simulator, Transacted};

pub use session_events::{
    ActionName, ActionRequest, BiographyField, BlendReason, ModelSnapshot, PartId, RngCounts,
    VerificationSnapshot,
};
