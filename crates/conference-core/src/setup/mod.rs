//! Session Setup
//!
//! Scenario files and the built-in demo cast.

pub mod demo;
pub mod scenario;

pub use demo::demo_scenario;
pub use scenario::{
    GrievanceSpec, PartSpec, ProtectionSpec, ProxySpec, Scenario, ScenarioError, ScriptStep,
};
