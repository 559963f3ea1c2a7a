//! Scenario Files
//!
//! A scenario names the cast, their relationships, who starts seated, and an
//! optional script of actions to perform at given ticks. Scenarios load from
//! TOML or JSON, chosen by file extension.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use session_events::{ActionRequest, PartId};

use crate::components::part::part_constants;
use crate::components::{Biography, DialogueBank, PartState, PartStore, Relationships};
use crate::error::ModelError;
use crate::model::{InvariantViolation, SimulatorModel};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartSpec {
    pub id: PartId,
    pub name: String,
    #[serde(default = "default_trust")]
    pub trust: f64,
    #[serde(default)]
    pub need_attention: f64,
    #[serde(default)]
    pub biography: Biography,
    #[serde(default)]
    pub dialogues: DialogueBank,
}

fn default_trust() -> f64 {
    part_constants::DEFAULT_TRUST
}

impl PartSpec {
    fn to_state(&self) -> PartState {
        PartState::new(self.id.clone(), self.name.clone())
            .with_trust(self.trust)
            .with_need_attention(self.need_attention)
            .with_biography(self.biography.clone())
            .with_dialogues(self.dialogues.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionSpec {
    pub protector: PartId,
    pub protected: PartId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrievanceSpec {
    pub source: PartId,
    pub target: PartId,
    #[serde(default)]
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySpec {
    pub source: PartId,
    pub proxy: PartId,
}

/// An action to perform once the model reaches `at_tick`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub at_tick: u64,
    #[serde(flatten)]
    pub request: ActionRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub self_amplification: Option<f64>,
    pub parts: Vec<PartSpec>,
    #[serde(default)]
    pub protections: Vec<ProtectionSpec>,
    #[serde(default)]
    pub grievances: Vec<GrievanceSpec>,
    #[serde(default)]
    pub proxies: Vec<ProxySpec>,
    /// Parts seated when the session starts
    #[serde(default)]
    pub seated: Vec<PartId>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

impl Scenario {
    /// Loads a `.toml` or `.json` scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Builds the initial model and checks it.
    pub fn build_model(&self) -> Result<SimulatorModel, ScenarioError> {
        let mut parts = PartStore::new();
        for spec in &self.parts {
            parts.register(spec.to_state())?;
        }

        let mut relationships = Relationships::new();
        for p in &self.protections {
            relationships.add_protection(p.protector.clone(), p.protected.clone());
        }
        for g in &self.grievances {
            relationships.add_grievance(g.source.clone(), g.target.clone(), g.lines.clone());
        }
        for p in &self.proxies {
            relationships.add_proxy(p.source.clone(), p.proxy.clone());
        }

        let mut model = SimulatorModel::new(parts, relationships);
        if let Some(amplification) = self.self_amplification {
            model.set_self_amplification(amplification);
        }
        for id in &self.seated {
            if model.part(id).is_none() {
                return Err(ModelError::UnknownPart(id.clone()).into());
            }
            model.add_target_cloud(id);
        }
        for step in &self.script {
            for id in std::iter::once(&step.request.subject).chain(step.request.target.iter()) {
                if model.part(id).is_none() {
                    return Err(ModelError::UnknownPart(id.clone()).into());
                }
            }
        }

        model.check_invariants()?;
        tracing::info!(
            scenario = %self.name,
            parts = model.parts().len(),
            script = self.script.len(),
            "scenario loaded"
        );
        Ok(model)
    }

    /// Script steps due at `tick`, in file order.
    pub fn steps_at(&self, tick: u64) -> impl Iterator<Item = &ScriptStep> {
        self.script.iter().filter(move |s| s.at_tick == tick)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid scenario TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid scenario JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
