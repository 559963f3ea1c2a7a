//! Configuration System
//!
//! Loads tuning parameters from tuning.toml so thresholds and cooldowns can be
//! adjusted without recompiling. Every section is optional; missing keys fall
//! back to the defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use session_events::BiographyField;

/// Default tuning file path
pub const DEFAULT_TUNING_PATH: &str = "tuning.toml";

/// Top-level model tuning
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub attention: AttentionConfig,
    pub messages: MessageConfig,
    pub cooldowns: CooldownConfig,
    pub trust: TrustConfig,
    pub victory: VictoryConfig,
}

/// Attention-demand evaluation and need drift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttentionConfig {
    /// Need above which a part is a candidate for demanding attention
    pub base_threshold: f64,
    /// Need above which a candidate may demand urgently
    pub urgent_threshold: f64,
    /// Probability an above-urgent candidate actually interrupts
    pub urgent_chance: f64,
    /// Seconds between attention checks
    pub check_interval: f64,
    /// Need gained per second by burdened parts outside the conference
    pub idle_growth_per_sec: f64,
    /// Need lost per second by seated parts
    pub seated_relief_per_sec: f64,
}

impl Default for AttentionConfig {
    fn default() -> Self {
        Self {
            base_threshold: 2.0,
            urgent_threshold: 4.0,
            urgent_chance: 0.5,
            check_interval: 1.0,
            idle_growth_per_sec: 0.05,
            seated_relief_per_sec: 0.1,
        }
    }
}

/// Grievance messages between seated parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    /// Seconds a message spends in flight
    pub travel_time: f64,
    /// Trust the receiver loses on arrival
    pub trust_penalty: f64,
    /// Need the receiver gains on arrival
    pub need_gain: f64,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            travel_time: 2.0,
            trust_penalty: 0.05,
            need_gain: 0.5,
        }
    }
}

/// Orchestrator cooldowns, in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownConfig {
    pub blend: f64,
    pub dialogue: f64,
    pub bubble_lifetime: f64,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            blend: 8.0,
            dialogue: 6.0,
            bubble_lifetime: 4.0,
        }
    }
}

/// Trust gains and the trust each biography field needs before it is shared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    pub feel_toward_gain: f64,
    /// Success chance of feel_toward at zero trust; rises linearly to 1.0
    pub feel_toward_base_chance: f64,
    /// Need gained when feel_toward is refused
    pub wary_need_gain: f64,
    /// Need gained by each blended part when it blocks feel_toward
    pub blended_block_need_gain: f64,
    /// Trust required to unburden
    pub unburden_trust: f64,
    pub field_thresholds: FieldThresholds,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            feel_toward_gain: 0.1,
            feel_toward_base_chance: 0.6,
            wary_need_gain: 0.2,
            blended_block_need_gain: 0.3,
            unburden_trust: 0.9,
            field_thresholds: FieldThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldThresholds {
    pub age: f64,
    pub identity: f64,
    pub job: f64,
    pub job_appraisal: f64,
    pub job_impact: f64,
}

impl FieldThresholds {
    pub fn for_field(&self, field: BiographyField) -> f64 {
        match field {
            BiographyField::Age => self.age,
            BiographyField::Identity => self.identity,
            BiographyField::Job => self.job,
            BiographyField::JobAppraisal => self.job_appraisal,
            BiographyField::JobImpact => self.job_impact,
        }
    }
}

impl Default for FieldThresholds {
    fn default() -> Self {
        Self {
            age: 0.0,
            identity: 0.2,
            job: 0.4,
            job_appraisal: 0.55,
            job_impact: 0.65,
        }
    }
}

/// Victory: every part above `min_trust` and below `max_need`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VictoryConfig {
    pub min_trust: f64,
    pub max_need: f64,
}

impl Default for VictoryConfig {
    fn default() -> Self {
        Self {
            min_trust: 0.9,
            max_need: 1.0,
        }
    }
}

impl Tuning {
    /// Load tuning from a TOML file
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

    /// Load tuning from the default path, or use defaults if not found
    pub fn load_or_default() -> Self {
        Self::load(DEFAULT_TUNING_PATH).unwrap_or_else(|e| {
            tracing::warn!("could not load {}: {}; using defaults", DEFAULT_TUNING_PATH, e);
            Self::default()
        })
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Configuration error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid tuning: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize tuning: {0}")]
    Serialize(#[from] toml::ser::Error),
}
