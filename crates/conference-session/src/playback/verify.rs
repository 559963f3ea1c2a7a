//! Replay verification
//!
//! Compares the state reached on replay with the verification snapshot
//! recorded after the same action. Membership and biography flags must
//! match exactly; trust, need and timers within a small tolerance. Only the
//! model stream's call count is compared; cosmetic draws are free to differ.

use serde::{Deserialize, Serialize};
use std::fmt;

use session_events::{
    ActionRequest, BiographyFlags, OrchestratorTimers, PartId, RngCounts, VerificationSnapshot,
};

pub mod verify_constants {
    pub const TRUST_TOLERANCE: f64 = 0.001;
    pub const NEED_TOLERANCE: f64 = 0.001;
    pub const TIMER_TOLERANCE: f64 = 0.01;
}

/// One way the replayed state differs from the recorded one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Difference {
    ModelRngCalls { expected: u64, actual: u64 },
    Tick { expected: u64, actual: u64 },
    Targets { expected: Vec<PartId>, actual: Vec<PartId> },
    Blended { expected: Vec<PartId>, actual: Vec<PartId> },
    Pending { expected: Vec<PartId>, actual: Vec<PartId> },
    SelfRay { expected: Option<PartId>, actual: Option<PartId> },
    MissingPart { part: PartId },
    UnexpectedPart { part: PartId },
    Trust { part: PartId, expected: f64, actual: f64 },
    NeedAttention { part: PartId, expected: f64, actual: f64 },
    Biography { part: PartId, fields: Vec<String> },
    Timer { timer: String, expected: f64, actual: f64 },
}

fn ids(list: &[PartId]) -> String {
    let names: Vec<&str> = list.iter().map(PartId::as_str).collect();
    format!("[{}]", names.join(", "))
}

fn ray(ray: &Option<PartId>) -> &str {
    ray.as_ref().map_or("none", PartId::as_str)
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::ModelRngCalls { expected, actual } => {
                write!(f, "model RNG calls: expected {}, got {}", expected, actual)
            }
            Difference::Tick { expected, actual } => {
                write!(f, "tick: expected {}, got {}", expected, actual)
            }
            Difference::Targets { expected, actual } => {
                write!(f, "targets: expected {}, got {}", ids(expected), ids(actual))
            }
            Difference::Blended { expected, actual } => {
                write!(f, "blended: expected {}, got {}", ids(expected), ids(actual))
            }
            Difference::Pending { expected, actual } => {
                write!(f, "pending: expected {}, got {}", ids(expected), ids(actual))
            }
            Difference::SelfRay { expected, actual } => {
                write!(f, "self-ray: expected {}, got {}", ray(expected), ray(actual))
            }
            Difference::MissingPart { part } => write!(f, "part {} missing", part),
            Difference::UnexpectedPart { part } => write!(f, "unexpected part {}", part),
            Difference::Trust {
                part,
                expected,
                actual,
            } => write!(
                f,
                "trust of {}: expected {:.4}, got {:.4}",
                part, expected, actual
            ),
            Difference::NeedAttention {
                part,
                expected,
                actual,
            } => write!(
                f,
                "need of {}: expected {:.4}, got {:.4}",
                part, expected, actual
            ),
            Difference::Biography { part, fields } => {
                write!(f, "biography of {} differs in {}", part, fields.join(", "))
            }
            Difference::Timer {
                timer,
                expected,
                actual,
            } => write!(
                f,
                "{} timer: expected {:.3}, got {:.3}",
                timer, expected, actual
            ),
        }
    }
}

/// The replay diverged from the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMismatch {
    /// Index of the recorded action; `None` for the final state
    pub index: Option<usize>,
    pub request: Option<ActionRequest>,
    pub tick: u64,
    pub differences: Vec<Difference>,
}

impl fmt::Display for SyncMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.index, &self.request) {
            (Some(index), Some(request)) => write!(f, "after action {} ({})", index, request)?,
            (Some(index), None) => write!(f, "after action {}", index)?,
            (None, _) => write!(f, "at the end of the session")?,
        }
        write!(f, ", tick {}: ", self.tick)?;
        for (i, difference) in self.differences.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", difference)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyncMismatch {}

/// Lists every difference between the recorded and the replayed state.
pub fn compare(
    expected: &VerificationSnapshot,
    expected_rng: RngCounts,
    actual: &VerificationSnapshot,
    actual_rng: RngCounts,
) -> Vec<Difference> {
    let mut out = Vec::new();

    if expected_rng.model != actual_rng.model {
        out.push(Difference::ModelRngCalls {
            expected: expected_rng.model,
            actual: actual_rng.model,
        });
    }
    if expected.tick != actual.tick {
        out.push(Difference::Tick {
            expected: expected.tick,
            actual: actual.tick,
        });
    }
    if expected.targets != actual.targets {
        out.push(Difference::Targets {
            expected: expected.targets.clone(),
            actual: actual.targets.clone(),
        });
    }
    if expected.blended != actual.blended {
        out.push(Difference::Blended {
            expected: expected.blended.clone(),
            actual: actual.blended.clone(),
        });
    }
    if expected.pending != actual.pending {
        out.push(Difference::Pending {
            expected: expected.pending.clone(),
            actual: actual.pending.clone(),
        });
    }
    if expected.self_ray != actual.self_ray {
        out.push(Difference::SelfRay {
            expected: expected.self_ray.clone(),
            actual: actual.self_ray.clone(),
        });
    }

    for (id, want) in &expected.parts {
        let Some(got) = actual.parts.get(id) else {
            out.push(Difference::MissingPart { part: id.clone() });
            continue;
        };
        if (want.trust - got.trust).abs() > verify_constants::TRUST_TOLERANCE {
            out.push(Difference::Trust {
                part: id.clone(),
                expected: want.trust,
                actual: got.trust,
            });
        }
        if (want.need_attention - got.need_attention).abs() > verify_constants::NEED_TOLERANCE {
            out.push(Difference::NeedAttention {
                part: id.clone(),
                expected: want.need_attention,
                actual: got.need_attention,
            });
        }
        biography(id, &want.biography, &got.biography, &mut out);
    }
    for id in actual.parts.keys() {
        if !expected.parts.contains_key(id) {
            out.push(Difference::UnexpectedPart { part: id.clone() });
        }
    }

    timers(&expected.timers, &actual.timers, &mut out);
    out
}

fn biography(id: &PartId, want: &BiographyFlags, got: &BiographyFlags, out: &mut Vec<Difference>) {
    let fields = want.differences(got);
    if !fields.is_empty() {
        out.push(Difference::Biography {
            part: id.clone(),
            fields: fields.into_iter().map(String::from).collect(),
        });
    }
}

fn timers(want: &OrchestratorTimers, got: &OrchestratorTimers, out: &mut Vec<Difference>) {
    let pairs = [
        ("blend cooldown", want.blend_cooldown, got.blend_cooldown),
        ("dialogue cooldown", want.dialogue_cooldown, got.dialogue_cooldown),
        ("attention check", want.attention_check, got.attention_check),
    ];
    for (timer, expected, actual) in pairs {
        if (expected - actual).abs() > verify_constants::TIMER_TOLERANCE {
            out.push(Difference::Timer {
                timer: timer.to_string(),
                expected,
                actual,
            });
        }
    }
}

/// Fails with a [`SyncMismatch`] if the states differ.
pub fn check(
    index: Option<usize>,
    request: Option<&ActionRequest>,
    expected: &VerificationSnapshot,
    expected_rng: RngCounts,
    actual: &VerificationSnapshot,
    actual_rng: RngCounts,
) -> Result<(), SyncMismatch> {
    let differences = compare(expected, expected_rng, actual, actual_rng);
    if differences.is_empty() {
        Ok(())
    } else {
        Err(SyncMismatch {
            index,
            request: request.cloned(),
            tick: actual.tick,
            differences,
        })
    }
}
