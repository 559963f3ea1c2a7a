//! Diagnostic bundle written when a replay diverges.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use session_events::{RecordedSession, RngCounts, VerificationSnapshot};

use super::verify::SyncMismatch;

/// Last draw purposes of each stream, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentDraws {
    pub model: Vec<String>,
    pub cosmetic: Vec<String>,
}

/// Everything needed to investigate a divergence offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticBundle {
    pub session: RecordedSession,
    pub mismatch: SyncMismatch,
    /// State reached on replay when the mismatch was found
    pub actual: VerificationSnapshot,
    pub actual_rng: RngCounts,
    pub recent_trace: Vec<String>,
    pub recent_draws: RecentDraws,
}

impl DiagnosticBundle {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        fs::write(path, json)
    }
}
