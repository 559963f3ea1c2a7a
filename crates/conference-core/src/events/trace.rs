//! Trace Log
//!
//! Append-only JSONL record of transactions, plus a bounded ring of the most
//! recent lines for diagnostic bundles.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Lines kept in memory for diagnostics
pub const RECENT_TRACE_LINES: usize = 64;

/// One traced transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub tick: u64,
    pub elapsed: f64,
    /// "user:<request>" or "system:<label>"
    pub origin: String,
    pub summary: String,
}

impl TraceEntry {
    pub fn line(&self) -> String {
        format!(
            "[t={:.3} #{}] {}: {}",
            self.elapsed, self.tick, self.origin, self.summary
        )
    }
}

pub struct TraceLog {
    writer: Option<BufWriter<File>>,
    recent: VecDeque<String>,
    entry_count: u64,
}

impl TraceLog {
    /// Create a trace log writing JSONL to the specified path
    pub fn new(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            recent: VecDeque::with_capacity(RECENT_TRACE_LINES),
            entry_count: 0,
        })
    }

    /// Create a trace log that only keeps the in-memory ring
    pub fn null() -> Self {
        Self {
            writer: None,
            recent: VecDeque::with_capacity(RECENT_TRACE_LINES),
            entry_count: 0,
        }
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn log(&mut self, entry: &TraceEntry) -> std::io::Result<()> {
        self.entry_count += 1;
        if self.recent.len() == RECENT_TRACE_LINES {
            self.recent.pop_front();
        }
        self.recent.push_back(entry.line());
        if let Some(ref mut writer) = self.writer {
            let json = serde_json::to_string(entry)?;
            writeln!(writer, "{}", json)?;
        }
        Ok(())
    }

    /// Most recent lines, oldest first.
    pub fn recent(&self) -> Vec<String> {
        self.recent.iter().cloned().collect()
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::null()
    }
}

impl std::fmt::Debug for TraceLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceLog")
            .field("file_backed", &self.writer.is_some())
            .field("entry_count", &self.entry_count)
            .finish()
    }
}

impl Drop for TraceLog {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("failed to flush trace log: {}", e);
        }
    }
}
