//! Transaction trace: one entry per state-changing transaction.

pub mod trace;

pub use trace::{TraceEntry, TraceLog};
