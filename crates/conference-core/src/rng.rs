//! Tracked Random Streams
//!
//! Two independent seeded generators. The model stream decides outcomes and
//! its call count is verified on replay; the cosmetic stream picks text and
//! may diverge without consequence.
//!
//! Every draw consumes exactly one `u64` from the underlying generator, so a
//! recorded call count is enough to fast-forward a fresh stream to the same
//! position.

use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::VecDeque;

use session_events::RngCounts;

pub mod rng_constants {
    /// Mixed into the session seed to derive the cosmetic seed.
    pub const COSMETIC_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;
    /// Number of recent draw purposes kept for diagnostics.
    pub const RECENT_PURPOSES: usize = 32;
}

/// A seeded generator that counts its draws and remembers why it was asked.
#[derive(Debug, Clone)]
pub struct TrackedRng {
    stream: &'static str,
    rng: SmallRng,
    seed: Option<u64>,
    calls: u64,
    recent: VecDeque<&'static str>,
}

impl TrackedRng {
    pub fn seeded(stream: &'static str, seed: u64) -> Self {
        Self {
            stream,
            rng: SmallRng::seed_from_u64(seed),
            seed: Some(seed),
            calls: 0,
            recent: VecDeque::with_capacity(rng_constants::RECENT_PURPOSES),
        }
    }

    /// A generator seeded from OS entropy. Not reproducible.
    pub fn unseeded(stream: &'static str) -> Self {
        Self {
            stream,
            rng: SmallRng::from_entropy(),
            seed: None,
            calls: 0,
            recent: VecDeque::with_capacity(rng_constants::RECENT_PURPOSES),
        }
    }

    /// Restarts the stream from `seed` with a zero call count.
    pub fn reseed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
        self.seed = Some(seed);
        self.calls = 0;
        self.recent.clear();
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Uniform draw in [0, 1).
    pub fn random(&mut self, purpose: &'static str) -> f64 {
        self.calls += 1;
        if self.recent.len() == rng_constants::RECENT_PURPOSES {
            self.recent.pop_front();
        }
        self.recent.push_back(purpose);
        tracing::trace!(stream = self.stream, purpose, calls = self.calls, "rng draw");
        self.rng.gen::<f64>()
    }

    /// True with probability `probability`. Always draws.
    pub fn chance(&mut self, probability: f64, purpose: &'static str) -> bool {
        self.random(purpose) < probability
    }

    /// Uniform index below `len`. Does not draw when `len` is zero.
    pub fn index(&mut self, len: usize, purpose: &'static str) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let scaled = (self.random(purpose) * len as f64) as usize;
        Some(scaled.min(len - 1))
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T], purpose: &'static str) -> Option<&'a T> {
        self.index(items.len(), purpose).map(|i| &items[i])
    }

    /// Discards `count` draws without recording purposes.
    pub fn skip(&mut self, count: u64) {
        for _ in 0..count {
            self.rng.next_u64();
        }
        self.calls += count;
    }

    /// Most recent draw purposes, oldest first.
    pub fn recent_purposes(&self) -> Vec<&'static str> {
        self.recent.iter().copied().collect()
    }
}

/// The model and cosmetic streams of one session.
#[derive(Debug, Clone)]
pub struct DualRng {
    pub model: TrackedRng,
    pub cosmetic: TrackedRng,
}

impl DualRng {
    pub fn seeded(seed: u64) -> Self {
        Self {
            model: TrackedRng::seeded("model", seed),
            cosmetic: TrackedRng::seeded("cosmetic", cosmetic_seed(seed)),
        }
    }

    pub fn unseeded() -> Self {
        Self {
            model: TrackedRng::unseeded("model"),
            cosmetic: TrackedRng::unseeded("cosmetic"),
        }
    }

    /// The session seed, if the streams are reproducible.
    pub fn seed(&self) -> Option<u64> {
        self.model.seed()
    }

    pub fn reseed(&mut self, seed: u64) {
        self.model.reseed(seed);
        self.cosmetic.reseed(cosmetic_seed(seed));
    }

    /// Returns the session seed, generating and applying a fresh one if the
    /// streams were seeded from entropy.
    pub fn ensure_seeded(&mut self) -> u64 {
        match self.seed() {
            Some(seed) => seed,
            None => {
                let seed: u64 = rand::random();
                tracing::info!(seed, "seeding session RNG");
                self.reseed(seed);
                seed
            }
        }
    }

    pub fn counts(&self) -> RngCounts {
        RngCounts {
            model: self.model.calls(),
            cosmetic: self.cosmetic.calls(),
        }
    }

    /// Advances both streams to the given call counts.
    pub fn fast_forward(&mut self, counts: RngCounts) {
        let current = self.counts();
        self.model.skip(counts.model.saturating_sub(current.model));
        self.cosmetic.skip(counts.cosmetic.saturating_sub(current.cosmetic));
    }
}

fn cosmetic_seed(seed: u64) -> u64 {
    seed ^ rng_constants::COSMETIC_SEED_SALT
}
