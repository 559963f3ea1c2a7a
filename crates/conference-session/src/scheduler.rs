//! Fixed-timestep clock for a session.
//!
//! Model ticks and UI-only ticks both advance the UI clock; only model ticks
//! advance the tick counter. Pie menus and playback waits run on the UI
//! clock so they can progress while model time stands still.

#[derive(Debug, Clone, PartialEq)]
pub struct Scheduler {
    fixed_dt: f64,
    ticks: u64,
    ui_time: f64,
}

impl Scheduler {
    pub fn new(fixed_dt: f64) -> Self {
        Self {
            fixed_dt,
            ticks: 0,
            ui_time: 0.0,
        }
    }

    pub fn fixed_dt(&self) -> f64 {
        self.fixed_dt
    }

    /// Model ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn ui_time(&self) -> f64 {
        self.ui_time
    }

    /// Starts a model tick. Returns its dt.
    pub fn step(&mut self) -> f64 {
        self.ticks += 1;
        self.ui_time += self.fixed_dt;
        self.fixed_dt
    }

    /// Starts a UI-only tick. Returns its dt.
    pub fn ui_step(&mut self) -> f64 {
        self.ui_time += self.fixed_dt;
        self.fixed_dt
    }
}
