//! Accumulating wall-clock timer used to report computation and communication
//! time separately. Not part of any correctness path.

use std::time::Instant;

#[derive(Clone, Debug, Default)]
pub struct Timer {
    started: Option<Instant>,
    total: f64,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) a measurement interval.
    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Close the running interval, if any, and return the accumulated total.
    pub fn stop(&mut self) -> f64 {
        if let Some(t0) = self.started.take() {
            self.total += t0.elapsed().as_secs_f64();
        }
        self.total
    }

    /// Forget the accumulated total. A running interval keeps running.
    pub fn reset(&mut self) {
        self.total = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.started.is_some()
    }

    /// Accumulated seconds over all closed intervals.
    pub fn total_elapsed(&self) -> f64 {
        self.total
    }

    /// Time `f` and add it to the total.
    pub fn time<R>(&mut self, f: impl FnOnce() -> R) -> R {
        self.start();
        let out = f();
        self.stop();
        out
    }
}
