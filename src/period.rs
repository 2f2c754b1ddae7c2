//! Fitting host callbacks onto fixed-size periods.
//!
//! Audio hosts do not always honour a requested buffer size, so a callback may
//! ask for 441 frames when the engine works in periods of 64. [`PeriodAdapter`]
//! keeps the engine strictly period-driven: it runs whole periods on demand
//! and hands the output out piecewise, carrying the unread tail of the last
//! period over to the next callback.

use crate::engine::MixEngine;

/// Drives a [`MixEngine`] from callbacks of arbitrary length.
pub struct PeriodAdapter {
    engine: MixEngine,
    /// Captured input for the period being run
    input: Box<[f32]>,
    /// Output of the most recent period
    pending: Box<[f32]>,
    /// Read position within `pending`; equal to its length when drained
    read_pos: usize,
    periods: u64,
}

impl PeriodAdapter {
    pub fn new(engine: MixEngine) -> Self {
        let period = engine.period_size();
        Self {
            engine,
            input: vec![0.0; period].into_boxed_slice(),
            pending: vec![0.0; period].into_boxed_slice(),
            read_pos: period,
            periods: 0,
        }
    }

    /// Number of whole periods run so far.
    #[inline]
    pub fn periods(&self) -> u64 {
        self.periods
    }

    /// Samples of already-mixed output waiting to be handed out.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.pending.len() - self.read_pos
    }

    pub fn engine(&self) -> &MixEngine {
        &self.engine
    }

    pub fn into_engine(self) -> MixEngine {
        self.engine
    }

    /// Fill `out` with mixed samples, running as many periods as needed.
    ///
    /// Before each period `pull` is given a period-sized buffer to fill with
    /// captured input and returns how many samples it wrote. Anything short of
    /// a full period is treated as silence.
    pub fn fill<F>(&mut self, out: &mut [f32], mut pull: F)
    where
        F: FnMut(&mut [f32]) -> usize,
    {
        let mut written = 0;
        while written < out.len() {
            if self.read_pos == self.pending.len() {
                let captured = pull(&mut self.input[..]).min(self.input.len());
                let mixed = self.engine.process(&self.input[..captured]);
                self.pending.copy_from_slice(mixed);
                self.read_pos = 0;
                self.periods += 1;
            }

            let run = (out.len() - written).min(self.pending.len() - self.read_pos);
            out[written..written + run]
                .copy_from_slice(&self.pending[self.read_pos..self.read_pos + run]);
            written += run;
            self.read_pos += run;
        }
    }
}
