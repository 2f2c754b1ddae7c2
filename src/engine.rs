//! The per-period mix/record engine and its control-side handle.
//!
//! [`engine_pair`] splits one [`LoopBank`] into two halves sharing a single lock:
//!
//! - [`MixEngine`] lives on the audio thread. Every call to
//!   [`process`](MixEngine::process) holds the lock for the whole period.
//! - [`Controller`] lives on the control thread. It takes the lock only for the
//!   duration of one state change or one snapshot copy.
//!
//! ```
//! use eddy::{engine_pair, EngineConfig, LoopState};
//!
//! let config = EngineConfig::default().with_loop_count(2).with_loopback(false);
//! let (mut engine, controller) = engine_pair(&config).unwrap();
//!
//! controller.set_state(0, LoopState::Recording);
//! let input = [0.5; 64];
//! let output = engine.process(&input);
//! assert!(output.iter().all(|&s| s == 0.0));
//! ```
//!
//! Because the audio thread holds the lock across the whole period, a change
//! made by the controller is either fully visible to a period or not at all,
//! and is always visible to the next one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::EngineConfig;
use crate::error::LooperResult;
use crate::loop_bank::{LoopBank, LoopState, Snapshot};

type SharedBank = Arc<Mutex<LoopBank>>;

// Neither side leaves the bank half-updated on panic, so a poisoned lock is still usable.
fn lock(bank: &SharedBank) -> MutexGuard<'_, LoopBank> {
    bank.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Create a bank from `config` and return its audio-side and control-side handles.
///
/// Fails with [`LooperError::Configuration`](crate::LooperError::Configuration)
/// if the configuration is invalid. All memory the engine will ever use is
/// allocated here.
pub fn engine_pair(config: &EngineConfig) -> LooperResult<(MixEngine, Controller)> {
    let bank = Arc::new(Mutex::new(LoopBank::from_config(config)?));

    tracing::info!(
        loops = config.loop_count,
        capacity = config.loop_capacity,
        period = config.period_size,
        sample_rate = config.sample_rate,
        loopback = config.loopback,
        "looping engine created"
    );

    let engine = MixEngine {
        bank: bank.clone(),
        master_gain: config.master_gain,
        loopback: config.loopback,
        input: vec![0.0; config.period_size].into_boxed_slice(),
        output: vec![0.0; config.period_size].into_boxed_slice(),
    };
    let controller = Controller {
        bank,
        loop_count: config.loop_count,
        loop_capacity: config.loop_capacity,
    };

    Ok((engine, controller))
}

/// Audio-thread half of the engine.
///
/// Runs one period at a time; it has no thread of its own. Whatever drives the
/// audio device calls [`process`](Self::process) once per period.
pub struct MixEngine {
    bank: SharedBank,
    master_gain: f32,
    loopback: bool,
    /// Period-sized copy of the captured input, zero-padded
    input: Box<[f32]>,
    /// Period-sized mix accumulator
    output: Box<[f32]>,
}

impl MixEngine {
    /// Samples per period.
    #[inline]
    pub fn period_size(&self) -> usize {
        self.output.len()
    }

    #[inline]
    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    #[inline]
    pub fn loopback(&self) -> bool {
        self.loopback
    }

    /// Process one period and return the mixed output.
    ///
    /// `input` holds the freshly captured samples. Anything past one period is
    /// ignored and a short input is padded with silence, so this never waits
    /// for more data. The returned slice is always exactly one period long.
    ///
    /// Does not allocate and cannot fail. Output is not clipped: summed
    /// amplitudes above 1.0 are passed through as-is.
    pub fn process(&mut self, input: &[f32]) -> &[f32] {
        let available = input.len().min(self.input.len());
        self.input[..available].copy_from_slice(&input[..available]);
        self.input[available..].fill(0.0);

        if self.loopback {
            self.output.copy_from_slice(&self.input);
        } else {
            self.output.fill(0.0);
        }

        let mut bank = lock(&self.bank);
        for l in bank.loops_mut() {
            match l.state() {
                LoopState::Playing => l.play_into(&mut self.output, self.master_gain),
                LoopState::Recording => l.record_from(&self.input),
            }
        }
        drop(bank);

        &self.output
    }

    /// Process one period, writing the mix into `output`.
    ///
    /// Copies `min(output.len(), period_size)` samples; any excess in `output` is zeroed.
    pub fn process_into(&mut self, input: &[f32], output: &mut [f32]) {
        let mixed = self.process(input);
        let n = output.len().min(mixed.len());
        output[..n].copy_from_slice(&mixed[..n]);
        output[n..].fill(0.0);
    }
}

/// Control-thread half of the engine.
///
/// Cheap to clone; every clone addresses the same bank. Each call takes the
/// engine lock briefly and never holds it across anything that can block.
#[derive(Clone)]
pub struct Controller {
    bank: SharedBank,
    loop_count: usize,
    loop_capacity: usize,
}

impl Controller {
    /// Number of loops in the bank.
    #[inline]
    pub fn loop_count(&self) -> usize {
        self.loop_count
    }

    /// Request `state` for loop `index`, effective from the next period.
    ///
    /// Out-of-range indices are ignored; they typically come straight from
    /// input-device codes. Returns `true` if the loop's state changed.
    pub fn set_state(&self, index: usize, state: LoopState) -> bool {
        if index >= self.loop_count {
            tracing::trace!(index, "ignoring state request for unknown loop");
            return false;
        }

        let changed = lock(&self.bank).set_state(index, state);
        if changed {
            tracing::debug!(index, ?state, "loop state changed");
        }
        changed
    }

    /// Set loop `index`'s gain, clamped to `[0, 1]`. Out-of-range indices are ignored.
    pub fn set_gain(&self, index: usize, gain: f32) -> bool {
        if index >= self.loop_count {
            tracing::trace!(index, "ignoring gain request for unknown loop");
            return false;
        }
        lock(&self.bank).set_gain(index, gain)
    }

    /// Current state of loop `index`.
    pub fn state(&self, index: usize) -> Option<LoopState> {
        lock(&self.bank).get(index).map(|l| l.state())
    }

    /// Current gain of loop `index`.
    pub fn gain(&self, index: usize) -> Option<f32> {
        lock(&self.bank).get(index).map(|l| l.gain())
    }

    /// Consistent copy of loop `index`'s sample, cursor and state.
    pub fn snapshot(&self, index: usize) -> Option<Snapshot> {
        lock(&self.bank).snapshot(index)
    }

    /// Snapshot every loop under a single lock acquisition.
    ///
    /// `out` is cleared and refilled; reuse it across frames to avoid reallocating.
    pub fn snapshot_all(&self, out: &mut Vec<Snapshot>) {
        out.clear();
        // Grow outside the lock so the audio thread never waits on the allocator
        out.reserve(self.loop_count);
        let bank = lock(&self.bank);
        out.extend(bank.iter().map(Snapshot::from));
    }

    /// Copy loop `index`'s whole buffer into `out`, replacing its contents.
    ///
    /// Takes the lock for the length of one buffer copy. Returns `false` for
    /// an out-of-range index, leaving `out` untouched.
    pub fn copy_samples(&self, index: usize, out: &mut Vec<f32>) -> bool {
        if index >= self.loop_count {
            return false;
        }
        out.clear();
        out.reserve(self.loop_capacity);

        let bank = lock(&self.bank);
        match bank.get(index) {
            Some(l) => {
                out.extend_from_slice(l.samples());
                true
            }
            None => false,
        }
    }
}
