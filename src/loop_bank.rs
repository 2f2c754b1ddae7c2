//! Loop storage: fixed-capacity circular buffers and their state.
//!
//! A [`LoopBank`] is created once with a fixed number of [`Loop`]s. Loops are
//! never added or removed afterwards; only their [`LoopState`] and gain change.
//! The bank itself has no synchronization, see [`engine`](crate::engine) for
//! how the audio and control threads share it.

use crate::config::EngineConfig;
use crate::error::{LooperError, LooperResult};

/// What a loop does with each period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LoopState {
    /// Contribute the buffer contents to the mix
    #[default]
    Playing,
    /// Overwrite the buffer with captured input
    Recording,
}

/// One independently recordable/playable track.
///
/// The cursor advances by exactly one position per processed sample whatever
/// the state, so a loop leaving `Recording` resumes playback right after the
/// last sample it wrote.
#[derive(Clone, Debug)]
pub struct Loop {
    buffer: Box<[f32]>,
    cursor: usize,
    gain: f32,
    state: LoopState,
}

impl Loop {
    fn new(capacity: usize, gain: f32) -> Self {
        Self {
            buffer: vec![0.0; capacity].into_boxed_slice(),
            cursor: 0,
            gain,
            state: LoopState::Playing,
        }
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Position of the next sample to be read or overwritten.
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Buffer length in samples.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The whole circular buffer, starting at index 0 (not at the cursor).
    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.buffer
    }

    /// Sample under the cursor.
    #[inline]
    pub fn current_sample(&self) -> f32 {
        self.buffer[self.cursor]
    }

    /// Add `buffer[cursor] * gain * master_gain` into each slot of `out`,
    /// advancing the cursor once per slot.
    pub(crate) fn play_into(&mut self, out: &mut [f32], master_gain: f32) {
        let scale = self.gain * master_gain;
        let capacity = self.buffer.len();
        let mut written = 0;

        // Walk contiguous runs up to the wrap point instead of taking a modulo per sample
        while written < out.len() {
            let run = (out.len() - written).min(capacity - self.cursor);
            let src = &self.buffer[self.cursor..self.cursor + run];
            for (dst, &sample) in out[written..written + run].iter_mut().zip(src) {
                *dst += sample * scale;
            }
            written += run;
            self.cursor = (self.cursor + run) % capacity;
        }
    }

    /// Copy `input` into the buffer at the cursor, advancing once per sample.
    pub(crate) fn record_from(&mut self, input: &[f32]) {
        let capacity = self.buffer.len();
        let mut read = 0;

        while read < input.len() {
            let run = (input.len() - read).min(capacity - self.cursor);
            self.buffer[self.cursor..self.cursor + run].copy_from_slice(&input[read..read + run]);
            read += run;
            self.cursor = (self.cursor + run) % capacity;
        }
    }
}

/// A consistent copy of one loop's display-relevant fields.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    /// Sample under the cursor
    pub sample: f32,
    /// Cursor position in `[0, capacity)`
    pub cursor: usize,
    /// Loop length in samples
    pub capacity: usize,
    pub state: LoopState,
}

impl Snapshot {
    /// Cursor position as a fraction of the loop, in `[0, 1)`.
    ///
    /// Handy for mapping the play position onto a display axis.
    #[inline]
    pub fn phase(&self) -> f32 {
        self.cursor as f32 / self.capacity as f32
    }
}

impl From<&Loop> for Snapshot {
    fn from(l: &Loop) -> Self {
        Self {
            sample: l.current_sample(),
            cursor: l.cursor,
            capacity: l.capacity(),
            state: l.state,
        }
    }
}

/// Fixed arena of loops addressed by small integer indices.
#[derive(Clone, Debug)]
pub struct LoopBank {
    loops: Vec<Loop>,
}

impl LoopBank {
    /// Allocate `count` silent loops of `capacity` samples, all `Playing` at `gain`.
    ///
    /// Fails with [`LooperError::Configuration`] if `count` or `capacity` is zero.
    pub fn new(count: usize, capacity: usize, gain: f32) -> LooperResult<Self> {
        if count == 0 {
            return Err(LooperError::Configuration("loop count must be positive".into()));
        }
        if capacity == 0 {
            return Err(LooperError::Configuration("loop capacity must be positive".into()));
        }

        let gain = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
        let loops = (0..count).map(|_| Loop::new(capacity, gain)).collect();
        Ok(Self { loops })
    }

    /// Build a bank sized by `config`, after validating it.
    pub fn from_config(config: &EngineConfig) -> LooperResult<Self> {
        config.validate()?;
        Self::new(config.loop_count, config.loop_capacity, config.default_loop_gain)
    }

    /// Number of loops.
    #[inline]
    pub fn len(&self) -> usize {
        self.loops.len()
    }

    /// Always false for a constructed bank.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.loops.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Loop> {
        self.loops.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Loop> {
        self.loops.iter()
    }

    pub(crate) fn loops_mut(&mut self) -> &mut [Loop] {
        &mut self.loops
    }

    /// Request a state for loop `index`.
    ///
    /// Returns `true` if the state actually changed. Out-of-range indices and
    /// requests for the state the loop is already in do nothing.
    pub fn set_state(&mut self, index: usize, state: LoopState) -> bool {
        match self.loops.get_mut(index) {
            Some(l) if l.state != state => {
                l.state = state;
                true
            }
            _ => false,
        }
    }

    /// Set loop `index`'s gain, clamped to `[0, 1]`. Out-of-range indices do nothing.
    pub fn set_gain(&mut self, index: usize, gain: f32) -> bool {
        match self.loops.get_mut(index) {
            Some(l) => {
                l.gain = if gain.is_nan() { 0.0 } else { gain.clamp(0.0, 1.0) };
                true
            }
            None => false,
        }
    }

    #[inline]
    pub fn snapshot(&self, index: usize) -> Option<Snapshot> {
        self.loops.get(index).map(Snapshot::from)
    }
}
