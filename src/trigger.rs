//! Turning press/release events into loop state requests.
//!
//! A trigger is anything with a numeric identifier that goes down and up: a
//! keyboard scancode, a MIDI note, a footswitch. Holding a trigger records
//! into its loop, releasing it plays the loop back.

use crate::engine::Controller;
use crate::loop_bank::LoopState;

/// Whether a trigger went down or up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerKind {
    Press,
    Release,
}

/// One discrete event from an input device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerEvent {
    /// Raw identifier from the input device
    pub code: u32,
    pub kind: TriggerKind,
    /// Set for auto-repeat events generated while a key is held
    pub repeat: bool,
}

impl TriggerEvent {
    pub fn press(code: u32) -> Self {
        Self {
            code,
            kind: TriggerKind::Press,
            repeat: false,
        }
    }

    pub fn release(code: u32) -> Self {
        Self {
            code,
            kind: TriggerKind::Release,
            repeat: false,
        }
    }

    /// Mark this event as an auto-repeat duplicate.
    pub fn repeated(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// The state this event requests.
    #[inline]
    pub fn requested_state(&self) -> LoopState {
        match self.kind {
            TriggerKind::Press => LoopState::Recording,
            TriggerKind::Release => LoopState::Playing,
        }
    }
}

/// Maps trigger identifiers to loop indices.
///
/// The default map is the identity: code `n` drives loop `n`. Explicit
/// bindings replace the identity mapping entirely.
#[derive(Clone, Debug, Default)]
pub struct TriggerMap {
    /// `(code, loop index)` pairs; `None` means identity
    bindings: Option<Vec<(u32, usize)>>,
}

impl TriggerMap {
    /// Code `n` drives loop `n`.
    pub fn identity() -> Self {
        Self::default()
    }

    /// The code at position `i` drives loop `i`.
    pub fn from_codes(codes: &[u32]) -> Self {
        Self {
            bindings: Some(codes.iter().enumerate().map(|(i, &c)| (c, i)).collect()),
        }
    }

    /// Bind `code` to loop `index`, replacing any previous binding for `code`.
    pub fn bind(mut self, code: u32, index: usize) -> Self {
        let bindings = self.bindings.get_or_insert_with(Vec::new);
        bindings.retain(|&(c, _)| c != code);
        bindings.push((code, index));
        self
    }

    /// Loop index for `code`, if it maps to one.
    ///
    /// The index may still be out of range for a particular bank; the
    /// controller ignores those.
    pub fn resolve(&self, code: u32) -> Option<usize> {
        match &self.bindings {
            None => Some(code as usize),
            Some(bindings) => bindings.iter().find(|&&(c, _)| c == code).map(|&(_, i)| i),
        }
    }

    /// Apply `event` to `controller`.
    ///
    /// Auto-repeats and unmapped codes are dropped. Returns `true` if a loop's
    /// state changed.
    pub fn apply(&self, event: TriggerEvent, controller: &Controller) -> bool {
        if event.repeat {
            return false;
        }
        match self.resolve(event.code) {
            Some(index) => controller.set_state(index, event.requested_state()),
            None => false,
        }
    }
}
