//! Per-source recurrent decoder state.
//!
//! Two `[2, 1, 640]` f32 tensors (LSTM hidden and cell) plus the last emitted
//! token, which seeds the next decoder step. Fresh state is zeroed with the
//! blank/SOS token; the manager overwrites it with the deterministic
//! post-SOS state during pre-warm.

use ndarray::Array3;

use crate::constants::{BLANK_ID, DECODER_HIDDEN, DECODER_LAYERS};
use crate::models::DecoderStepOutput;

#[derive(Debug, Clone)]
pub struct DecoderState {
    pub hidden: Array3<f32>,
    pub cell: Array3<f32>,
    /// Decoder input for the next step: the last emitted token, or blank/SOS
    /// when nothing has been emitted yet.
    pub last_token: u32,
}

impl DecoderState {
    pub fn new() -> Self {
        let shape = (DECODER_LAYERS, 1, DECODER_HIDDEN);
        Self {
            hidden: Array3::zeros(shape),
            cell: Array3::zeros(shape),
            last_token: BLANK_ID,
        }
    }

    /// Adopt the hidden/cell outputs of a decoder step.
    pub fn update(&mut self, step: &DecoderStepOutput) {
        debug_assert_eq!(step.hidden.shape(), self.hidden.shape());
        debug_assert_eq!(step.cell.shape(), self.cell.shape());
        self.hidden.assign(&step.hidden);
        self.cell.assign(&step.cell);
    }

    /// Copy of the current state, used to isolate a call from its source slot
    /// until the call succeeds.
    pub fn snapshot(&self) -> DecoderState {
        self.clone()
    }

    pub fn restore(&mut self, snapshot: DecoderState) {
        *self = snapshot;
    }
}

impl Default for DecoderState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    fn step(fill: f32) -> DecoderStepOutput {
        DecoderStepOutput {
            output: Array3::zeros((1, 1, DECODER_HIDDEN)),
            hidden: Array3::from_elem((DECODER_LAYERS, 1, DECODER_HIDDEN), fill),
            cell: Array3::from_elem((DECODER_LAYERS, 1, DECODER_HIDDEN), -fill),
        }
    }

    #[test]
    fn fresh_state_is_zeroed_blank() {
        let state = DecoderState::new();
        assert_eq!(state.hidden.shape(), &[2, 1, 640]);
        assert_eq!(state.cell.shape(), &[2, 1, 640]);
        assert!(state.hidden.iter().all(|&v| v == 0.0));
        assert!(state.cell.iter().all(|&v| v == 0.0));
        assert_eq!(state.last_token, BLANK_ID);
    }

    #[test]
    fn update_copies_step_outputs() {
        let mut state = DecoderState::new();
        state.update(&step(0.5));
        assert!(state.hidden.iter().all(|&v| v == 0.5));
        assert!(state.cell.iter().all(|&v| v == -0.5));
    }

    #[test]
    fn snapshot_restore_isolates_mutation() {
        let mut state = DecoderState::new();
        state.update(&step(1.0));
        state.last_token = 42;

        let snapshot = state.snapshot();
        state.update(&step(2.0));
        state.last_token = 7;

        state.restore(snapshot);
        assert!(state.hidden.iter().all(|&v| v == 1.0));
        assert_eq!(state.last_token, 42);
    }
}
