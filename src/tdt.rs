//! Greedy Token-and-Duration Transducer decoding.
//!
//! One inner step runs the joint network over the current encoder frame and
//! the decoder output for the last emitted token, splits the logit row into a
//! vocabulary block and a duration block, and either emits the argmax symbol
//! or stays silent for a blank. Either way the time pointer jumps forward by
//! the predicted duration, with a forced single step on zero so every
//! iteration makes progress. Recurrent state carries across calls so chunked
//! audio decodes as one continuous stream.

use ndarray::s;
use tracing::debug;

use crate::constants::{BLANK_ID, VOCAB_LOGITS};
use crate::decoder_state::DecoderState;
use crate::error::{Error, Result};
use crate::manager::CancelToken;
use crate::models::{AsrBackend, EncoderOutput};

/// Decode-time configuration, fixed at construction.
#[derive(Debug, Clone)]
pub struct TdtConfig {
    /// Allowed time jumps in encoder frames, indexed by duration class.
    pub durations: Vec<usize>,
    /// Record the softmax probability of the predicted duration alongside
    /// each token. Never multiplied into the token confidence.
    pub include_duration_confidence: bool,
    /// How many leading positions of a fresh chunk the overlap dedup may
    /// search for a boundary match.
    pub boundary_search_frames: usize,
    /// Emit a per-step trace of the decode loop.
    pub enable_debug: bool,
}

impl Default for TdtConfig {
    fn default() -> Self {
        Self {
            durations: vec![0, 1, 2, 3, 4],
            include_duration_confidence: false,
            boundary_search_frames: 5,
            enable_debug: false,
        }
    }
}

/// Tokens decoded from one chunk, column-wise.
///
/// Timestamps are absolute encoder frames, monotonically non-decreasing;
/// confidences are the softmax probability of the emitted symbol at emission
/// time; `duration_confidences` is populated only when the config asks for it.
#[derive(Debug, Clone, Default)]
pub struct Hypothesis {
    pub tokens: Vec<u32>,
    pub timestamps: Vec<usize>,
    pub confidences: Vec<f32>,
    pub durations: Vec<usize>,
    pub duration_confidences: Vec<f32>,
}

impl Hypothesis {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    fn push(
        &mut self,
        token: u32,
        timestamp: usize,
        confidence: f32,
        duration: usize,
        duration_confidence: Option<f32>,
    ) {
        self.tokens.push(token);
        self.timestamps.push(timestamp);
        self.confidences.push(confidence);
        self.durations.push(duration);
        if let Some(dc) = duration_confidence {
            self.duration_confidences.push(dc);
        }
    }

    /// Remove the first `n` records from every column in lockstep.
    pub(crate) fn drop_front(&mut self, n: usize) {
        let n = n.min(self.len());
        self.tokens.drain(..n);
        self.timestamps.drain(..n);
        self.confidences.drain(..n);
        self.durations.drain(..n.min(self.durations.len()));
        let dc = n.min(self.duration_confidences.len());
        self.duration_confidences.drain(..dc);
    }

    pub(crate) fn append(&mut self, mut other: Hypothesis) {
        self.tokens.append(&mut other.tokens);
        self.timestamps.append(&mut other.timestamps);
        self.confidences.append(&mut other.confidences);
        self.durations.append(&mut other.durations);
        self.duration_confidences
            .append(&mut other.duration_confidences);
    }

    /// Stable sort of all columns by timestamp, restoring chronological
    /// order across chunk boundaries.
    pub(crate) fn sort_by_timestamp(&mut self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.timestamps[i]);
        if order.windows(2).all(|w| w[0] < w[1]) {
            return;
        }
        self.tokens = order.iter().map(|&i| self.tokens[i]).collect();
        self.timestamps = order.iter().map(|&i| self.timestamps[i]).collect();
        self.confidences = order.iter().map(|&i| self.confidences[i]).collect();
        if self.durations.len() == order.len() {
            self.durations = order.iter().map(|&i| self.durations[i]).collect();
        }
        if self.duration_confidences.len() == order.len() {
            self.duration_confidences = order
                .iter()
                .map(|&i| self.duration_confidences[i])
                .collect();
        }
    }
}

/// Index and value of the largest element.
fn argmax(values: &[f32]) -> (usize, f32) {
    let mut best = 0;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = i;
        }
    }
    (best, best_val)
}

/// Numerically stable softmax probability of `values[idx]`.
pub(crate) fn softmax_at(values: &[f32], idx: usize) -> f32 {
    let max = values.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let sum: f32 = values.iter().map(|&v| (v - max).exp()).sum();
    (values[idx] - max).exp() / sum
}

pub struct TdtDecoder {
    config: TdtConfig,
}

impl TdtDecoder {
    pub fn new(config: TdtConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TdtConfig {
        &self.config
    }

    /// Greedy-decode one chunk of encoder output.
    ///
    /// Consumes encoder frames `[max(0, context_frame_adjustment),
    /// actual_audio_frames)` to completion, never stopping early on
    /// trailing blanks; the zero-padded tail beyond `actual_audio_frames`
    /// is never read. Timestamps are emitted as absolute frames via
    /// `global_frame_offset`. On success `state` holds the hidden/cell
    /// outputs of the last decoder invocation and the last emitted token.
    #[allow(clippy::too_many_arguments)]
    pub fn decode(
        &self,
        backend: &dyn AsrBackend,
        encoder: &EncoderOutput,
        actual_audio_frames: usize,
        state: &mut DecoderState,
        context_frame_adjustment: i32,
        global_frame_offset: usize,
        cancel: &CancelToken,
    ) -> Result<Hypothesis> {
        let frames = actual_audio_frames.min(encoder.length);
        let mut t = context_frame_adjustment.max(0) as usize;
        let mut hypothesis = Hypothesis::default();

        if t >= frames {
            return Ok(hypothesis);
        }
        if cancel.is_cancelled() {
            return Err(Error::processing("tdt_decoder", "cancelled"));
        }

        let num_durations = self.config.durations.len();
        if num_durations == 0 {
            return Err(Error::processing("tdt_decoder", "empty duration set"));
        }
        let expected_logits = VOCAB_LOGITS + num_durations;

        if self.config.enable_debug {
            debug!(frames, start = t, global_frame_offset, "tdt decode start");
        }

        // Decoder output for the state's last token feeds the first joint.
        let mut dec = backend.decoder_step(state.last_token, state)?;
        state.update(&dec);

        let max_iterations = frames.saturating_mul(10);
        let mut iterations = 0usize;

        while t < frames {
            iterations += 1;
            if iterations > max_iterations {
                return Err(Error::processing(
                    "tdt_decoder",
                    format!("safety bound hit after {iterations} iterations for {frames} frames"),
                ));
            }
            if cancel.is_cancelled() {
                return Err(Error::processing("tdt_decoder", "cancelled"));
            }

            let encoder_frame = encoder.features.slice(s![0, t, ..]);
            let decoder_out = dec.output.slice(s![0, 0, ..]);
            let logits = backend.joint_step(encoder_frame, decoder_out)?;
            if logits.len() != expected_logits {
                return Err(Error::processing(
                    "joint",
                    format!(
                        "expected {expected_logits} logits, got {}",
                        logits.len()
                    ),
                ));
            }

            let logits = logits.as_slice().ok_or_else(|| {
                Error::processing("joint", "logits are not contiguous")
            })?;
            let (vocab_logits, duration_logits) = logits.split_at(VOCAB_LOGITS);

            let (symbol, _) = argmax(vocab_logits);
            let (duration_idx, _) = argmax(duration_logits);
            let duration = self.config.durations[duration_idx];

            if symbol as u32 != BLANK_ID {
                let confidence = softmax_at(vocab_logits, symbol);
                let duration_confidence = self
                    .config
                    .include_duration_confidence
                    .then(|| softmax_at(duration_logits, duration_idx));
                hypothesis.push(
                    symbol as u32,
                    global_frame_offset + t,
                    confidence,
                    duration,
                    duration_confidence,
                );

                if self.config.enable_debug {
                    debug!(
                        token = symbol,
                        frame = global_frame_offset + t,
                        confidence,
                        duration,
                        "tdt emit"
                    );
                }

                dec = backend.decoder_step(symbol as u32, state)?;
                state.last_token = symbol as u32;
                state.update(&dec);
            }

            // A zero jump would re-run the same frame forever; force one
            // step so every iteration consumes time.
            t += duration.max(1);
        }

        if self.config.enable_debug {
            debug!(
                emitted = hypothesis.len(),
                iterations,
                end = t,
                "tdt decode done"
            );
        }

        Ok(hypothesis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{frames_for_samples, MODEL_WINDOW_SAMPLES, SAMPLES_PER_FRAME};
    use crate::models::mock::{
        frame_coded_audio, MockBackend, DURATION_LOGIT, EMIT_LOGIT, NUM_DURATIONS,
    };
    use ndarray::{Array1, ArrayView1};
    use std::sync::atomic::Ordering;

    fn encoder_output(backend: &MockBackend, coded_frames: usize) -> EncoderOutput {
        let audio = frame_coded_audio(coded_frames * SAMPLES_PER_FRAME);
        let mel = backend.melspectrogram(&audio).unwrap();
        backend.encode(mel).unwrap()
    }

    fn decode(
        backend: &MockBackend,
        frames: usize,
        state: &mut DecoderState,
        adjustment: i32,
        offset: usize,
        config: TdtConfig,
    ) -> Result<Hypothesis> {
        let encoder = encoder_output(backend, frames);
        TdtDecoder::new(config).decode(
            backend,
            &encoder,
            frames,
            state,
            adjustment,
            offset,
            &CancelToken::new(),
        )
    }

    #[test]
    fn emits_scripted_tokens_with_absolute_timestamps() {
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        let hyp = decode(&backend, 12, &mut state, 0, 0, TdtConfig::default()).unwrap();
        assert_eq!(hyp.tokens, vec![100, 104, 108]);
        assert_eq!(hyp.timestamps, vec![0, 4, 8]);
        assert_eq!(hyp.durations, vec![1, 1, 1]);

        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        let hyp = decode(&backend, 12, &mut state, 0, 50, TdtConfig::default()).unwrap();
        assert_eq!(hyp.timestamps, vec![50, 54, 58]);
        // Token identity follows the encoder frame, not the offset.
        assert_eq!(hyp.tokens, vec![100, 104, 108]);
    }

    #[test]
    fn confidence_is_softmax_of_argmax() {
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        let hyp = decode(&backend, 4, &mut state, 0, 0, TdtConfig::default()).unwrap();
        let expected = EMIT_LOGIT.exp() / (EMIT_LOGIT.exp() + 1024.0);
        assert_eq!(hyp.confidences.len(), 1);
        assert!((hyp.confidences[0] - expected).abs() < 1e-5);
        assert!(hyp.duration_confidences.is_empty());
    }

    #[test]
    fn duration_confidence_recorded_separately_when_enabled() {
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        let config = TdtConfig {
            include_duration_confidence: true,
            ..TdtConfig::default()
        };
        let hyp = decode(&backend, 4, &mut state, 0, 0, config).unwrap();
        let token_expected = EMIT_LOGIT.exp() / (EMIT_LOGIT.exp() + 1024.0);
        let duration_expected =
            DURATION_LOGIT.exp() / (DURATION_LOGIT.exp() + (NUM_DURATIONS - 1) as f32);
        assert_eq!(hyp.duration_confidences.len(), 1);
        assert!((hyp.duration_confidences[0] - duration_expected).abs() < 1e-5);
        // The primary confidence is untouched by the duration block.
        assert!((hyp.confidences[0] - token_expected).abs() < 1e-5);
    }

    #[test]
    fn blank_advances_by_predicted_duration() {
        // Silence decodes to blank on every step; duration class 2 jumps
        // two frames per step.
        let backend = MockBackend::new().with_duration_class(2);
        let mut state = DecoderState::new();
        let silence = vec![0.0f32; 12 * SAMPLES_PER_FRAME];
        let mel = backend.melspectrogram(&silence).unwrap();
        let encoder = backend.encode(mel).unwrap();
        let hyp = TdtDecoder::new(TdtConfig::default())
            .decode(
                &backend,
                &encoder,
                12,
                &mut state,
                0,
                0,
                &CancelToken::new(),
            )
            .unwrap();
        assert!(hyp.is_empty());
        assert_eq!(backend.joint_calls.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn zero_duration_forces_single_step_progress() {
        let backend = MockBackend::new()
            .with_emit_every(1)
            .with_duration_class(0);
        let mut state = DecoderState::new();
        let hyp = decode(&backend, 5, &mut state, 0, 0, TdtConfig::default()).unwrap();
        assert_eq!(hyp.tokens.len(), 5);
        assert_eq!(hyp.timestamps, vec![0, 1, 2, 3, 4]);
        // One iteration per frame; well under the 10x safety bound.
        assert_eq!(backend.joint_calls.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn negative_adjustment_clamps_to_zero() {
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        let hyp = decode(&backend, 8, &mut state, -7, 0, TdtConfig::default()).unwrap();
        assert_eq!(hyp.timestamps[0], 0);
    }

    #[test]
    fn positive_adjustment_skips_already_decoded_frames() {
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        let hyp = decode(&backend, 12, &mut state, 3, 0, TdtConfig::default()).unwrap();
        assert_eq!(hyp.tokens, vec![104, 108]);
        assert_eq!(hyp.timestamps, vec![4, 8]);
    }

    #[test]
    fn padded_tail_is_never_consumed() {
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        // Ten coded frames in the window but only six declared valid.
        let encoder = encoder_output(&backend, 10);
        let hyp = TdtDecoder::new(TdtConfig::default())
            .decode(
                &backend,
                &encoder,
                6,
                &mut state,
                0,
                0,
                &CancelToken::new(),
            )
            .unwrap();
        assert_eq!(hyp.tokens, vec![100, 104]);
        assert_eq!(backend.joint_calls.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn state_reflects_last_decoder_invocation() {
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        let hyp = decode(&backend, 12, &mut state, 0, 0, TdtConfig::default()).unwrap();
        let last = *hyp.tokens.last().unwrap();
        assert_eq!(state.last_token, last);
        // Mock decoder writes (token + small carry) into the hidden state.
        assert!((state.hidden[[0, 0, 0]] - last as f32).abs() < 1.0);
        // One priming step plus one step per emission.
        assert_eq!(
            backend.decoder_calls.load(Ordering::Relaxed),
            hyp.len() + 1
        );
    }

    #[test]
    fn adjustment_beyond_frames_decodes_nothing_and_keeps_state() {
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        state.last_token = 42;
        let hyp = decode(&backend, 6, &mut state, 6, 0, TdtConfig::default()).unwrap();
        assert!(hyp.is_empty());
        assert_eq!(state.last_token, 42);
        assert_eq!(backend.decoder_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn cancelled_token_stops_before_model_calls() {
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        let encoder = encoder_output(&backend, 8);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = TdtDecoder::new(TdtConfig::default())
            .decode(&backend, &encoder, 8, &mut state, 0, 0, &cancel)
            .unwrap_err();
        assert_eq!(err.stage(), Some("tdt_decoder"));
        assert_eq!(backend.decoder_calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn malformed_joint_output_is_a_stage_failure() {
        struct BadJoint(MockBackend);
        impl AsrBackend for BadJoint {
            fn melspectrogram(&self, samples: &[f32]) -> Result<crate::models::MelFeatures> {
                self.0.melspectrogram(samples)
            }
            fn encode(
                &self,
                mel: crate::models::MelFeatures,
            ) -> Result<crate::models::EncoderOutput> {
                self.0.encode(mel)
            }
            fn decoder_step(
                &self,
                token: u32,
                state: &DecoderState,
            ) -> Result<crate::models::DecoderStepOutput> {
                self.0.decoder_step(token, state)
            }
            fn joint_step(
                &self,
                _encoder_frame: ArrayView1<'_, f32>,
                _decoder_out: ArrayView1<'_, f32>,
            ) -> Result<Array1<f32>> {
                Ok(Array1::zeros(10))
            }
        }

        let backend = BadJoint(MockBackend::new());
        let mut state = DecoderState::new();
        let encoder = {
            let audio = frame_coded_audio(4 * SAMPLES_PER_FRAME);
            let mel = backend.melspectrogram(&audio).unwrap();
            backend.encode(mel).unwrap()
        };
        let err = TdtDecoder::new(TdtConfig::default())
            .decode(
                &backend,
                &encoder,
                4,
                &mut state,
                0,
                0,
                &CancelToken::new(),
            )
            .unwrap_err();
        assert_eq!(err.stage(), Some("joint"));
    }

    #[test]
    fn sort_by_timestamp_reorders_all_columns() {
        let mut hyp = Hypothesis {
            tokens: vec![2, 1, 3],
            timestamps: vec![20, 10, 30],
            confidences: vec![0.2, 0.1, 0.3],
            durations: vec![2, 1, 3],
            duration_confidences: vec![],
        };
        hyp.sort_by_timestamp();
        assert_eq!(hyp.tokens, vec![1, 2, 3]);
        assert_eq!(hyp.timestamps, vec![10, 20, 30]);
        assert_eq!(hyp.confidences, vec![0.1, 0.2, 0.3]);
        assert_eq!(hyp.durations, vec![1, 2, 3]);
    }

    #[test]
    fn drop_front_removes_columns_in_lockstep() {
        let mut hyp = Hypothesis {
            tokens: vec![1, 2, 3],
            timestamps: vec![10, 20, 30],
            confidences: vec![0.1, 0.2, 0.3],
            durations: vec![1, 1, 1],
            duration_confidences: vec![0.9, 0.8, 0.7],
        };
        hyp.drop_front(2);
        assert_eq!(hyp.tokens, vec![3]);
        assert_eq!(hyp.timestamps, vec![30]);
        assert_eq!(hyp.confidences, vec![0.3]);
        assert_eq!(hyp.durations, vec![1]);
        assert_eq!(hyp.duration_confidences, vec![0.7]);
    }

    #[test]
    fn full_window_runs_one_joint_call_per_frame() {
        // A full 15 s window decodes with one inner step per valid frame.
        let backend = MockBackend::new();
        let mut state = DecoderState::new();
        let frames = frames_for_samples(MODEL_WINDOW_SAMPLES);
        let hyp = decode(&backend, frames, &mut state, 0, 0, TdtConfig::default()).unwrap();
        assert_eq!(backend.joint_calls.load(Ordering::Relaxed), frames);
        assert_eq!(hyp.tokens.len(), frames.div_ceil(4));
    }
}
