//! Uniform adapter over the four neural models.
//!
//! The pipeline treats each model as a black-box tensor function with a
//! declared input/output contract: mel-spectrogram, acoustic encoder, RNN
//! decoder, joint network. [`AsrBackend`] is the single polymorphism seam in
//! the crate; [`OnnxAsrModels`] implements it over four ONNX sessions.
//!
//! Buffer discipline: model inputs are fed as borrowed tensor views over
//! either caller-owned arrays or buffers rented from a [`TensorPool`] keyed
//! by length and dtype. The mel output chains into the encoder without a
//! copy, and the f32/i32 staging buffers built around each model call (the
//! padded audio window, the length scalars, the decoder targets) are reused
//! instead of reallocated per invocation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use ndarray::{Array1, Array3, ArrayView1, ArrayViewD, Axis, IxDyn};
use ort::session::Session;
use ort::value::TensorRef;
use tracing::info;

use crate::constants::MODEL_WINDOW_SAMPLES;
use crate::decoder_state::DecoderState;
use crate::error::{Error, Result};
use crate::execution::SessionConfig;

/// Output of the mel-spectrogram stage, fed unchanged into the encoder.
#[derive(Debug)]
pub struct MelFeatures {
    pub features: Array3<f32>,
    /// Valid mel frame count for the unpadded part of the window.
    pub length: i32,
}

/// Encoder output: `[1, T, H]` plus the number of valid frames.
#[derive(Debug)]
pub struct EncoderOutput {
    pub features: Array3<f32>,
    pub length: usize,
}

/// One RNN decoder step: joint-side features plus the next recurrent state.
#[derive(Debug)]
pub struct DecoderStepOutput {
    /// `[1, 1, 640]`, the decoder-side input to the joint network.
    pub output: Array3<f32>,
    /// `[2, 1, 640]` hidden state after consuming the input token.
    pub hidden: Array3<f32>,
    /// `[2, 1, 640]` cell state after consuming the input token.
    pub cell: Array3<f32>,
}

/// The four model stages the decode pipeline drives.
///
/// Implementations must be shareable across threads; the manager serializes
/// per-source access above this seam.
pub trait AsrBackend: Send + Sync {
    /// Compute mel features for one model window. `samples` holds at most
    /// 240 000 samples; the backend zero-pads to the full window and reports
    /// the unpadded length downstream.
    fn melspectrogram(&self, samples: &[f32]) -> Result<MelFeatures>;

    /// Run the acoustic encoder over mel features.
    fn encode(&self, mel: MelFeatures) -> Result<EncoderOutput>;

    /// Advance the RNN decoder by one token.
    fn decoder_step(&self, token: u32, state: &DecoderState) -> Result<DecoderStepOutput>;

    /// Joint network over one encoder frame and one decoder output. Returns
    /// the flattened `[V + D]` logit row: vocabulary block then durations.
    fn joint_step(
        &self,
        encoder_frame: ArrayView1<'_, f32>,
        decoder_out: ArrayView1<'_, f32>,
    ) -> Result<Array1<f32>>;
}

/// Pool of staging buffers keyed by length and dtype, rented around model
/// calls.
///
/// Rentals hand the buffer back on drop, so every exit path (success, error,
/// cancellation) returns it.
pub(crate) struct TensorPool {
    f32_bufs: Mutex<HashMap<usize, Vec<Vec<f32>>>>,
    i32_bufs: Mutex<HashMap<usize, Vec<Vec<i32>>>>,
}

impl TensorPool {
    pub(crate) fn new() -> Self {
        Self {
            f32_bufs: Mutex::new(HashMap::new()),
            i32_bufs: Mutex::new(HashMap::new()),
        }
    }

    /// Rent a zeroed f32 buffer of exactly `len` elements.
    pub(crate) fn rent_f32(&self, len: usize) -> F32Rental<'_> {
        let mut buf = self
            .f32_bufs
            .lock()
            .ok()
            .and_then(|mut pool| pool.get_mut(&len).and_then(Vec::pop))
            .unwrap_or_default();
        buf.clear();
        buf.resize(len, 0.0);
        F32Rental { pool: self, buf }
    }

    /// Rent a zeroed i32 buffer of exactly `len` elements.
    pub(crate) fn rent_i32(&self, len: usize) -> I32Rental<'_> {
        let mut buf = self
            .i32_bufs
            .lock()
            .ok()
            .and_then(|mut pool| pool.get_mut(&len).and_then(Vec::pop))
            .unwrap_or_default();
        buf.clear();
        buf.resize(len, 0);
        I32Rental { pool: self, buf }
    }

    fn give_back_f32(&self, buf: Vec<f32>) {
        if let Ok(mut pool) = self.f32_bufs.lock() {
            pool.entry(buf.len()).or_default().push(buf);
        }
    }

    fn give_back_i32(&self, buf: Vec<i32>) {
        if let Ok(mut pool) = self.i32_bufs.lock() {
            pool.entry(buf.len()).or_default().push(buf);
        }
    }

    #[cfg(test)]
    fn idle_f32_count(&self, len: usize) -> usize {
        self.f32_bufs
            .lock()
            .map(|pool| pool.get(&len).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn idle_i32_count(&self, len: usize) -> usize {
        self.i32_bufs
            .lock()
            .map(|pool| pool.get(&len).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

pub(crate) struct F32Rental<'p> {
    pool: &'p TensorPool,
    buf: Vec<f32>,
}

impl F32Rental<'_> {
    pub(crate) fn as_slice(&self) -> &[f32] {
        &self.buf
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.buf
    }
}

impl Drop for F32Rental<'_> {
    fn drop(&mut self) {
        self.pool.give_back_f32(std::mem::take(&mut self.buf));
    }
}

pub(crate) struct I32Rental<'p> {
    pool: &'p TensorPool,
    buf: Vec<i32>,
}

impl I32Rental<'_> {
    pub(crate) fn as_slice(&self) -> &[i32] {
        &self.buf
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [i32] {
        &mut self.buf
    }
}

impl Drop for I32Rental<'_> {
    fn drop(&mut self) {
        self.pool.give_back_i32(std::mem::take(&mut self.buf));
    }
}

/// The four ONNX sessions behind [`AsrBackend`].
///
/// `Session::run` needs exclusive access, so each session sits behind its own
/// mutex; concurrent transcribe calls on different sources interleave at
/// stage granularity.
pub struct OnnxAsrModels {
    mel: Mutex<Session>,
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    joint: Mutex<Session>,
    pool: TensorPool,
}

impl OnnxAsrModels {
    /// Load the four models from a directory containing `melspectrogram.onnx`,
    /// `encoder.onnx`, `decoder.onnx`, and `joint.onnx`.
    pub fn from_dir<P: AsRef<Path>>(model_dir: P, config: &SessionConfig) -> Result<Self> {
        let model_dir = model_dir.as_ref();

        let load = |name: &str| -> Result<Session> {
            let path = model_dir.join(format!("{name}.onnx"));
            if !path.exists() {
                return Err(Error::ModelLoadFailed(format!(
                    "missing {name}.onnx in {}",
                    model_dir.display()
                )));
            }
            let builder = Session::builder()
                .map_err(|e| Error::ModelLoadFailed(e.to_string()))?;
            let session = config
                .apply(builder)?
                .commit_from_file(&path)
                .map_err(|e| Error::ModelLoadFailed(format!("{name}: {e}")))?;
            info!(model = name, "loaded ASR model");
            Ok(session)
        };

        Ok(Self {
            mel: Mutex::new(load("melspectrogram")?),
            encoder: Mutex::new(load("encoder")?),
            decoder: Mutex::new(load("decoder")?),
            joint: Mutex::new(load("joint")?),
            pool: TensorPool::new(),
        })
    }

    /// Load the four models from in-memory ONNX buffers.
    pub fn from_memory(
        mel_bytes: &[u8],
        encoder_bytes: &[u8],
        decoder_bytes: &[u8],
        joint_bytes: &[u8],
        config: &SessionConfig,
    ) -> Result<Self> {
        let load = |name: &'static str, bytes: &[u8]| -> Result<Session> {
            let builder = Session::builder()
                .map_err(|e| Error::ModelLoadFailed(e.to_string()))?;
            let session = config
                .apply(builder)?
                .commit_from_memory(bytes)
                .map_err(|e| Error::ModelLoadFailed(format!("{name}: {e}")))?;
            info!(model = name, "loaded ASR model from memory");
            Ok(session)
        };

        Ok(Self {
            mel: Mutex::new(load("melspectrogram", mel_bytes)?),
            encoder: Mutex::new(load("encoder", encoder_bytes)?),
            decoder: Mutex::new(load("decoder", decoder_bytes)?),
            joint: Mutex::new(load("joint", joint_bytes)?),
            pool: TensorPool::new(),
        })
    }
}

fn lock_session<'a>(
    session: &'a Mutex<Session>,
    stage: &'static str,
) -> Result<std::sync::MutexGuard<'a, Session>> {
    session
        .lock()
        .map_err(|_| Error::processing(stage, "session mutex poisoned"))
}

fn extract_f32_3d(
    value: Option<&ort::value::DynValue>,
    name: &str,
    stage: &'static str,
) -> Result<Array3<f32>> {
    let value =
        value.ok_or_else(|| Error::processing(stage, format!("missing output `{name}`")))?;
    let (shape, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|e| Error::processing(stage, format!("failed to extract `{name}`: {e}")))?;
    let dims = shape.as_ref();
    if dims.len() != 3 {
        return Err(Error::processing(
            stage,
            format!("output `{name}` has {} dims, expected 3", dims.len()),
        ));
    }
    Array3::from_shape_vec(
        (dims[0] as usize, dims[1] as usize, dims[2] as usize),
        data.to_vec(),
    )
    .map_err(|e| Error::processing(stage, format!("failed to reshape `{name}`: {e}")))
}

fn extract_i32_scalar(
    value: Option<&ort::value::DynValue>,
    name: &str,
    stage: &'static str,
) -> Result<i32> {
    let value =
        value.ok_or_else(|| Error::processing(stage, format!("missing output `{name}`")))?;
    let (_, data) = value
        .try_extract_tensor::<i32>()
        .map_err(|e| Error::processing(stage, format!("failed to extract `{name}`: {e}")))?;
    data.first()
        .copied()
        .ok_or_else(|| Error::processing(stage, format!("output `{name}` is empty")))
}

impl AsrBackend for OnnxAsrModels {
    fn melspectrogram(&self, samples: &[f32]) -> Result<MelFeatures> {
        debug_assert!(samples.len() <= MODEL_WINDOW_SAMPLES);

        let mut staged = self.pool.rent_f32(MODEL_WINDOW_SAMPLES);
        let copy_len = samples.len().min(MODEL_WINDOW_SAMPLES);
        staged.as_mut_slice()[..copy_len].copy_from_slice(&samples[..copy_len]);

        let mut audio_length = self.pool.rent_i32(1);
        audio_length.as_mut_slice()[0] = copy_len as i32;

        let audio_view =
            ArrayViewD::from_shape(IxDyn(&[1, MODEL_WINDOW_SAMPLES]), staged.as_slice())
                .map_err(|e| Error::processing("melspectrogram", e.to_string()))?;
        let length_view = ArrayViewD::from_shape(IxDyn(&[1]), audio_length.as_slice())
            .map_err(|e| Error::processing("melspectrogram", e.to_string()))?;

        let mut session = lock_session(&self.mel, "melspectrogram")?;
        let outputs = session
            .run(ort::inputs![
                "audio_signal" => TensorRef::from_array_view(audio_view)
                    .map_err(|e| Error::processing("melspectrogram", e.to_string()))?,
                "audio_length" => TensorRef::from_array_view(length_view)
                    .map_err(|e| Error::processing("melspectrogram", e.to_string()))?,
            ])
            .map_err(|e| Error::processing("melspectrogram", e.to_string()))?;

        let features = extract_f32_3d(outputs.get("melspectrogram"), "melspectrogram", "melspectrogram")?;
        let length = extract_i32_scalar(outputs.get("melspectrogram_length"), "melspectrogram_length", "melspectrogram")?;

        Ok(MelFeatures { features, length })
    }

    fn encode(&self, mel: MelFeatures) -> Result<EncoderOutput> {
        // The mel output array backs the encoder input directly; no copy.
        let mel_view = mel.features.view().into_dyn();

        let mut length = self.pool.rent_i32(1);
        length.as_mut_slice()[0] = mel.length;
        let length_view = ArrayViewD::from_shape(IxDyn(&[1]), length.as_slice())
            .map_err(|e| Error::processing("encoder", e.to_string()))?;

        let mut session = lock_session(&self.encoder, "encoder")?;
        let outputs = session
            .run(ort::inputs![
                "audio_signal" => TensorRef::from_array_view(mel_view)
                    .map_err(|e| Error::processing("encoder", e.to_string()))?,
                "length" => TensorRef::from_array_view(length_view)
                    .map_err(|e| Error::processing("encoder", e.to_string()))?,
            ])
            .map_err(|e| Error::processing("encoder", e.to_string()))?;

        let features = extract_f32_3d(outputs.get("encoder_output"), "encoder_output", "encoder")?;
        let length = extract_i32_scalar(outputs.get("encoder_output_length"), "encoder_output_length", "encoder")?;
        if length < 0 || length as usize > features.shape()[1] {
            return Err(Error::processing(
                "encoder",
                format!(
                    "encoder_output_length {length} outside output time axis {}",
                    features.shape()[1]
                ),
            ));
        }

        Ok(EncoderOutput {
            features,
            length: length as usize,
        })
    }

    fn decoder_step(&self, token: u32, state: &DecoderState) -> Result<DecoderStepOutput> {
        let mut targets = self.pool.rent_i32(1);
        targets.as_mut_slice()[0] = token as i32;
        let mut target_lengths = self.pool.rent_i32(1);
        target_lengths.as_mut_slice()[0] = 1;

        let targets_view = ArrayViewD::from_shape(IxDyn(&[1, 1]), targets.as_slice())
            .map_err(|e| Error::processing("decoder", e.to_string()))?;
        let lengths_view = ArrayViewD::from_shape(IxDyn(&[1]), target_lengths.as_slice())
            .map_err(|e| Error::processing("decoder", e.to_string()))?;

        let mut session = lock_session(&self.decoder, "decoder")?;
        let outputs = session
            .run(ort::inputs![
                "targets" => TensorRef::from_array_view(targets_view)
                    .map_err(|e| Error::processing("decoder", e.to_string()))?,
                "target_lengths" => TensorRef::from_array_view(lengths_view)
                    .map_err(|e| Error::processing("decoder", e.to_string()))?,
                "h_in" => TensorRef::from_array_view(state.hidden.view().into_dyn())
                    .map_err(|e| Error::processing("decoder", e.to_string()))?,
                "c_in" => TensorRef::from_array_view(state.cell.view().into_dyn())
                    .map_err(|e| Error::processing("decoder", e.to_string()))?,
            ])
            .map_err(|e| Error::processing("decoder", e.to_string()))?;

        Ok(DecoderStepOutput {
            output: extract_f32_3d(outputs.get("decoder"), "decoder", "decoder")?,
            hidden: extract_f32_3d(outputs.get("h_out"), "h_out", "decoder")?,
            cell: extract_f32_3d(outputs.get("c_out"), "c_out", "decoder")?,
        })
    }

    fn joint_step(
        &self,
        encoder_frame: ArrayView1<'_, f32>,
        decoder_out: ArrayView1<'_, f32>,
    ) -> Result<Array1<f32>> {
        // [H] -> [1, 1, H] views over the same storage.
        let enc = encoder_frame.insert_axis(Axis(0)).insert_axis(Axis(0));
        let dec = decoder_out.insert_axis(Axis(0)).insert_axis(Axis(0));

        let mut session = lock_session(&self.joint, "joint")?;
        let outputs = session
            .run(ort::inputs![
                "encoder_step" => TensorRef::from_array_view(enc.into_dyn())
                    .map_err(|e| Error::processing("joint", e.to_string()))?,
                "decoder_step" => TensorRef::from_array_view(dec.into_dyn())
                    .map_err(|e| Error::processing("joint", e.to_string()))?,
            ])
            .map_err(|e| Error::processing("joint", e.to_string()))?;

        let value = outputs
            .get("logits")
            .ok_or_else(|| Error::processing("joint", "missing output `logits`"))?;
        let (_, data) = value
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::processing("joint", format!("failed to extract logits: {e}")))?;

        Ok(Array1::from_vec(data.to_vec()))
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Deterministic stand-in for the four models.
    //!
    //! Test audio encodes a global frame index into its sample values: every
    //! sample of frame `g` equals `(g + 1) * SCALE`. The mock mel/encoder
    //! carry that value through per frame, and the mock joint turns it back
    //! into a scripted token (or blank), so decode behavior is a pure
    //! function of which window of audio a chunk saw.

    use super::*;
    use crate::constants::{
        frames_for_samples, BLANK_ID, DECODER_HIDDEN, DECODER_LAYERS, SAMPLES_PER_FRAME,
        VOCAB_LOGITS,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const SCALE: f32 = 1e-4;
    pub(crate) const MOCK_ENC_DIM: usize = 8;
    pub(crate) const NUM_DURATIONS: usize = 5;
    pub(crate) const EMIT_LOGIT: f32 = 8.0;
    pub(crate) const DURATION_LOGIT: f32 = 5.0;

    /// Synthesize audio whose frame `g` carries the value `(g + 1) * SCALE`.
    pub(crate) fn frame_coded_audio(samples: usize) -> Vec<f32> {
        (0..samples)
            .map(|i| (i / SAMPLES_PER_FRAME + 1) as f32 * SCALE)
            .collect()
    }

    pub(crate) struct MockBackend {
        /// Emit a token at global frames divisible by this; blank elsewhere.
        pub emit_every: usize,
        /// Emitted token id for frame `g` is `token_base + g`.
        pub token_base: u32,
        /// Duration-class index the joint "predicts" on every step.
        pub duration_class: usize,
        pub mel_calls: AtomicUsize,
        pub encode_calls: AtomicUsize,
        pub decoder_calls: AtomicUsize,
        pub joint_calls: AtomicUsize,
    }

    impl MockBackend {
        pub(crate) fn new() -> Self {
            Self {
                emit_every: 4,
                token_base: 100,
                duration_class: 1,
                mel_calls: AtomicUsize::new(0),
                encode_calls: AtomicUsize::new(0),
                decoder_calls: AtomicUsize::new(0),
                joint_calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn with_emit_every(mut self, emit_every: usize) -> Self {
            self.emit_every = emit_every;
            self
        }

        pub(crate) fn with_duration_class(mut self, duration_class: usize) -> Self {
            self.duration_class = duration_class;
            self
        }

        fn frame_token(&self, global_frame: usize) -> Option<u32> {
            (global_frame % self.emit_every == 0)
                .then(|| self.token_base + global_frame as u32)
        }
    }

    impl AsrBackend for MockBackend {
        fn melspectrogram(&self, samples: &[f32]) -> Result<MelFeatures> {
            self.mel_calls.fetch_add(1, Ordering::Relaxed);
            let frames = frames_for_samples(MODEL_WINDOW_SAMPLES);
            let mut features = Array3::zeros((1, 1, frames));
            for f in 0..frames {
                let start = f * SAMPLES_PER_FRAME;
                let end = ((f + 1) * SAMPLES_PER_FRAME).min(samples.len());
                if start < samples.len() {
                    let peak = samples[start..end].iter().fold(0.0f32, |a, &b| a.max(b));
                    features[[0, 0, f]] = peak;
                }
            }
            Ok(MelFeatures {
                features,
                length: samples.len() as i32,
            })
        }

        fn encode(&self, mel: MelFeatures) -> Result<EncoderOutput> {
            self.encode_calls.fetch_add(1, Ordering::Relaxed);
            let frames = mel.features.shape()[2];
            let mut features = Array3::zeros((1, frames, MOCK_ENC_DIM));
            for t in 0..frames {
                features[[0, t, 0]] = mel.features[[0, 0, t]];
            }
            Ok(EncoderOutput {
                features,
                length: frames,
            })
        }

        fn decoder_step(&self, token: u32, state: &DecoderState) -> Result<DecoderStepOutput> {
            self.decoder_calls.fetch_add(1, Ordering::Relaxed);
            // Toy recurrence so state continuity is observable in tests.
            let carried = state.hidden[[0, 0, 0]];
            let h = token as f32 + 0.001 * carried;
            let mut output = Array3::zeros((1, 1, DECODER_HIDDEN));
            output[[0, 0, 0]] = token as f32;
            Ok(DecoderStepOutput {
                output,
                hidden: Array3::from_elem((DECODER_LAYERS, 1, DECODER_HIDDEN), h),
                cell: Array3::from_elem((DECODER_LAYERS, 1, DECODER_HIDDEN), -h),
            })
        }

        fn joint_step(
            &self,
            encoder_frame: ArrayView1<'_, f32>,
            _decoder_out: ArrayView1<'_, f32>,
        ) -> Result<Array1<f32>> {
            self.joint_calls.fetch_add(1, Ordering::Relaxed);
            let mut logits = Array1::zeros(VOCAB_LOGITS + NUM_DURATIONS);
            let coded = encoder_frame[0];
            let token = if coded > 0.0 {
                let global_frame = (coded / SCALE).round() as usize - 1;
                self.frame_token(global_frame)
            } else {
                None
            };
            match token {
                Some(id) => logits[id as usize] = EMIT_LOGIT,
                None => logits[BLANK_ID as usize] = EMIT_LOGIT,
            }
            logits[VOCAB_LOGITS + self.duration_class] = DURATION_LOGIT;
            Ok(logits)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{frame_coded_audio, MockBackend, MOCK_ENC_DIM, SCALE};
    use super::*;
    use crate::constants::{frames_for_samples, SAMPLES_PER_FRAME};

    #[test]
    fn pool_rents_zeroed_and_recycles() {
        let pool = TensorPool::new();
        {
            let mut rental = pool.rent_f32(64);
            rental.as_mut_slice()[0] = 1.5;
            assert_eq!(rental.as_slice().len(), 64);
        }
        assert_eq!(pool.idle_f32_count(64), 1);

        let rental = pool.rent_f32(64);
        assert_eq!(pool.idle_f32_count(64), 0);
        assert!(rental.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn pool_keys_by_length() {
        let pool = TensorPool::new();
        drop(pool.rent_f32(8));
        drop(pool.rent_f32(16));
        assert_eq!(pool.idle_f32_count(8), 1);
        assert_eq!(pool.idle_f32_count(16), 1);
        assert_eq!(pool.idle_f32_count(32), 0);
    }

    #[test]
    fn pool_keeps_dtypes_apart() {
        let pool = TensorPool::new();
        {
            let mut rental = pool.rent_i32(8);
            rental.as_mut_slice()[0] = 7;
        }
        drop(pool.rent_f32(8));

        // Same length, different dtype: separate buckets, both recycled.
        assert_eq!(pool.idle_i32_count(8), 1);
        assert_eq!(pool.idle_f32_count(8), 1);

        let rental = pool.rent_i32(8);
        assert_eq!(pool.idle_i32_count(8), 0);
        assert!(rental.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn mock_round_trips_frame_coding() {
        let backend = MockBackend::new();
        let audio = frame_coded_audio(SAMPLES_PER_FRAME * 3);
        let mel = backend.melspectrogram(&audio).unwrap();
        assert_eq!(mel.length, (SAMPLES_PER_FRAME * 3) as i32);

        let enc = backend.encode(mel).unwrap();
        assert_eq!(enc.features.shape()[2], MOCK_ENC_DIM);
        assert_eq!(enc.length, frames_for_samples(MODEL_WINDOW_SAMPLES));
        // Frame 2 carries (2 + 1) * SCALE; the padded tail carries zero.
        assert!((enc.features[[0, 2, 0]] - 3.0 * SCALE).abs() < 1e-9);
        assert_eq!(enc.features[[0, 10, 0]], 0.0);
    }
}
