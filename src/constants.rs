//! Model geometry constants and the only permitted sample/frame/second
//! conversions.
//!
//! The mel frontend hops 160 samples and the encoder subsamples 8x, so one
//! encoder frame covers 1280 input samples (80 ms at 16 kHz). Every other
//! module converts between the three time axes through the functions below.

pub const SAMPLE_RATE: usize = 16_000;
pub const HOP_LENGTH: usize = 160;
pub const ENCODER_SUBSAMPLING: usize = 8;

/// Input samples covered by one encoder frame.
pub const SAMPLES_PER_FRAME: usize = HOP_LENGTH * ENCODER_SUBSAMPLING;

/// Seconds covered by one encoder frame.
pub const FRAME_SECONDS: f32 = SAMPLES_PER_FRAME as f32 / SAMPLE_RATE as f32;

/// The model consumes exactly 15 s windows; shorter input is zero-padded at
/// the tail and the true sample count is reported alongside.
pub const MODEL_WINDOW_SAMPLES: usize = 240_000;

/// Nominal frame count of a full 15 s window. The encoder's output tensor is
/// padded to one frame more in compute.
pub const MODEL_WINDOW_FRAMES: usize = 187;

/// Shortest accepted input (1 s).
pub const MIN_AUDIO_SAMPLES: usize = 16_000;

/// Reserved token id doing double duty as the transducer blank and the
/// decoder's start-of-sequence input. Never rendered as text.
pub const BLANK_ID: u32 = 1024;

/// Size of the joint network's vocabulary logit block (tokens + blank).
pub const VOCAB_LOGITS: usize = 1025;

/// Decoder LSTM: 2 layers, 640 hidden units, batch 1.
pub const DECODER_LAYERS: usize = 2;
pub const DECODER_HIDDEN: usize = 640;

/// Number of encoder frames needed to cover `samples` input samples.
pub fn frames_for_samples(samples: usize) -> usize {
    samples.div_ceil(SAMPLES_PER_FRAME)
}

/// Input samples covered by `frames` encoder frames.
pub fn samples_for_frames(frames: usize) -> usize {
    frames * SAMPLES_PER_FRAME
}

/// Absolute encoder frame index to seconds.
pub fn frame_to_seconds(frame: usize) -> f32 {
    frame as f32 * FRAME_SECONDS
}
