//! Final result assembly: detokenized text, per-token timings, and an
//! aggregate confidence.

use tracing::warn;

use crate::constants::{frame_to_seconds, FRAME_SECONDS};
use crate::tdt::Hypothesis;
use crate::vocab::Vocabulary;

/// Timing and confidence for one emitted token.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenTiming {
    pub token: String,
    pub token_id: u32,
    pub start_time: f32,
    pub end_time: f32,
    pub confidence: f32,
}

/// One transcription result.
#[derive(Debug, Clone)]
pub struct AsrResult {
    pub text: String,
    /// Mean token confidence, clamped to `[0.1, 1.0]`; 0.1 for an empty
    /// transcription.
    pub confidence: f32,
    /// Audio duration in seconds.
    pub duration: f32,
    /// Wall-clock processing time in seconds.
    pub processing_time: f32,
    pub token_timings: Vec<TokenTiming>,
}

pub(crate) fn assemble(
    vocab: &Vocabulary,
    hypothesis: &Hypothesis,
    audio_duration: f32,
    processing_time: f32,
) -> AsrResult {
    let text = vocab.detokenize(&hypothesis.tokens);
    let count = hypothesis.len();
    let has_durations = hypothesis.durations.len() == count;

    let mut token_timings = Vec::with_capacity(count);
    for i in 0..count {
        let start_time = frame_to_seconds(hypothesis.timestamps[i]);
        let end_time = if has_durations {
            start_time + (hypothesis.durations[i] as f32 * FRAME_SECONDS).max(FRAME_SECONDS)
        } else if i + 1 < count {
            // Without durations a token runs to its successor, but never
            // shorter than one frame.
            frame_to_seconds(hypothesis.timestamps[i + 1]).max(start_time + FRAME_SECONDS)
        } else {
            start_time + FRAME_SECONDS
        };
        token_timings.push(TokenTiming {
            token: vocab.token_text(hypothesis.tokens[i]),
            token_id: hypothesis.tokens[i],
            start_time,
            end_time,
            confidence: hypothesis.confidences[i],
        });
    }

    let confidence = if count == 0 {
        if audio_duration > 0.0 {
            warn!(audio_duration, "transcription produced no tokens");
        }
        0.1
    } else {
        let mean = hypothesis.confidences.iter().sum::<f32>() / count as f32;
        mean.clamp(0.1, 1.0)
    };

    AsrResult {
        text,
        confidence,
        duration: audio_duration,
        processing_time,
        token_timings,
    }
}
