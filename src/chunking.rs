//! Sliding-window segmentation for audio longer than one model window.
//!
//! Each chunk feeds the encoder a frame-aligned window of center plus left
//! and right context; only the center is canonical output. Overlap between
//! adjacent windows is resolved twice: the last chunk skips already-decoded
//! frames via a frame adjustment, and middle chunks rely on token-sequence
//! deduplication against everything accumulated so far.

use tracing::debug;

use crate::constants::{frames_for_samples, MODEL_WINDOW_SAMPLES, SAMPLES_PER_FRAME};
use crate::decoder_state::DecoderState;
use crate::error::{Error, Result};
use crate::manager::CancelToken;
use crate::models::AsrBackend;
use crate::tdt::{Hypothesis, TdtDecoder};
use crate::vocab::Vocabulary;

/// Canonical region of one chunk: 11.2 s.
pub(crate) const CENTER_FRAMES: usize = 140;
/// Context fed to the encoder on each side of the center: 1.6 s.
pub(crate) const LEFT_CONTEXT_FRAMES: usize = 20;
pub(crate) const RIGHT_CONTEXT_FRAMES: usize = 20;

const CENTER_SAMPLES: usize = CENTER_FRAMES * SAMPLES_PER_FRAME;
const LEFT_CONTEXT_SAMPLES: usize = LEFT_CONTEXT_FRAMES * SAMPLES_PER_FRAME;
const RIGHT_CONTEXT_SAMPLES: usize = RIGHT_CONTEXT_FRAMES * SAMPLES_PER_FRAME;

/// Frames backed off from the theoretical overlap when the last chunk skips
/// already-decoded frames.
const LAST_CHUNK_SAFETY_FRAMES: i32 = 15;
/// Forward nudge applied when the last chunk has no theoretical overlap.
const CONTINUITY_NUDGE_FRAMES: i32 = 5;

/// Longest suffix/prefix overlap the dedup will remove, and how far back
/// into the accumulated tokens the boundary search looks.
const MAX_DEDUP_OVERLAP: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChunkWindow {
    pub left_start: usize,
    pub right_end: usize,
    pub is_last: bool,
}

fn align_up_to_frame(sample: usize) -> usize {
    sample.div_ceil(SAMPLES_PER_FRAME) * SAMPLES_PER_FRAME
}

/// Frame-aligned chunk windows covering `total_samples`.
///
/// The first chunk has no left context; middle chunks carry both contexts;
/// the last chunk (remaining tail shorter than the center) pulls in up to a
/// full model window of left context to maximize useful signal.
pub(crate) fn plan_chunks(total_samples: usize) -> Vec<ChunkWindow> {
    let mut windows = Vec::new();
    let mut center_start = 0usize;

    loop {
        let remaining = total_samples - center_start;
        let is_first = windows.is_empty();
        let is_last = remaining <= CENTER_SAMPLES;

        let (left_start, right_end) = if is_first {
            (0, total_samples.min(CENTER_SAMPLES + RIGHT_CONTEXT_SAMPLES))
        } else if is_last {
            (
                align_up_to_frame(total_samples.saturating_sub(MODEL_WINDOW_SAMPLES)),
                total_samples,
            )
        } else {
            (
                center_start - LEFT_CONTEXT_SAMPLES,
                total_samples.min(center_start + CENTER_SAMPLES + RIGHT_CONTEXT_SAMPLES),
            )
        };

        windows.push(ChunkWindow {
            left_start,
            right_end,
            is_last,
        });

        if is_last {
            break;
        }
        center_start += CENTER_SAMPLES;
    }

    windows
}

/// Remove tokens at the head of `current` that re-decode material already in
/// `previous` because of window overlap. Returns the number removed; all
/// hypothesis columns shrink in lockstep.
pub(crate) fn dedupe_overlap(
    previous: &[u32],
    current: &mut Hypothesis,
    boundary_search_frames: usize,
    vocab: &Vocabulary,
) -> usize {
    if previous.is_empty() || current.is_empty() {
        return 0;
    }

    // A sentence terminator repeated across the boundary is always overlap.
    let last = previous[previous.len() - 1];
    if current.tokens[0] == last && vocab.is_terminal_punctuation(last) {
        current.drop_front(1);
        return 1;
    }

    let max_overlap = MAX_DEDUP_OVERLAP.min(previous.len()).min(current.len());

    // Longest exact suffix/prefix match.
    for k in (2..=max_overlap).rev() {
        if previous[previous.len() - k..] == current.tokens[..k] {
            current.drop_front(k);
            return k;
        }
    }

    // Boundary search: the duplicated run may start a few tokens into the
    // chunk and end short of the accumulated tail.
    for k in (2..=max_overlap).rev() {
        let prev_lo = previous.len().saturating_sub(MAX_DEDUP_OVERLAP);
        for cur_start in 0..boundary_search_frames {
            if cur_start + k > current.len() {
                continue;
            }
            let needle = &current.tokens[cur_start..cur_start + k];
            for prev_start in (prev_lo..=previous.len() - k).rev() {
                if &previous[prev_start..prev_start + k] == needle {
                    let removed = cur_start + k;
                    current.drop_front(removed);
                    return removed;
                }
            }
        }
    }

    0
}

/// Drives the TDT decoder over windows of a long recording. Owns no state;
/// the caller passes the per-source decoder state in.
pub(crate) struct ChunkProcessor<'a> {
    backend: &'a dyn AsrBackend,
    decoder: &'a TdtDecoder,
    vocab: &'a Vocabulary,
}

impl<'a> ChunkProcessor<'a> {
    pub(crate) fn new(
        backend: &'a dyn AsrBackend,
        decoder: &'a TdtDecoder,
        vocab: &'a Vocabulary,
    ) -> Self {
        Self {
            backend,
            decoder,
            vocab,
        }
    }

    pub(crate) fn transcribe(
        &self,
        samples: &[f32],
        state: &mut DecoderState,
        cancel: &CancelToken,
    ) -> Result<Hypothesis> {
        let windows = plan_chunks(samples.len());
        let mut accumulated = Hypothesis::default();
        // Exclusive global frame up to which the previous chunk decoded.
        let mut last_processed_frame = 0usize;

        for (index, window) in windows.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(Error::processing("chunk_processor", "cancelled"));
            }

            let global_frame_offset = window.left_start / SAMPLES_PER_FRAME;
            let adjustment = if window.is_last && index > 0 {
                let overlap = last_processed_frame as i64 - global_frame_offset as i64;
                if overlap > 0 {
                    overlap as i32 - LAST_CHUNK_SAFETY_FRAMES
                } else {
                    CONTINUITY_NUDGE_FRAMES
                }
            } else {
                0
            };

            let slice = &samples[window.left_start..window.right_end];
            debug!(
                chunk = index,
                left = window.left_start,
                right = window.right_end,
                adjustment,
                is_last = window.is_last,
                "decoding chunk"
            );

            let mel = self.backend.melspectrogram(slice)?;
            let encoded = self.backend.encode(mel)?;
            let actual_frames = frames_for_samples(slice.len()).min(encoded.length);

            let mut current = self.decoder.decode(
                self.backend,
                &encoded,
                actual_frames,
                state,
                adjustment,
                global_frame_offset,
                cancel,
            )?;

            let removed = dedupe_overlap(
                &accumulated.tokens,
                &mut current,
                self.decoder.config().boundary_search_frames,
                self.vocab,
            );
            if removed > 0 {
                debug!(chunk = index, removed, "dropped overlapping tokens");
            }

            last_processed_frame = global_frame_offset + actual_frames;
            accumulated.append(current);
        }

        accumulated.sort_by_timestamp();
        Ok(accumulated)
    }
}
