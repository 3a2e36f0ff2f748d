//! Pipeline orchestration and per-source decoder state.
//!
//! The manager adopts the four model handles plus the vocabulary, pre-warms
//! the deterministic post-SOS decoder state, and routes every transcribe
//! call through a source-keyed state slot. Slots commit only on success, so
//! a failed or cancelled call leaves its source exactly where it was.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, info};

use crate::chunking::{dedupe_overlap, ChunkProcessor};
use crate::constants::{
    frames_for_samples, BLANK_ID, MIN_AUDIO_SAMPLES, MODEL_WINDOW_SAMPLES, SAMPLE_RATE,
};
use crate::decoder_state::DecoderState;
use crate::error::{Error, Result};
use crate::models::AsrBackend;
use crate::result::{assemble, AsrResult};
use crate::tdt::{Hypothesis, TdtConfig, TdtDecoder};
use crate::vocab::Vocabulary;

/// Cooperative cancellation flag, checked between model invocations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Named audio origin. Each source owns an independent decoder state, so two
/// live sessions can share the models without cross-contamination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AudioSource {
    #[default]
    Microphone,
    System,
}

struct Engine {
    backend: Arc<dyn AsrBackend>,
    vocab: Vocabulary,
    decoder: TdtDecoder,
    /// Deterministic post-SOS state every slot starts from and resets to.
    warm_state: DecoderState,
    microphone: Mutex<DecoderState>,
    system: Mutex<DecoderState>,
}

impl Engine {
    fn slot(&self, source: AudioSource) -> &Mutex<DecoderState> {
        match source {
            AudioSource::Microphone => &self.microphone,
            AudioSource::System => &self.system,
        }
    }

    fn lock_slot(&self, source: AudioSource) -> Result<MutexGuard<'_, DecoderState>> {
        self.slot(source)
            .lock()
            .map_err(|_| Error::processing("manager", "decoder state mutex poisoned"))
    }
}

pub struct AsrManager {
    config: TdtConfig,
    engine: Option<Engine>,
}

impl AsrManager {
    pub fn new() -> Self {
        Self::with_config(TdtConfig::default())
    }

    pub fn with_config(config: TdtConfig) -> Self {
        Self {
            config,
            engine: None,
        }
    }

    /// Adopt the model suite and vocabulary, and pre-warm one decoder step
    /// with the SOS token to fix the initial state all sources share.
    pub fn initialize(&mut self, backend: Arc<dyn AsrBackend>, vocab: Vocabulary) -> Result<()> {
        let mut warm_state = DecoderState::new();
        let step = backend.decoder_step(BLANK_ID, &warm_state)?;
        warm_state.update(&step);

        info!(vocab_size = vocab.size(), "ASR manager initialized");
        self.engine = Some(Engine {
            backend,
            vocab,
            decoder: TdtDecoder::new(self.config.clone()),
            microphone: Mutex::new(warm_state.clone()),
            system: Mutex::new(warm_state.clone()),
            warm_state,
        });
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    fn engine(&self) -> Result<&Engine> {
        self.engine.as_ref().ok_or(Error::NotInitialized)
    }

    /// Transcribe from the default (microphone) source.
    pub fn transcribe(&self, samples: &[f32]) -> Result<AsrResult> {
        self.transcribe_for_source(samples, AudioSource::Microphone)
    }

    pub fn transcribe_for_source(
        &self,
        samples: &[f32],
        source: AudioSource,
    ) -> Result<AsrResult> {
        self.transcribe_with_cancellation(samples, source, &CancelToken::new())
    }

    /// Transcribe with a cooperative cancellation token. A cancelled call
    /// fails with `ProcessingFailed` and commits no decoder-state changes.
    pub fn transcribe_with_cancellation(
        &self,
        samples: &[f32],
        source: AudioSource,
        cancel: &CancelToken,
    ) -> Result<AsrResult> {
        self.transcribe_inner(samples, source, cancel, &[])
    }

    /// Streaming variant: dedup the fresh hypothesis against a caller-held
    /// token history before assembling the result.
    pub fn transcribe_with_history(
        &self,
        samples: &[f32],
        source: AudioSource,
        previous_tokens: &[u32],
    ) -> Result<AsrResult> {
        self.transcribe_inner(samples, source, &CancelToken::new(), previous_tokens)
    }

    fn transcribe_inner(
        &self,
        samples: &[f32],
        source: AudioSource,
        cancel: &CancelToken,
        previous_tokens: &[u32],
    ) -> Result<AsrResult> {
        let engine = self.engine()?;
        validate_audio(samples)?;

        let started = Instant::now();
        let mut slot = engine.lock_slot(source)?;

        // Work on a snapshot; the slot sees the new state only on success.
        let mut working = slot.snapshot();
        let mut hypothesis = run_pipeline(engine, samples, &mut working, cancel)?;
        slot.restore(working);
        drop(slot);

        if !previous_tokens.is_empty() {
            let removed = dedupe_overlap(
                previous_tokens,
                &mut hypothesis,
                engine.decoder.config().boundary_search_frames,
                &engine.vocab,
            );
            if removed > 0 {
                debug!(removed, "dropped tokens overlapping caller history");
            }
        }

        let audio_duration = samples.len() as f32 / SAMPLE_RATE as f32;
        Ok(assemble(
            &engine.vocab,
            &hypothesis,
            audio_duration,
            started.elapsed().as_secs_f32(),
        ))
    }

    /// Restore `source` to the deterministic post-SOS initial state.
    pub fn reset_decoder_state(&self, source: AudioSource) -> Result<()> {
        let engine = self.engine()?;
        let mut slot = engine.lock_slot(source)?;
        slot.restore(engine.warm_state.snapshot());
        debug!(?source, "decoder state reset");
        Ok(())
    }

    /// Release model handles and all per-source state.
    pub fn cleanup(&mut self) {
        self.engine = None;
    }

    #[cfg(test)]
    pub(crate) fn source_state(&self, source: AudioSource) -> DecoderState {
        self.engine()
            .and_then(|e| e.lock_slot(source))
            .map(|slot| slot.snapshot())
            .expect("initialized manager")
    }
}

impl Default for AsrManager {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_audio(samples: &[f32]) -> Result<()> {
    if samples.len() < MIN_AUDIO_SAMPLES {
        return Err(Error::InvalidAudioData(format!(
            "need at least {MIN_AUDIO_SAMPLES} samples (1 s), got {}",
            samples.len()
        )));
    }
    if let Some(index) = samples.iter().position(|v| !v.is_finite()) {
        return Err(Error::InvalidAudioData(format!(
            "non-finite sample at index {index}"
        )));
    }
    Ok(())
}

fn run_pipeline(
    engine: &Engine,
    samples: &[f32],
    state: &mut DecoderState,
    cancel: &CancelToken,
) -> Result<Hypothesis> {
    if samples.len() <= MODEL_WINDOW_SAMPLES {
        let mel = engine.backend.melspectrogram(samples)?;
        if cancel.is_cancelled() {
            return Err(Error::processing("manager", "cancelled"));
        }
        let encoded = engine.backend.encode(mel)?;
        let actual_frames = frames_for_samples(samples.len()).min(encoded.length);
        engine.decoder.decode(
            engine.backend.as_ref(),
            &encoded,
            actual_frames,
            state,
            0,
            0,
            cancel,
        )
    } else {
        ChunkProcessor::new(engine.backend.as_ref(), &engine.decoder, &engine.vocab)
            .transcribe(samples, state, cancel)
    }
}
