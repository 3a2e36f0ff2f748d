//! Streaming chunked ASR with Parakeet-style Token-and-Duration Transducer
//! models over ONNX.
//!
//! The pipeline turns 16 kHz mono f32 samples into a deduplicated,
//! time-aligned token sequence through four black-box models
//! (mel-spectrogram, acoustic encoder, RNN decoder, joint network) driven by
//! a greedy TDT decode loop. Audio longer than one 15 s model window is
//! processed as overlapping frame-aligned chunks with token-sequence
//! deduplication, and recurrent decoder state is kept per audio source so
//! microphone and system capture can share one model suite.
//!
//! [`AsrManager`] is the entry point: adopt an [`AsrBackend`] (usually
//! [`OnnxAsrModels`]) plus a [`Vocabulary`], then call
//! [`AsrManager::transcribe`].

pub mod constants;
pub mod decoder_state;
pub mod error;
pub mod execution;
pub mod manager;
pub mod models;
pub mod result;
pub mod tdt;
pub mod vocab;

mod chunking;

pub use decoder_state::DecoderState;
pub use error::{Error, Result};
pub use execution::{ExecutionProvider, SessionConfig};
pub use manager::{AsrManager, AudioSource, CancelToken};
pub use models::{AsrBackend, DecoderStepOutput, EncoderOutput, MelFeatures, OnnxAsrModels};
pub use result::{AsrResult, TokenTiming};
pub use tdt::{Hypothesis, TdtConfig, TdtDecoder};
pub use vocab::Vocabulary;
