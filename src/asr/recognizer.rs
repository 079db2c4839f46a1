//! Recognizer contract and the Whisper implementation.
//!
//! The engine only depends on the [`Recognizer`] trait: 16 kHz mono PCM in,
//! timed segments of raw tokens out. The whisper-rs implementation is
//! feature-gated so the crate builds (and the engine tests run with scripted
//! recognizers) without cmake or a model file.
//!
//! # Feature Gate
//!
//! Build with Whisper support (enabled by default):
//!
//! ```bash
//! cargo build --release
//! ```

use crate::error::Result;

#[cfg(feature = "whisper")]
use crate::defaults;
#[cfg(feature = "whisper")]
use crate::error::BleepdError;
#[cfg(feature = "whisper")]
use std::path::PathBuf;
#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

/// One raw token as emitted by the recognizer, before cleanup.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    /// Model token id; ids at or past the end-of-transcript sentinel are
    /// special tokens, not words.
    pub id: i32,
    pub text: String,
}

/// One recognizer segment: a token run with centisecond timing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSegment {
    /// Segment start within the chunk, in centiseconds.
    pub start_cs: i64,
    /// Segment end within the chunk, in centiseconds.
    pub end_cs: i64,
    pub tokens: Vec<RawToken>,
}

/// Speech recognizer contract consumed by the ASR worker.
///
/// Implementations must be deterministic for identical input (the engine
/// runs at temperature 0) and callable from the worker thread.
pub trait Recognizer: Send + Sync {
    /// Transcribe one chunk of 16 kHz mono PCM.
    fn transcribe_chunk(&self, pcm_16k: &[f32]) -> Result<Vec<RawSegment>>;

    /// Token id of the end-of-transcript sentinel; every id at or past this
    /// is filtered out before word synthesis.
    fn end_of_transcript_id(&self) -> i32 {
        i32::MAX
    }

    /// Model name for status output.
    fn name(&self) -> &str;
}

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper recognizer.
#[cfg(feature = "whisper")]
#[derive(Debug, Clone)]
pub struct WhisperRecognizerConfig {
    /// Path to the ggml model file.
    pub model_path: PathBuf,
    /// Language code; the pipeline is tuned for "en".
    pub language: String,
    /// Inference threads (None = whisper.cpp default).
    pub threads: Option<usize>,
    /// Whether to use GPU acceleration.
    pub use_gpu: bool,
}

#[cfg(feature = "whisper")]
impl Default for WhisperRecognizerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(defaults::DEFAULT_MODEL),
            language: defaults::DEFAULT_LANGUAGE.to_string(),
            threads: None,
            use_gpu: true,
        }
    }
}

/// Whisper-backed recognizer.
///
/// The context is wrapped in a Mutex; only the worker thread transcribes,
/// but the lock keeps the type honest about `Sync`.
#[cfg(feature = "whisper")]
pub struct WhisperRecognizer {
    context: Mutex<WhisperContext>,
    eot_id: i32,
    config: WhisperRecognizerConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl WhisperRecognizer {
    /// Load the model and prepare a recognizer.
    ///
    /// # Errors
    /// Returns `BleepdError::ModelNotFound` if the model file doesn't exist
    /// and `BleepdError::RecognizerInit` if whisper.cpp rejects it.
    pub fn new(config: WhisperRecognizerConfig) -> Result<Self> {
        // Route whisper.cpp's chatter away from stderr (once per process).
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(BleepdError::ModelNotFound {
                path: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = config
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown")
            .to_string();

        let mut context_params = WhisperContextParameters::default();
        context_params.use_gpu(config.use_gpu);
        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| BleepdError::RecognizerInit {
                    message: "Invalid UTF-8 in model path".to_string(),
                })?,
            context_params,
        )
        .map_err(|e| BleepdError::RecognizerInit {
            message: format!("Failed to load Whisper model: {}", e),
        })?;

        let eot_id = context.token_eot();

        Ok(Self {
            context: Mutex::new(context),
            eot_id,
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &WhisperRecognizerConfig {
        &self.config
    }

    fn build_params(&self) -> FullParams<'_, '_> {
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_language(Some(&self.config.language));
        params.set_translate(false);
        params.set_temperature(0.0);
        // One token per segment so segment timings approximate word timings.
        params.set_max_len(1);
        params.set_single_segment(false);
        params.set_token_timestamps(true);
        params.set_entropy_thold(2.4);
        params.set_logprob_thold(-1.0);

        if let Some(threads) = self.config.threads {
            params.set_n_threads(threads as i32);
        }

        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        params
    }
}

#[cfg(feature = "whisper")]
impl Recognizer for WhisperRecognizer {
    fn transcribe_chunk(&self, pcm_16k: &[f32]) -> Result<Vec<RawSegment>> {
        let context = self
            .context
            .lock()
            .map_err(|e| BleepdError::RecognizerFailed {
                message: format!("Failed to acquire context lock: {}", e),
            })?;

        let mut state = context
            .create_state()
            .map_err(|e| BleepdError::RecognizerFailed {
                message: format!("Failed to create Whisper state: {}", e),
            })?;

        state
            .full(self.build_params(), pcm_16k)
            .map_err(|e| BleepdError::RecognizerFailed {
                message: format!("Whisper inference failed: {}", e),
            })?;

        let mut segments = Vec::new();
        for segment in state.as_iter() {
            let mut tokens = Vec::new();
            for i in 0..segment.n_tokens() {
                let Some(token) = segment.get_token(i) else {
                    continue;
                };
                let Ok(text) = token.to_str_lossy() else {
                    continue;
                };
                tokens.push(RawToken {
                    id: token.token_id(),
                    text: text.into_owned(),
                });
            }
            segments.push(RawSegment {
                start_cs: segment.start_timestamp(),
                end_cs: segment.end_timestamp(),
                tokens,
            });
        }

        Ok(segments)
    }

    fn end_of_transcript_id(&self) -> i32 {
        self.eot_id
    }

    fn name(&self) -> &str {
        &self.model_name
    }
}
