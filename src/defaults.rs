//! Default configuration constants for bleepd.
//!
//! Shared across the engine, config types, and CLI so every surface agrees
//! on the same numbers.

/// Default stream sample rate in Hz.
///
/// 48 kHz is the native rate of the USB audio interfaces this daemon targets.
/// Whisper input is resampled down to [`WHISPER_SAMPLE_RATE`] separately.
pub const SAMPLE_RATE: u32 = 48_000;

/// Default channel count for the processed stream (stereo).
pub const CHANNELS: usize = 2;

/// Sample rate expected by the Whisper acoustic model.
pub const WHISPER_SAMPLE_RATE: u32 = 16_000;

/// Length of one analysis chunk in seconds.
///
/// Five seconds balances transcription accuracy (Whisper degrades on very
/// short windows) against detection latency.
pub const CHUNK_SECONDS: f32 = 5.0;

/// Seconds of audio buffered before playback starts.
///
/// This is the latency budget that hides transcription time: a profane word
/// spoken now is still this many seconds away from the speakers.
pub const INITIAL_DELAY_SECONDS: f32 = 10.0;

/// Extra delay-line capacity beyond the initial delay, in seconds.
///
/// Gives the Whisper worker room to lag several chunks behind real time
/// before unread audio is overwritten.
pub const DELAY_HEADROOM_SECONDS: f32 = 10.0;

/// Playback pauses when the buffer drops this many seconds below the
/// initial delay, and resumes once the initial delay is restored.
pub const PAUSE_MARGIN_SECONDS: f32 = 2.0;

/// Censorship is suspended (underrun flag) when the buffer drops this many
/// seconds below the initial delay. Must be smaller than
/// [`PAUSE_MARGIN_SECONDS`] so the flag trips while playback still runs.
pub const UNDERRUN_MARGIN_SECONDS: f32 = 1.0;

/// Padding added before a detected word, in seconds.
///
/// Word onsets from segment-level timing skew late far more often than
/// early, hence the asymmetry with [`POST_ROLL_SECONDS`].
pub const PRE_ROLL_SECONDS: f64 = 0.4;

/// Padding added after a detected word, in seconds.
pub const POST_ROLL_SECONDS: f64 = 0.1;

/// Maximum fade length applied at each end of a reversed span, in frames.
pub const MAX_FADE_FRAMES: usize = 480;

/// Volume applied to reversed spans before fading.
pub const REVERSE_ATTENUATION: f32 = 0.5;

/// Minimum duration of a synthesized word, in seconds.
pub const MIN_WORD_SECONDS: f64 = 0.05;

/// Default Whisper model path.
pub const DEFAULT_MODEL: &str = "models/ggml-tiny.en.bin";

/// Default transcription language.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Default profanity lexicon path.
pub const DEFAULT_LEXICON: &str = "profanity_en.txt";

/// Report the GPU backend compiled into this build.
///
/// Returns a human-readable name based on the compile-time feature flags.
/// If no GPU backend is enabled, returns "CPU".
pub fn gpu_backend() -> &'static str {
    if cfg!(feature = "cuda") {
        "CUDA"
    } else if cfg!(feature = "vulkan") {
        "Vulkan"
    } else {
        "CPU"
    }
}
