//! Engine counters and the statistics snapshot exposed to the host.

use crate::engine::gate::GateState;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Lock-free counters shared between the audio contexts, the Whisper
/// worker, and stats readers.
#[derive(Default)]
pub struct Counters {
    /// Profane words (single or bigram) detected and patched.
    pub profanity_hits: AtomicU64,
    /// Hits skipped because the underrun flag was set, or because the patch
    /// queue was full.
    pub skipped_hits: AtomicU64,
    /// Frames of a patch span that had already been played when the patch
    /// was applied.
    pub leaked_frames: AtomicU64,
    /// Chunks fully processed by the Whisper worker.
    pub chunks_processed: AtomicU64,
    /// RMS input level of the last processed block, stored as f32 bits.
    input_level_bits: AtomicU32,
}

impl Counters {
    pub fn set_input_level(&self, rms: f32) {
        self.input_level_bits.store(rms.to_bits(), Ordering::Relaxed);
    }

    pub fn input_level(&self) -> f32 {
        f32::from_bits(self.input_level_bits.load(Ordering::Relaxed))
    }
}

/// Point-in-time view of the engine, assembled from loose atomic snapshots.
/// Values may be one audio block stale relative to each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStats {
    pub gate: GateState,
    /// Frames buffered between capture and playback.
    pub fill_frames: u64,
    /// Same, in seconds.
    pub fill_seconds: f64,
    pub underrun: bool,
    pub profanity_hits: u64,
    pub skipped_hits: u64,
    pub leaked_frames: u64,
    pub chunks_processed: u64,
    /// RMS level of the most recent input block.
    pub input_level: f32,
}
