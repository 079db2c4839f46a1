//! Censor: turns recognized words into delay-line patch requests.
//!
//! For every chunk the Whisper worker finishes, the censor scans the word
//! list against the profanity lexicon (single words, then concatenated
//! bigrams), pads each hit, converts chunk-relative times to absolute
//! delay-line frames, and queues a patch request for the audio output
//! context to apply.

pub mod lexicon;

use crate::asr::WordSegment;
use crate::defaults::{POST_ROLL_SECONDS, PRE_ROLL_SECONDS};
use crate::engine::delay_line::PatchOp;
use crate::engine::gate::PlaybackGate;
use crate::stats::Counters;
use crossbeam_channel::Sender;
use lexicon::{Lexicon, normalize_word};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// How a profane span is rendered inaudible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CensorMode {
    /// Replace the span with silence.
    Mute,
    /// Play the span backwards, attenuated and faded.
    #[default]
    Reverse,
}

impl CensorMode {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            CensorMode::Mute => 0,
            CensorMode::Reverse => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => CensorMode::Mute,
            _ => CensorMode::Reverse,
        }
    }
}

impl From<CensorMode> for PatchOp {
    fn from(mode: CensorMode) -> Self {
        match mode {
            CensorMode::Mute => PatchOp::Mute,
            CensorMode::Reverse => PatchOp::Reverse,
        }
    }
}

/// A censorship request routed from the worker to the audio output context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchRequest {
    /// Absolute delay-line frame range `[start_abs, end_abs)`.
    pub start_abs: u64,
    pub end_abs: u64,
    pub op: PatchOp,
}

/// Scans transcribed words and emits patch requests for profane spans.
pub struct Censor {
    lexicon: Arc<Lexicon>,
    gate: Arc<PlaybackGate>,
    counters: Arc<Counters>,
    patch_tx: Sender<PatchRequest>,
    mode: Arc<AtomicU8>,
    sample_rate: u32,
    chunk_frames: u64,
    quiet: bool,
}

impl Censor {
    pub fn new(
        lexicon: Arc<Lexicon>,
        gate: Arc<PlaybackGate>,
        counters: Arc<Counters>,
        patch_tx: Sender<PatchRequest>,
        mode: Arc<AtomicU8>,
        sample_rate: u32,
        chunk_frames: u64,
        quiet: bool,
    ) -> Self {
        Self {
            lexicon,
            gate,
            counters,
            patch_tx,
            mode,
            sample_rate,
            chunk_frames,
            quiet,
        }
    }

    /// Scan one chunk's words in order and queue patches for every hit.
    ///
    /// `capture_end_pos` is the absolute delay-line write position at chunk
    /// handoff; the chunk covers `[capture_end_pos - K, capture_end_pos)`.
    /// Word order matters: the bigram rule consumes both words of a match,
    /// so a single-word hit never doubles as the first half of a bigram.
    pub fn process_words(&self, words: &[WordSegment], capture_end_pos: u64) {
        let chunk_start_abs = capture_end_pos.saturating_sub(self.chunk_frames);

        let mut i = 0;
        while i < words.len() {
            let word = &words[i];
            let normalized = normalize_word(&word.text);

            if self.lexicon.contains(&normalized) {
                self.emit_hit(&word.text, word.start, word.end, chunk_start_abs);
                i += 1;
            } else if i + 1 < words.len() {
                let next = &words[i + 1];
                let combined = normalize_word(&format!("{}{}", word.text, next.text));
                if self.lexicon.contains(&combined) {
                    let label = format!("{} {}", word.text, next.text);
                    self.emit_hit(&label, word.start, next.end, chunk_start_abs);
                    i += 2;
                } else {
                    i += 1;
                }
            } else {
                i += 1;
            }
        }
    }

    /// Pad, clamp, convert to absolute frames, and queue one hit.
    fn emit_hit(&self, label: &str, start_sec: f64, end_sec: f64, chunk_start_abs: u64) {
        // Policy: while the buffer is running low, letting a word through
        // beats patching samples the read cursor is about to cross.
        if self.gate.is_underrun() {
            self.counters.skipped_hits.fetch_add(1, Ordering::Relaxed);
            if !self.quiet {
                eprintln!("bleepd: \"{label}\" skipped (buffer underrun)");
            }
            return;
        }

        let rate = self.sample_rate as f64;
        let padded_start = (start_sec - PRE_ROLL_SECONDS) * rate;
        let padded_end = (end_sec + POST_ROLL_SECONDS) * rate;

        let start = (padded_start as i64).clamp(0, self.chunk_frames as i64) as u64;
        let end = (padded_end as i64).clamp(start as i64, self.chunk_frames as i64) as u64;
        if end == start {
            return;
        }

        let op = PatchOp::from(CensorMode::from_u8(self.mode.load(Ordering::Acquire)));
        let request = PatchRequest {
            start_abs: chunk_start_abs + start,
            end_abs: chunk_start_abs + end,
            op,
        };

        self.counters.profanity_hits.fetch_add(1, Ordering::Relaxed);
        if !self.quiet {
            eprintln!(
                "bleepd: *** \"{label}\" at {start_sec:.2}s-{end_sec:.2}s, {} frames {:?} ***",
                end - start,
                op,
            );
        }

        // The queue is drained every audio block; if it is somehow full the
        // hit is dropped rather than blocking the worker.
        if self.patch_tx.try_send(request).is_err() {
            self.counters.skipped_hits.fetch_add(1, Ordering::Relaxed);
        }
    }
}
