//! Speech recognition: the Whisper worker and its supporting passes.
//!
//! The recognizer yields segment-level timings only; per-word timestamps
//! are synthesized here by distributing each segment's cleaned tokens
//! uniformly across its interval, then optionally refined against the
//! audio's energy envelope.

pub mod recognizer;
pub mod refine;
pub mod resample;
pub mod text;
pub mod vocal;
pub mod worker;

use crate::defaults::MIN_WORD_SECONDS;
use recognizer::RawSegment;
use text::clean_token_text;

/// One recognized word with timing inside its chunk.
///
/// `start` and `end` are seconds relative to the chunk start, in
/// `[0, chunk_secs]`. Never stored beyond the chunk that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct WordSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
    pub confidence: f32,
}

/// Confidence assigned to words with recognizer-backed timing.
const SYNTHESIZED_CONFIDENCE: f32 = 0.9;

/// Turn raw recognizer segments into per-word segments.
///
/// Tokens at or past `end_of_transcript_id` are dropped, the rest are
/// cleaned; each segment's surviving words share its `[t0, t1]` interval
/// uniformly. Boundaries are clamped to `[0, chunk_secs]` with a minimum
/// word length of 50 ms.
pub fn synthesize_words(
    segments: &[RawSegment],
    end_of_transcript_id: i32,
    chunk_secs: f64,
) -> Vec<WordSegment> {
    let mut words = Vec::new();

    for segment in segments {
        let seg_start = segment.start_cs as f64 * 0.01;
        let seg_end = segment.end_cs as f64 * 0.01;

        let cleaned: Vec<String> = segment
            .tokens
            .iter()
            .filter(|token| token.id < end_of_transcript_id)
            .map(|token| clean_token_text(&token.text))
            .filter(|text| !text.is_empty())
            .collect();

        if cleaned.is_empty() {
            continue;
        }

        let word_duration = (seg_end - seg_start) / cleaned.len() as f64;
        for (k, text) in cleaned.into_iter().enumerate() {
            let raw_start = seg_start + k as f64 * word_duration;
            let raw_end = raw_start + word_duration;

            let start = raw_start.clamp(0.0, chunk_secs);
            let end = (start + MIN_WORD_SECONDS).max(raw_end.min(chunk_secs));

            words.push(WordSegment {
                text,
                start,
                end,
                confidence: SYNTHESIZED_CONFIDENCE,
            });
        }
    }

    words
}
