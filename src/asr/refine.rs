//! Word timestamp refinement.
//!
//! Uniformly distributed word timings (see `synthesize_words`) are a known
//! approximation: real word boundaries rarely fall on an even grid. The
//! refiner nudges each boundary toward the nearest local energy minimum of
//! the chunk, on the assumption that words are separated by dips in the
//! envelope.

use crate::asr::WordSegment;
use crate::defaults::MIN_WORD_SECONDS;

/// How far a boundary may move from its synthesized position, in seconds.
const SEARCH_RADIUS_SECONDS: f64 = 0.12;
/// Candidate step while searching, in seconds.
const SEARCH_HOP_SECONDS: f64 = 0.01;
/// RMS window evaluated at each candidate, in seconds.
const ENERGY_WINDOW_SECONDS: f64 = 0.02;

/// Snaps word boundaries to local energy minima.
pub struct TimestampRefiner {
    sample_rate: u32,
}

impl TimestampRefiner {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Refine one word's boundaries against the mono chunk it came from.
    ///
    /// `chunk` is at the refiner's sample rate (the engine's native rate,
    /// after the optional vocal filter). Boundaries stay inside the chunk
    /// and the word keeps its minimum length.
    pub fn refine(&self, word: &mut WordSegment, chunk: &[f32]) {
        if chunk.is_empty() {
            return;
        }
        let chunk_secs = chunk.len() as f64 / self.sample_rate as f64;

        let start = self.snap_to_energy_minimum(word.start, chunk);
        let end = self.snap_to_energy_minimum(word.end, chunk);

        word.start = start.clamp(0.0, chunk_secs);
        word.end = end
            .clamp(0.0, chunk_secs)
            .max(word.start + MIN_WORD_SECONDS);
    }

    /// Search `±SEARCH_RADIUS` around `boundary_sec` for the lowest-energy
    /// instant and return it.
    fn snap_to_energy_minimum(&self, boundary_sec: f64, chunk: &[f32]) -> f64 {
        let mut best_sec = boundary_sec;
        let mut best_energy = f32::MAX;

        let steps = (SEARCH_RADIUS_SECONDS / SEARCH_HOP_SECONDS) as i64;
        for step in -steps..=steps {
            let candidate = boundary_sec + step as f64 * SEARCH_HOP_SECONDS;
            if candidate < 0.0 {
                continue;
            }
            let Some(energy) = self.window_rms(candidate, chunk) else {
                continue;
            };
            if energy < best_energy {
                best_energy = energy;
                best_sec = candidate;
            }
        }

        best_sec
    }

    /// RMS of a short window centered on `center_sec`, or `None` when the
    /// window falls outside the chunk.
    fn window_rms(&self, center_sec: f64, chunk: &[f32]) -> Option<f32> {
        let rate = self.sample_rate as f64;
        let half = (ENERGY_WINDOW_SECONDS / 2.0 * rate) as i64;
        let center = (center_sec * rate) as i64;

        let lo = center - half;
        let hi = center + half;
        if lo < 0 || hi as usize >= chunk.len() || lo == hi {
            return None;
        }

        let window = &chunk[lo as usize..hi as usize];
        let sum: f32 = window.iter().map(|s| s * s).sum();
        Some((sum / window.len() as f32).sqrt())
    }
}
