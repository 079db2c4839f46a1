//! Vocal-band emphasis prefilter.
//!
//! Applied to the mono chunk before recognition when enabled. Music content
//! buries vocals under bass and cymbal energy that Whisper was not trained
//! to ignore; rolling off both ends of the spectrum measurably improves
//! word recall on song input. Two cascaded one-pole RC sections: a
//! high-pass to drop bass/rumble, a low-pass to drop hiss and cymbals.

use std::f32::consts::TAU;

/// High-pass corner: below typical vocal fundamentals.
const HIGHPASS_HZ: f32 = 120.0;
/// Low-pass corner: above the consonant band Whisper relies on.
const LOWPASS_HZ: f32 = 6_000.0;

/// One-shot vocal emphasis filter for analysis chunks.
///
/// Stateless between chunks: each chunk is filtered from a zeroed state,
/// which is fine at a 5 s window length.
pub struct VocalFilter {
    highpass_coeff: f32,
    lowpass_coeff: f32,
}

impl VocalFilter {
    pub fn new(sample_rate: u32) -> Self {
        let dt = 1.0 / sample_rate as f32;
        let rc_high = 1.0 / (TAU * HIGHPASS_HZ);
        let rc_low = 1.0 / (TAU * LOWPASS_HZ);
        Self {
            highpass_coeff: rc_high / (rc_high + dt),
            lowpass_coeff: dt / (rc_low + dt),
        }
    }

    /// Filter `buffer` in place.
    pub fn process(&self, buffer: &mut [f32]) {
        // High-pass: y[n] = a * (y[n-1] + x[n] - x[n-1])
        let mut prev_in = 0.0f32;
        let mut prev_out = 0.0f32;
        for sample in buffer.iter_mut() {
            let x = *sample;
            prev_out = self.highpass_coeff * (prev_out + x - prev_in);
            prev_in = x;
            *sample = prev_out;
        }

        // Low-pass: y[n] = y[n-1] + a * (x[n] - y[n-1])
        let mut state = 0.0f32;
        for sample in buffer.iter_mut() {
            state += self.lowpass_coeff * (*sample - state);
            *sample = state;
        }
    }
}
