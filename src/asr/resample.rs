//! Linear-interpolation resampling for recognizer input.
//!
//! Quality is deliberately modest: the target is 16 kHz speech for Whisper,
//! not hi-fi playback, and the linear kernel runs well within budget on
//! small ARM boards.

/// Resample `input` from `from_rate` to `to_rate` by linear interpolation.
pub fn linear_resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || input.is_empty() {
        return input.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (input.len() as f64 / ratio) as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = source_pos as usize;
            let fraction = (source_pos - source_idx as f64) as f32;

            if source_idx + 1 < input.len() {
                input[source_idx] * (1.0 - fraction) + input[source_idx + 1] * fraction
            } else {
                input[input.len() - 1]
            }
        })
        .collect()
}
