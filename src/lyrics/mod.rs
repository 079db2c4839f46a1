//! Lyrics alignment: correct transcribed words against a reference lyric.
//!
//! When a reference lyric is loaded, each chunk's transcription is aligned
//! to it with an edit-distance DP over normalized words. Matched or
//! substituted positions take the lyric's text with the transcription's
//! timing; lyric words missing from the transcription get synthesized
//! timing; stray transcribed words are dropped. The corrected list then
//! feeds profanity matching, so a mumbled slur the lexicon knows from the
//! lyric sheet still gets caught.

use crate::asr::WordSegment;

/// Confidence multiplier for corrected (lyric-sourced) words.
const CORRECTION_CONFIDENCE: f32 = 0.95;
/// Synthesized duration for lyric words absent from the transcription.
const INSERTED_WORD_SECONDS: f64 = 0.3;
/// Confidence for words with synthesized timing.
const INSERTED_CONFIDENCE: f32 = 0.5;

/// Normalize free text: lowercase, keep alphanumerics and whitespace,
/// collapse runs of whitespace to single spaces.
pub fn normalize_text(text: &str) -> String {
    let filtered: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split free text into normalized words.
pub fn split_words(text: &str) -> Vec<String> {
    normalize_text(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Align a chunk's transcription to the reference lyric and return the
/// corrected word list. Returns the transcription unchanged when either
/// side is empty.
pub fn align(transcribed: &[WordSegment], lyrics: &str) -> Vec<WordSegment> {
    if transcribed.is_empty() {
        return transcribed.to_vec();
    }

    let transcript_words: Vec<String> = transcribed
        .iter()
        .map(|seg| normalize_text(&seg.text))
        .collect();
    let lyric_words = split_words(lyrics);
    if lyric_words.is_empty() {
        return transcribed.to_vec();
    }

    let matrix = edit_distance_matrix(&transcript_words, &lyric_words);
    backtrack(&matrix, &transcript_words, &lyric_words, transcribed)
}

/// Standard Levenshtein DP matrix over two word sequences.
fn edit_distance_matrix(seq1: &[String], seq2: &[String]) -> Vec<Vec<usize>> {
    let m = seq1.len();
    let n = seq2.len();
    let mut matrix = vec![vec![0usize; n + 1]; m + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        matrix[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            matrix[i][j] = if seq1[i - 1] == seq2[j - 1] {
                matrix[i - 1][j - 1]
            } else {
                1 + matrix[i - 1][j]
                    .min(matrix[i][j - 1])
                    .min(matrix[i - 1][j - 1])
            };
        }
    }

    matrix
}

/// Walk the matrix bottom-right to top-left and build corrected segments.
fn backtrack(
    matrix: &[Vec<usize>],
    transcript_words: &[String],
    lyric_words: &[String],
    original: &[WordSegment],
) -> Vec<WordSegment> {
    // (transcribed index, lyric index); None on the transcript side marks a
    // lyric insertion.
    let mut alignments: Vec<(Option<usize>, usize)> = Vec::new();
    let mut i = transcript_words.len();
    let mut j = lyric_words.len();

    while i > 0 || j > 0 {
        if i > 0 && j > 0 && transcript_words[i - 1] == lyric_words[j - 1] {
            alignments.push((Some(i - 1), j - 1));
            i -= 1;
            j -= 1;
        } else if i > 0 && j > 0 && matrix[i][j] == matrix[i - 1][j - 1] + 1 {
            // Substitution: lyric word replaces the transcribed one.
            alignments.push((Some(i - 1), j - 1));
            i -= 1;
            j -= 1;
        } else if j > 0 && matrix[i][j] == matrix[i][j - 1] + 1 {
            // Insertion: lyric word with no transcript counterpart.
            alignments.push((None, j - 1));
            j -= 1;
        } else if i > 0 {
            // Deletion: transcribed word with no lyric counterpart; dropped.
            i -= 1;
        }
    }

    alignments.reverse();

    let mut corrected: Vec<WordSegment> = Vec::with_capacity(alignments.len());
    for (transcript_idx, lyric_idx) in alignments {
        match transcript_idx {
            Some(t) => {
                let source = &original[t];
                corrected.push(WordSegment {
                    text: lyric_words[lyric_idx].clone(),
                    start: source.start,
                    end: source.end,
                    confidence: source.confidence * CORRECTION_CONFIDENCE,
                });
            }
            None => {
                let start = corrected.last().map(|seg| seg.end).unwrap_or(0.0);
                corrected.push(WordSegment {
                    text: lyric_words[lyric_idx].clone(),
                    start,
                    end: start + INSERTED_WORD_SECONDS,
                    confidence: INSERTED_CONFIDENCE,
                });
            }
        }
    }

    corrected
}
