//! Profanity lexicon: a normalized set-membership oracle.
//!
//! The lexicon file is UTF-8 text with one token per line; blank lines and
//! `#` comments are ignored. Every token is normalized on load with the
//! same function used at match time, so lookups are exact string matches.
//! Multi-word profanities must appear as concatenated forms ("holycow"),
//! which is how the censor probes bigrams.

use crate::error::{BleepdError, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Normalize a token for lexicon matching: lowercase, then keep only ASCII
/// alphanumerics and spaces.
pub fn normalize_word(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

/// In-memory profanity lexicon, loaded once at startup.
pub struct Lexicon {
    words: HashSet<String>,
}

impl Lexicon {
    /// Load a lexicon from a newline-delimited file.
    ///
    /// # Errors
    /// Returns `BleepdError::LexiconNotFound` if the file is missing and
    /// `BleepdError::LexiconLoad` if it cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BleepdError::LexiconNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let contents = fs::read_to_string(path).map_err(|e| BleepdError::LexiconLoad {
            message: format!("{}: {}", path.display(), e),
        })?;

        Ok(Self::from_lines(contents.lines()))
    }

    /// Build a lexicon from raw lines (used by `load` and by tests).
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let words = lines
            .into_iter()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(normalize_word)
            .filter(|word| !word.is_empty())
            .collect();
        Self { words }
    }

    /// Exact membership test. The input must already be normalized.
    #[inline]
    pub fn contains(&self, normalized: &str) -> bool {
        self.words.contains(normalized)
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
