//! Whisper token text cleanup.
//!
//! Raw token text carries bracketed annotations ("(music)"), typographic
//! quotes, and punctuation that would break lexicon matching. Cleaning
//! strips parenthesized content, folds curly quotes to ASCII, and keeps
//! only alphanumerics, apostrophes, hyphens, and spaces.

/// Clean one token's text for word matching.
pub fn clean_token_text(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut paren_depth = 0usize;

    for c in text.chars() {
        match c {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            _ if paren_depth > 0 => {}
            // Typographic single quotes → apostrophe.
            '\u{2018}' | '\u{2019}' => cleaned.push('\''),
            // Typographic double quotes → plain quote, filtered below.
            '\u{201C}' | '\u{201D}' => {}
            _ if c.is_ascii_alphanumeric() || c == '\'' || c == '-' || c == ' ' => {
                cleaned.push(c);
            }
            _ => {}
        }
    }

    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_plain_words_through() {
        assert_eq!(clean_token_text("hello"), "hello");
        assert_eq!(clean_token_text(" world"), "world");
    }

    #[test]
    fn strips_parenthesized_content() {
        assert_eq!(clean_token_text("(music)"), "");
        assert_eq!(clean_token_text("word (aside) more"), "word  more");
        assert_eq!(clean_token_text("(nested (deep)) tail"), "tail");
    }

    #[test]
    fn unbalanced_close_paren_is_harmless() {
        assert_eq!(clean_token_text("oops) fine"), "oops fine");
    }

    #[test]
    fn folds_curly_quotes() {
        assert_eq!(clean_token_text("don\u{2019}t"), "don't");
        assert_eq!(clean_token_text("\u{2018}quoted\u{2019}"), "'quoted'");
        assert_eq!(clean_token_text("\u{201C}scare\u{201D}"), "scare");
    }

    #[test]
    fn keeps_hyphens_and_apostrophes() {
        assert_eq!(clean_token_text("re-enter"), "re-enter");
        assert_eq!(clean_token_text("it's"), "it's");
    }

    #[test]
    fn drops_punctuation_and_symbols() {
        assert_eq!(clean_token_text("word!"), "word");
        assert_eq!(clean_token_text("¿qué?"), "qu");
        assert_eq!(clean_token_text("[_BEG_]"), "BEG");
        assert_eq!(clean_token_text("..."), "");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(clean_token_text("  spaced  "), "spaced");
        assert_eq!(clean_token_text(" \t "), "");
    }
}
