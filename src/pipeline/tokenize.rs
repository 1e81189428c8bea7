//! Tokenizer: split a cleaned line into [`Word`]s.
//!
//! Words are maximal runs of non-whitespace. Punctuation stays attached to
//! the word it touches; the spacing stage relies on that to avoid putting a
//! space in front of a comma.

use crate::output::{LineId, Word};

/// Split `cleaned` on runs of Unicode whitespace.
///
/// Word ids are `{line}w{n}` with `n` counted from 1, and each word's
/// span points back into `cleaned`. An empty or blank line yields no words.
pub fn tokenize(cleaned: &str, line: LineId) -> Vec<Word> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for (i, c) in cleaned.char_indices() {
        match (c.is_whitespace(), start) {
            (true, Some(s)) => {
                push_word(&mut words, cleaned, line, s..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        push_word(&mut words, cleaned, line, s..cleaned.len());
    }

    words
}

fn push_word(words: &mut Vec<Word>, cleaned: &str, line: LineId, span: std::ops::Range<usize>) {
    let id = format!("{}w{}", line, words.len() + 1);
    words.push(Word::new(id, &cleaned[span.clone()], span));
}
