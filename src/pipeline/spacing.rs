//! Auto-spacing: turn a line's words back into a display string.

use crate::output::Line;

/// Punctuation that attaches to the word before it.
const CLOSING: &[char] = &[',', '.', ';', ':', '!', '?', ')', ']', '}', '»', '›', '”', '’', '·'];

/// Punctuation that attaches to the word after it.
const OPENING: &[char] = &['(', '[', '{', '«', '‹', '„', '“', '‘', '¿', '¡'];

/// Join the resolved word forms of `line` with single spaces.
///
/// No space goes before a word starting with closing punctuation, and none
/// after a word made only of opening punctuation. Pure: the line is not
/// modified and repeated calls give the same string.
pub fn render(line: &Line) -> String {
    let mut out = String::with_capacity(line.cleaned_data.len());
    let mut glue_next = true;

    for word in &line.words {
        let text = word.display();
        let closes = text.starts_with(CLOSING);
        if !glue_next && !closes {
            out.push(' ');
        }
        out.push_str(text);
        glue_next = !text.is_empty() && text.chars().all(|c| OPENING.contains(&c));
    }

    out
}
