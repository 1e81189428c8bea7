//! Linebreak resolution: rejoin words split across two transcription lines.
//!
//! Lines are visited top to bottom. For each adjacent pair the last word of
//! the upper line is a *fragment* when
//!
//! 1. the upper line's raw text ends with a continuation marker (`-`, `¬`,
//!    `=`, `⸗` by default), or
//! 2. heuristics are enabled, the fragment ends in a letter, and the lower
//!    line's first word starts with a lowercase letter.
//!
//! The fragment (marker stripped) absorbs the lower line's first word and
//! keeps its own id; the absorbed word disappears. Merges are recorded on
//! the page, heuristic ones flagged as such.
//!
//! A line gives up at most one word, its first. When that empties a line
//! whose raw text itself ended with a marker (`con-` / `stan-` /
//! `tinopolis`), the surviving word is still a fragment and goes on to
//! absorb the first word of the line after. Emptied lines stay in place
//! with no words.

use crate::output::{Merge, MergeKind, Page, Word};
use tracing::debug;

/// Default continuation markers.
pub const DEFAULT_MARKERS: [char; 5] = ['-', '¬', '=', '⸗', '\u{2010}'];

#[derive(Debug, Clone)]
pub struct LinebreakResolver {
    markers: Vec<char>,
    heuristic: bool,
}

impl Default for LinebreakResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MARKERS.to_vec(), false)
    }
}

impl LinebreakResolver {
    pub fn new(markers: Vec<char>, heuristic: bool) -> Self {
        Self { markers, heuristic }
    }

    /// Merge split words across the whole page, in place.
    pub fn resolve(&self, page: &mut Page) {
        // Line holding a fragment that continues past an emptied line.
        let mut carry: Option<usize> = None;

        for i in 1..page.lines.len() {
            let host = carry.take().unwrap_or(i - 1);
            let (head, tail) = page.lines.split_at_mut(i);
            let marked = self.ends_with_marker(&head[i - 1].raw_data);
            let upper = &mut head[host];
            let lower = &mut tail[0];

            let (Some(last), Some(first)) = (upper.words.last(), lower.words.first()) else {
                continue;
            };
            let Some(kind) = self.detect(last, marked, first) else {
                continue;
            };
            let Some(fragment) = upper.words.last_mut() else {
                continue;
            };
            let consumed = lower.words.remove(0);

            if kind == MergeKind::Explicit {
                let surface_len = fragment.surface.trim_end_matches(self.markers.as_slice()).len();
                fragment.surface.truncate(surface_len);
                let resolved_len = fragment.resolved.trim_end_matches(self.markers.as_slice()).len();
                fragment.resolved.truncate(resolved_len);
            }
            fragment.surface.push_str(&consumed.surface);
            fragment.resolved.push_str(&consumed.resolved);
            fragment.gaps.extend(consumed.gaps);
            fragment.merged = Some(kind);

            debug!(
                "{:?} merge {} + {} -> '{}'",
                kind, fragment.id, consumed.id, fragment.resolved
            );
            page.merges.push(Merge {
                kind,
                word: fragment.id.clone(),
                consumed: consumed.id,
                from: upper.id,
                into: lower.id,
            });

            if lower.words.is_empty() && self.ends_with_marker(&lower.raw_data) {
                carry = Some(host);
            }
        }
    }

    /// `marked`: the line just above `first` ended with a continuation marker.
    fn detect(&self, last: &Word, marked: bool, first: &Word) -> Option<MergeKind> {
        if marked {
            // A marker standing alone is a dash, not a hyphenated fragment.
            let stem = last.resolved.trim_end_matches(self.markers.as_slice());
            return (!stem.is_empty()).then_some(MergeKind::Explicit);
        }

        let open_ending = last.resolved.chars().last().is_some_and(char::is_alphabetic);
        let lowercase_start = first.resolved.chars().next().is_some_and(char::is_lowercase);
        (self.heuristic && open_ending && lowercase_start).then_some(MergeKind::Heuristic)
    }

    fn ends_with_marker(&self, raw: &str) -> bool {
        raw.trim_end()
            .chars()
            .last()
            .is_some_and(|c| self.markers.contains(&c))
    }
}
