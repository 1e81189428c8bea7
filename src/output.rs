//! Output types: the normalized [`Page`] and its [`Line`]s and [`Word`]s.
//!
//! A `Page` is built once per page-processing request and handed to the
//! caller; nothing here is persisted. Every type is serde-serialisable so
//! the CLI can emit the whole structure as JSON.

use crate::error::ResolutionGap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Region index + line index of a line within its page.
///
/// Displayed as `r{region}l{line}`, e.g. `r3l2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId {
    pub region: u32,
    pub line: u32,
}

impl LineId {
    pub fn new(region: u32, line: u32) -> Self {
        Self { region, line }
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("r{}l{}", self.region, self.line))
    }
}

/// How a word came to absorb the first word of the following line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeKind {
    /// The raw line ended with a continuation marker.
    Explicit,
    /// No marker; casing and punctuation suggested a split word.
    /// Best effort, worth a manual check.
    Heuristic,
}

/// A contiguous run of non-space characters of a cleaned line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// Unique within the page: `{line id}w{n}`, `n` counted from 1.
    pub id: String,
    /// Form after substitution, before macron resolution.
    pub surface: String,
    /// Form after macron resolution (and linebreak merging).
    pub resolved: String,
    /// Byte range of the word as tokenized in its own line's
    /// `cleaned_data`. After a linebreak merge it still covers only the
    /// first fragment, marker included; the absorbed text lives on the
    /// next line.
    pub span: Range<usize>,
    /// Marked glyphs the macron table could not expand.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub gaps: Vec<ResolutionGap>,
    /// Set when this word absorbed the first word of the next line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged: Option<MergeKind>,
}

impl Word {
    /// A freshly tokenized word; `resolved` starts equal to `surface`.
    pub fn new(id: impl Into<String>, surface: impl Into<String>, span: Range<usize>) -> Self {
        let surface = surface.into();
        Self {
            id: id.into(),
            resolved: surface.clone(),
            surface,
            span,
            gaps: Vec::new(),
            merged: None,
        }
    }

    /// The form shown to readers.
    pub fn display(&self) -> &str {
        &self.resolved
    }
}

/// One transcription line after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    pub id: LineId,
    /// Untouched source text.
    pub raw_data: String,
    /// Text after the substitution rules.
    pub cleaned_data: String,
    /// Words in reading order. May be empty after a linebreak merge.
    pub words: Vec<Word>,
}

/// Record of one linebreak merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Merge {
    pub kind: MergeKind,
    /// Id of the surviving word (the first fragment).
    pub word: String,
    /// Id of the word that was consumed and no longer exists.
    pub consumed: String,
    /// Line holding the surviving word.
    pub from: LineId,
    /// Line the consumed word was taken from.
    pub into: LineId,
}

/// A normalized page: ordered lines plus what the linebreak stage did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Where the page came from (file name or caller-supplied label).
    pub source: String,
    pub lines: Vec<Line>,
    #[serde(default)]
    pub merges: Vec<Merge>,
}

impl Page {
    /// All resolution gaps on the page, in reading order.
    pub fn gaps(&self) -> impl Iterator<Item = &ResolutionGap> {
        self.lines
            .iter()
            .flat_map(|l| l.words.iter())
            .flat_map(|w| w.gaps.iter())
    }

    pub fn stats(&self) -> PageStats {
        PageStats {
            lines: self.lines.len(),
            words: self.lines.iter().map(|l| l.words.len()).sum(),
            merges: self.merges.len(),
            heuristic_merges: self
                .merges
                .iter()
                .filter(|m| m.kind == MergeKind::Heuristic)
                .count(),
            gaps: self.gaps().count(),
        }
    }
}

/// Counters summarising one normalized page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStats {
    pub lines: usize,
    pub words: usize,
    pub merges: usize,
    pub heuristic_merges: usize,
    pub gaps: usize,
}

/// Outcome of normalizing one input file in a batch.
///
/// A page that failed validation carries `error` and no `page`; partial
/// pages are never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    pub source: String,
    pub page: Option<Page>,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::macron::Position;

    #[test]
    fn line_id_display() {
        assert_eq!(LineId::new(3, 2).to_string(), "r3l2");
        assert_eq!(format!("{:>8}|", LineId::new(3, 2)), "    r3l2|");
    }

    #[test]
    fn new_word_resolves_to_surface() {
        let w = Word::new("r0l0w1", "Christum", 0..8);
        assert_eq!(w.display(), "Christum");
        assert!(w.gaps.is_empty());
        assert!(w.merged.is_none());
    }

    #[test]
    fn stats_count_gaps_and_merges() {
        let mut w = Word::new("r0l0w1", "dñs", 0..4);
        w.gaps.push(ResolutionGap {
            word: "dñs".into(),
            glyph: "ñ".into(),
            position: Position::Medial,
        });
        let page = Page {
            source: "test".into(),
            lines: vec![
                Line {
                    id: LineId::new(0, 0),
                    raw_data: "dñs".into(),
                    cleaned_data: "dñs".into(),
                    words: vec![w],
                },
                Line {
                    id: LineId::new(0, 1),
                    raw_data: String::new(),
                    cleaned_data: String::new(),
                    words: vec![],
                },
            ],
            merges: vec![Merge {
                kind: MergeKind::Heuristic,
                word: "r0l0w1".into(),
                consumed: "r0l1w1".into(),
                from: LineId::new(0, 0),
                into: LineId::new(0, 1),
            }],
        };

        let stats = page.stats();
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.words, 1);
        assert_eq!(stats.gaps, 1);
        assert_eq!(stats.merges, 1);
        assert_eq!(stats.heuristic_merges, 1);
    }

    #[test]
    fn json_skips_empty_gaps() {
        let w = Word::new("r0l0w1", "et", 0..2);
        let json = serde_json::to_string(&w).unwrap();
        assert!(!json.contains("gaps"));
        assert!(!json.contains("merged"));
    }
}
