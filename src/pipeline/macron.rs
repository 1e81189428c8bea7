//! Macron resolution: expand marked glyphs into standard orthography.
//!
//! A *marked glyph* is a grapheme carrying a historic length or
//! abbreviation mark: a precomposed macron/tilde vowel (`ū`, `ã`) or any
//! letter followed by a combining tilde, macron or overline (`q̄`, `m̃`).
//! Glyphs listed in the table count as marked too.
//!
//! The same glyph can expand differently depending on where it sits, so
//! the lookup key is (glyph, position class, preceding-letter class). The
//! expansions themselves are linguistic policy supplied as a TSV resource:
//!
//! ```text
//! glyph	position	neighbour	expansion
//! ū	final	any	um
//! ā	medial	consonant	an
//! ```
//!
//! `position` is `final`, `medial` or `any`; `neighbour` is `vowel`,
//! `consonant`, `any` or a single letter. The most specific matching row
//! wins; equally specific rows resolve in file order.

use crate::error::{ConfigError, ResolutionGap};
use crate::output::Word;
use crate::pipeline::rules::{is_blank, malformed_csv, open_table, row_number, tsv_reader};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use unicode_segmentation::UnicodeSegmentation;

const TABLE_NAME: &str = "macron table";

const COMBINING_MARKS: [char; 3] = ['\u{0303}', '\u{0304}', '\u{0305}'];

/// Precomposed marked vowels and their unmarked base.
const MARKED_VOWELS: [(char, char); 13] = [
    ('ā', 'a'),
    ('ē', 'e'),
    ('ī', 'i'),
    ('ō', 'o'),
    ('ū', 'u'),
    ('ȳ', 'y'),
    ('ǣ', 'æ'),
    ('ã', 'a'),
    ('ẽ', 'e'),
    ('ĩ', 'i'),
    ('õ', 'o'),
    ('ũ', 'u'),
    ('ỹ', 'y'),
];

const VOWELS: &str = "aeiouyæœ";

/// Where a glyph sits inside its word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// The last letter of the word; trailing punctuation is ignored.
    Final,
    /// Any other letter position.
    Medial,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Final => f.write_str("final"),
            Position::Medial => f.write_str("medial"),
        }
    }
}

/// Class of the letter preceding a glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbour {
    Any,
    Vowel,
    Consonant,
    /// A specific (lowercase) letter.
    Letter(char),
}

impl Neighbour {
    fn matches(self, prev: Option<char>) -> bool {
        match (self, prev) {
            (Neighbour::Any, _) => true,
            (_, None) => false,
            (Neighbour::Vowel, Some(c)) => is_vowel(c),
            (Neighbour::Consonant, Some(c)) => c.is_alphabetic() && !is_vowel(c),
            (Neighbour::Letter(l), Some(c)) => l == c,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Neighbour::Any => 0,
            Neighbour::Vowel | Neighbour::Consonant => 1,
            Neighbour::Letter(_) => 2,
        }
    }
}

/// One row of the macron table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacronEntry {
    /// Lowercase glyph.
    pub glyph: String,
    /// `None` matches any position.
    pub position: Option<Position>,
    pub neighbour: Neighbour,
    pub expansion: String,
}

impl MacronEntry {
    pub fn new(
        glyph: &str,
        position: Option<Position>,
        neighbour: Neighbour,
        expansion: impl Into<String>,
    ) -> Self {
        Self {
            glyph: glyph.to_lowercase(),
            position,
            neighbour,
            expansion: expansion.into(),
        }
    }

    fn specificity(&self) -> u8 {
        self.neighbour.rank() * 2 + u8::from(self.position.is_some())
    }
}

/// Lookup table of (glyph, position, neighbour) → expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacronTable {
    entries: Vec<MacronEntry>,
}

impl MacronTable {
    /// The only mapping that holds without a curated table: word-final `ū`
    /// stands for `um`.
    pub fn builtin() -> Self {
        Self {
            entries: vec![MacronEntry::new(
                "ū",
                Some(Position::Final),
                Neighbour::Any,
                "um",
            )],
        }
    }

    pub fn from_entries(entries: Vec<MacronEntry>) -> Self {
        Self { entries }
    }

    /// Load a table from a TSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let table = Self::from_reader(open_table(path)?)?;
        debug!(
            "Loaded {} macron entries from {}",
            table.entries.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse a table from any TSV source.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut rdr = tsv_reader(reader);
        let mut entries = Vec::new();

        for (idx, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| malformed_csv(TABLE_NAME, idx, e))?;
            let row = row_number(&record, idx);
            let malformed = |detail: String| ConfigError::MalformedRow {
                table: TABLE_NAME,
                row,
                detail,
            };

            if is_blank(&record) {
                continue;
            }
            if record.len() != 4 {
                return Err(malformed(format!(
                    "expected 4 tab-separated columns (glyph, position, neighbour, expansion), found {}",
                    record.len()
                )));
            }
            if idx == 0 && record[0].trim().eq_ignore_ascii_case("glyph") {
                continue;
            }

            let glyph = record[0].trim();
            if glyph.graphemes(true).count() != 1 {
                return Err(malformed(format!(
                    "glyph '{glyph}' must be a single character"
                )));
            }
            let position = parse_position(record[1].trim()).map_err(&malformed)?;
            let neighbour = parse_neighbour(record[2].trim()).map_err(&malformed)?;
            entries.push(MacronEntry::new(glyph, position, neighbour, &record[3]));
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[MacronEntry] {
        &self.entries
    }

    fn contains_glyph(&self, glyph: &str) -> bool {
        self.entries.iter().any(|e| e.glyph == glyph)
    }

    /// Most specific entry for `glyph` (lowercase) at `position` after
    /// `prev`.
    pub fn lookup(&self, glyph: &str, position: Position, prev: Option<char>) -> Option<&MacronEntry> {
        let mut best: Option<&MacronEntry> = None;
        for entry in &self.entries {
            let applies = entry.glyph == glyph
                && entry.position.is_none_or(|p| p == position)
                && entry.neighbour.matches(prev);
            if applies && best.is_none_or(|b| entry.specificity() > b.specificity()) {
                best = Some(entry);
            }
        }
        best
    }
}

fn parse_position(s: &str) -> Result<Option<Position>, String> {
    match s.to_lowercase().as_str() {
        "any" | "*" => Ok(None),
        "final" => Ok(Some(Position::Final)),
        "medial" => Ok(Some(Position::Medial)),
        other => Err(format!(
            "unknown position '{other}' (expected final, medial or any)"
        )),
    }
}

fn parse_neighbour(s: &str) -> Result<Neighbour, String> {
    let lower = s.to_lowercase();
    match lower.as_str() {
        "any" | "*" => return Ok(Neighbour::Any),
        "vowel" => return Ok(Neighbour::Vowel),
        "consonant" => return Ok(Neighbour::Consonant),
        _ => {}
    }
    let mut chars = lower.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphabetic() => Ok(Neighbour::Letter(c)),
        _ => Err(format!(
            "unknown neighbour '{s}' (expected vowel, consonant, any or a single letter)"
        )),
    }
}

// ── Resolver ─────────────────────────────────────────────────────────────────

/// Applies a [`MacronTable`] word by word.
///
/// Stateless apart from the shared table; words never influence each other.
#[derive(Debug, Clone)]
pub struct MacronResolver {
    table: Arc<MacronTable>,
}

impl MacronResolver {
    pub fn new(table: Arc<MacronTable>) -> Self {
        Self { table }
    }

    /// Resolve every word. Count and order are unchanged.
    pub fn resolve(&self, words: Vec<Word>) -> Vec<Word> {
        words.into_iter().map(|w| self.resolve_word(w)).collect()
    }

    /// Compute `resolved` from `surface`, recording any unresolved glyphs.
    pub fn resolve_word(&self, mut word: Word) -> Word {
        let graphemes: Vec<&str> = word.surface.graphemes(true).collect();
        let last_letter = graphemes.iter().rposition(|g| self.is_letter(g));
        let all_upper = is_all_uppercase(&word.surface);

        let mut resolved = String::with_capacity(word.surface.len() + 4);
        let mut gaps = Vec::new();
        let mut prev: Option<char> = None;

        for (i, g) in graphemes.iter().enumerate() {
            let first = g.chars().next().unwrap_or(' ');

            if self.is_marked(g) {
                let position = if Some(i) == last_letter {
                    Position::Final
                } else {
                    Position::Medial
                };
                match self.table.lookup(&g.to_lowercase(), position, prev) {
                    Some(entry) => {
                        resolved.push_str(&match_case(&entry.expansion, first.is_uppercase(), all_upper));
                    }
                    None => {
                        let gap = ResolutionGap {
                            word: word.surface.clone(),
                            glyph: (*g).to_string(),
                            position,
                        };
                        warn!("{} [{}]", gap, word.id);
                        gaps.push(gap);
                        resolved.push_str(g);
                    }
                }
            } else {
                resolved.push_str(g);
            }

            if self.is_letter(g) {
                prev = first.to_lowercase().next().map(unmarked);
            }
        }

        word.resolved = resolved;
        word.gaps = gaps;
        word
    }

    /// Alphabetic, or a glyph the table knows (e.g. Tironian `⁊`).
    fn is_letter(&self, grapheme: &str) -> bool {
        grapheme.chars().next().is_some_and(char::is_alphabetic)
            || self.table.contains_glyph(&grapheme.to_lowercase())
    }

    fn is_marked(&self, grapheme: &str) -> bool {
        grapheme.chars().any(|c| COMBINING_MARKS.contains(&c))
            || grapheme
                .chars()
                .next()
                .is_some_and(|c| MARKED_VOWELS.iter().any(|&(m, _)| c.to_lowercase().eq([m])))
            || self.table.contains_glyph(&grapheme.to_lowercase())
    }
}

fn is_vowel(c: char) -> bool {
    VOWELS.contains(unmarked(c))
}

/// Strip a precomposed mark from a lowercase vowel.
fn unmarked(c: char) -> char {
    MARKED_VOWELS
        .iter()
        .find(|&&(m, _)| m == c)
        .map(|&(_, base)| base)
        .unwrap_or(c)
}

fn is_all_uppercase(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() > 1 && letters.iter().all(|c| c.is_uppercase())
}

fn match_case(expansion: &str, upper_glyph: bool, all_upper: bool) -> String {
    if !upper_glyph {
        return expansion.to_string();
    }
    if all_upper {
        return expansion.to_uppercase();
    }
    let mut chars = expansion.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
