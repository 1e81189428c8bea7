//! Substitution table: the ordered (pattern, replacement) rules.
//!
//! ## Resource format
//!
//! One rule per row, two tab-separated columns:
//!
//! ```text
//! pattern	replacement
//! æ	ae
//! ę	ae
//! ū	um
//! \bquum\b	cum
//! ```
//!
//! The header row is optional. No quoting is applied, so patterns may
//! contain `"` freely. Replacements may refer to capture groups as `\1`
//! through `\9`; every other character, `$` included, is literal.
//!
//! ## Rule order
//!
//! Order is significant: each rule runs on the output of the previous one.
//! Duplicate patterns are kept and both fire, which can compound.

use crate::error::ConfigError;
use regex::{Regex, RegexBuilder};
use std::io::Read;
use std::path::Path;
use tracing::debug;

const TABLE_NAME: &str = "substitution table";

/// One compiled substitution rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pattern: String,
    replacement: String,
    regex: Regex,
}

impl Rule {
    /// Compile `pattern` case-insensitively.
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self {
            pattern: pattern.to_string(),
            replacement: translate_replacement(replacement),
            regex,
        })
    }

    /// The pattern as written in the table.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The replacement in `regex` expansion syntax.
    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub(crate) fn regex(&self) -> &Regex {
        &self.regex
    }
}

/// Ordered, immutable list of substitution rules.
///
/// Loaded once at startup and shared read-only for the lifetime of the
/// process.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionTable {
    rules: Vec<Rule>,
}

impl SubstitutionTable {
    /// Load the table from a TSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let table = Self::from_reader(open_table(path)?)?;
        debug!(
            "Loaded {} substitution rules from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parse a table from any TSV source.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ConfigError> {
        let mut rdr = tsv_reader(reader);
        let mut rules = Vec::new();

        for (idx, record) in rdr.records().enumerate() {
            let record = record.map_err(|e| malformed_csv(TABLE_NAME, idx, e))?;
            let row = row_number(&record, idx);

            if is_blank(&record) {
                continue;
            }
            if record.len() != 2 {
                return Err(ConfigError::MalformedRow {
                    table: TABLE_NAME,
                    row,
                    detail: format!(
                        "expected 2 tab-separated columns (pattern, replacement), found {}",
                        record.len()
                    ),
                });
            }
            if idx == 0 && is_header(&record, &["pattern", "replacement"]) {
                continue;
            }
            if record[0].trim().is_empty() {
                return Err(ConfigError::MalformedRow {
                    table: TABLE_NAME,
                    row,
                    detail: "empty pattern".into(),
                });
            }

            let pattern = &record[0];
            let rule = Rule::new(pattern, &record[1]).map_err(|source| {
                ConfigError::InvalidPattern {
                    row,
                    pattern: pattern.to_string(),
                    source,
                }
            })?;
            rules.push(rule);
        }

        Ok(Self { rules })
    }

    /// Build a table from in-memory pairs, in order.
    pub fn from_pairs<I, P, R>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (P, R)>,
        P: AsRef<str>,
        R: AsRef<str>,
    {
        let rules = pairs
            .into_iter()
            .enumerate()
            .map(|(idx, (p, r))| {
                if p.as_ref().trim().is_empty() {
                    return Err(ConfigError::MalformedRow {
                        table: TABLE_NAME,
                        row: idx + 1,
                        detail: "empty pattern".into(),
                    });
                }
                Rule::new(p.as_ref(), r.as_ref()).map_err(|source| ConfigError::InvalidPattern {
                    row: idx + 1,
                    pattern: p.as_ref().to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl<'a> IntoIterator for &'a SubstitutionTable {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

// ── TSV helpers (shared with the macron table) ──────────────────────────────

/// Open a table file, telling a missing file apart from an unreadable one.
pub(crate) fn open_table(path: &Path) -> Result<std::fs::File, ConfigError> {
    std::fs::File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Unreadable {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

pub(crate) fn tsv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quoting(false)
        .flexible(true)
        .from_reader(reader)
}

/// 1-based source line of a record, falling back to its ordinal.
pub(crate) fn row_number(record: &csv::StringRecord, idx: usize) -> usize {
    record
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(idx + 1)
}

pub(crate) fn is_blank(record: &csv::StringRecord) -> bool {
    record.iter().all(|f| f.trim().is_empty())
}

pub(crate) fn is_header(record: &csv::StringRecord, names: &[&str]) -> bool {
    record.len() == names.len()
        && record
            .iter()
            .zip(names)
            .all(|(field, name)| field.trim().eq_ignore_ascii_case(name))
}

pub(crate) fn malformed_csv(table: &'static str, idx: usize, e: csv::Error) -> ConfigError {
    let row = e
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(idx + 1);
    ConfigError::MalformedRow {
        table,
        row,
        detail: e.to_string(),
    }
}

/// Rewrite a table replacement into `regex` expansion syntax: `\N` becomes
/// a group reference and `$` is escaped.
fn translate_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek().copied() {
                Some(d @ '1'..='9') => {
                    chars.next();
                    out.push_str("${");
                    out.push(d);
                    out.push('}');
                }
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                _ => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}
