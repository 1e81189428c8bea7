//! Error types for the manuscript-normalizer library.
//!
//! Three failure modes, three types:
//!
//! * [`ConfigError`] — **Fatal, before any page**: the substitution or
//!   macron resources are missing or malformed. Raised while the
//!   [`crate::Normalizer`] is constructed.
//!
//! * [`ValidationError`] — **Fatal for one page**: the supplied page lacks
//!   the structure the pipeline needs. The whole page is discarded; a
//!   half-built [`crate::Page`] is never returned.
//!
//! * [`ResolutionGap`] — **Non-fatal**: a marked glyph had no expansion in
//!   the macron table. The word passes through unchanged and the gap is
//!   stored on the [`crate::Word`] for later manual review.
//!
//! [`NormalizeError`] is what the top-level entry points return; it wraps
//! the first two plus I/O and builder failures.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the manuscript-normalizer library.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// Rule or macron resources could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A page failed structural validation and was discarded.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Reading an input file failed.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Malformed or missing configuration resources.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The resource file does not exist.
    #[error("Rule table not found: '{path}'")]
    NotFound { path: PathBuf },

    /// The resource exists but could not be read.
    #[error("Failed to read rule table '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A row does not have the expected number of columns or holds an
    /// unknown class name.
    #[error("Malformed row {row} in {table}: {detail}")]
    MalformedRow {
        table: &'static str,
        row: usize,
        detail: String,
    },

    /// A substitution pattern is not a valid regular expression.
    #[error("Invalid pattern '{pattern}' in row {row}: {source}")]
    InvalidPattern {
        row: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A page lacks the structural content the pipeline requires.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{page}: no TextRegions found")]
    NoTextRegions { page: String },

    #[error("{page}: no Baselines found")]
    NoBaselines { page: String },

    #[error("{page}: lines contain no text")]
    NoText { page: String },

    /// Two lines share the same region/line index pair.
    #[error("{page}: duplicate line identifier {id}")]
    DuplicateLine { page: String, id: String },

    /// The markup could not be parsed at all.
    #[error("{page}: malformed PAGE-XML: {detail}")]
    MalformedXml { page: String, detail: String },
}

/// A marked glyph that no macron-table entry could expand.
///
/// Not an error in the `Result` sense: it is attached to the word it was
/// found in and reported alongside the normalized page.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[error("unresolved glyph '{glyph}' ({position}) in word '{word}'")]
pub struct ResolutionGap {
    /// Surface form of the word containing the glyph.
    pub word: String,
    /// The grapheme that could not be expanded.
    pub glyph: String,
    /// Position class of the glyph within the word.
    pub position: crate::pipeline::macron::Position,
}
