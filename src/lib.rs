//! # manuscript-normalizer
//!
//! Normalize diplomatic transcriptions of Latin manuscripts and early
//! prints into modern, searchable reading text.
//!
//! A diplomatic transcription keeps every glyph of the source: `ę` for
//! `ae`, a macron over `u` for an omitted `m`, words broken across lines
//! with a hyphen or `¬`. This crate turns such lines into clean words while
//! keeping the raw text and the line identifiers, so every normalized word
//! can be traced back to where it stands on the page.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PAGE-XML
//!  │
//!  ├─ 1. Input      parse TextRegions/TextLines, validate, filter regions
//!  ├─ 2. Expand     ordered case-insensitive substitution table
//!  ├─ 3. Tokenize   whitespace split, byte spans, ids `r{R}l{L}w{N}`
//!  ├─ 4. Macrons    position- and neighbour-aware glyph expansion
//!  ├─ 5. Linebreaks rejoin words split across lines (sequential)
//!  └─ 6. Render     punctuation-aware spacing, at display time
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use manuscript_normalizer::{Normalizer, NormalizerConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = NormalizerConfig::builder()
//!         .rules_path("data/replacement_table.tsv")
//!         .build()?;
//!     let normalizer = Normalizer::new(config)?;
//!     let page = normalizer.normalize_file("page_0001.xml")?;
//!     for line in &page.lines {
//!         println!("{:>8} {}", line.id, normalizer.render(line));
//!     }
//!     eprintln!("{} unresolved glyphs", page.gaps().count());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `msnorm` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! manuscript-normalizer = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{NormalizerConfig, NormalizerConfigBuilder, DEFAULT_RULES_PATH};
pub use error::{ConfigError, NormalizeError, ResolutionGap, ValidationError};
pub use normalize::Normalizer;
pub use output::{Line, LineId, Merge, MergeKind, Page, PageResult, PageStats, Word};
pub use pipeline::expand::expand;
pub use pipeline::input::{parse_page_xml, read_page_xml, RawLine, RawPage, RegionKind};
pub use pipeline::linebreak::LinebreakResolver;
pub use pipeline::macron::{MacronEntry, MacronResolver, MacronTable, Neighbour, Position};
pub use pipeline::rules::{Rule, SubstitutionTable};
pub use pipeline::spacing::render;
pub use pipeline::tokenize::tokenize;
pub use progress::{NoopProgressCallback, NormalizeProgressCallback, ProgressCallback};
