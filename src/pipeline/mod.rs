//! Pipeline stages for normalizing a diplomatic transcription.
//!
//! Each submodule implements exactly one transformation step and is
//! independently testable.
//!
//! ## Data Flow
//!
//! ```text
//! raw line ──▶ expand ──▶ tokenize ──▶ macron ──▶ (whole page) linebreak ──▶ spacing
//!              (rules)    (words)      (glyphs)    (merge fragments)         (display)
//! ```
//!
//! 1. [`rules`]     — the ordered substitution table, loaded once
//! 2. [`expand`]    — apply the table to one raw line
//! 3. [`tokenize`]  — split the cleaned line into words with byte spans
//! 4. [`macron`]    — expand marked glyphs, position- and neighbour-aware
//! 5. [`linebreak`] — rejoin words split across lines; strictly sequential
//! 6. [`spacing`]   — render a line for display
//!
//! [`input`] sits in front of all of them and turns PAGE-XML into typed
//! raw lines.

pub mod expand;
pub mod input;
pub mod linebreak;
pub mod macron;
pub mod rules;
pub mod spacing;
pub mod tokenize;
