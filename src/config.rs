//! Configuration types for page normalization.
//!
//! Every knob lives in [`NormalizerConfig`], built via its
//! [`NormalizerConfigBuilder`]. Rule resources are named here but loaded
//! only once, when the [`crate::Normalizer`] is constructed.

use crate::error::NormalizeError;
use crate::pipeline::input::RegionKind;
use crate::pipeline::linebreak::DEFAULT_MARKERS;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// Default location of the substitution table.
pub const DEFAULT_RULES_PATH: &str = "replacement_table.tsv";

/// Configuration for a [`crate::Normalizer`].
///
/// # Example
/// ```rust
/// use manuscript_normalizer::{NormalizerConfig, RegionKind};
///
/// let config = NormalizerConfig::builder()
///     .rules_path("data/replacement_table.tsv")
///     .region_filter(vec![RegionKind::Paragraph, RegionKind::Heading])
///     .heuristic_linebreaks(true)
///     .build()
///     .unwrap();
/// assert!(config.accepts(&RegionKind::Heading));
/// ```
#[derive(Clone)]
pub struct NormalizerConfig {
    /// TSV substitution table. Default: `replacement_table.tsv`.
    pub rules_path: Option<PathBuf>,

    /// TSV macron table. If None, the built-in table is used, which only
    /// knows word-final `ū` → `um`.
    pub macron_table_path: Option<PathBuf>,

    /// Region kinds whose lines are normalized. Empty accepts every
    /// region. Default: paragraphs only.
    pub region_filter: Vec<RegionKind>,

    /// Glyphs that mark a word continued on the next line.
    /// Default: `-`, `¬`, `=`, `⸗`, `‐`.
    pub continuation_markers: Vec<char>,

    /// Also merge unmarked line ends when casing suggests a split word.
    /// Default: false.
    ///
    /// Latin prose rarely starts a line with a capital, so this guesses
    /// wrong often enough that every heuristic merge is flagged.
    pub heuristic_linebreaks: bool,

    /// Per-page events for batch runs.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            rules_path: Some(PathBuf::from(DEFAULT_RULES_PATH)),
            macron_table_path: None,
            region_filter: vec![RegionKind::Paragraph],
            continuation_markers: DEFAULT_MARKERS.to_vec(),
            heuristic_linebreaks: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for NormalizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizerConfig")
            .field("rules_path", &self.rules_path)
            .field("macron_table_path", &self.macron_table_path)
            .field("region_filter", &self.region_filter)
            .field("continuation_markers", &self.continuation_markers)
            .field("heuristic_linebreaks", &self.heuristic_linebreaks)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn NormalizeProgressCallback>"),
            )
            .finish()
    }
}

impl NormalizerConfig {
    /// Create a new builder for `NormalizerConfig`.
    pub fn builder() -> NormalizerConfigBuilder {
        NormalizerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Whether lines of a region of this kind go through the pipeline.
    pub fn accepts(&self, kind: &RegionKind) -> bool {
        self.region_filter.is_empty() || self.region_filter.contains(kind)
    }
}

/// Builder for [`NormalizerConfig`].
#[derive(Debug)]
pub struct NormalizerConfigBuilder {
    config: NormalizerConfig,
}

impl NormalizerConfigBuilder {
    pub fn rules_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.rules_path = Some(path.into());
        self
    }

    pub fn macron_table_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.macron_table_path = Some(path.into());
        self
    }

    pub fn region_filter(mut self, kinds: Vec<RegionKind>) -> Self {
        self.config.region_filter = kinds;
        self
    }

    /// Normalize lines of every region regardless of classification.
    pub fn all_regions(mut self) -> Self {
        self.config.region_filter.clear();
        self
    }

    pub fn continuation_markers(mut self, markers: Vec<char>) -> Self {
        self.config.continuation_markers = markers;
        self
    }

    pub fn heuristic_linebreaks(mut self, v: bool) -> Self {
        self.config.heuristic_linebreaks = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<NormalizerConfig, NormalizeError> {
        let c = &self.config;
        if c.rules_path.is_none() {
            return Err(NormalizeError::InvalidConfig(
                "A substitution table path is required".into(),
            ));
        }
        if c.continuation_markers.is_empty() {
            return Err(NormalizeError::InvalidConfig(
                "At least one continuation marker is required".into(),
            ));
        }
        if let Some(bad) = c
            .continuation_markers
            .iter()
            .find(|m| m.is_alphanumeric() || m.is_whitespace())
        {
            return Err(NormalizeError::InvalidConfig(format!(
                "Continuation marker {bad:?} must be punctuation, not a letter, digit or space"
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = NormalizerConfig::default();
        assert_eq!(c.rules_path, Some(PathBuf::from(DEFAULT_RULES_PATH)));
        assert!(c.accepts(&RegionKind::Paragraph));
        assert!(!c.accepts(&RegionKind::Marginalia));
        assert!(!c.heuristic_linebreaks);
        assert!(c.continuation_markers.contains(&'-'));
    }

    #[test]
    fn test_all_regions() {
        let c = NormalizerConfig::builder().all_regions().build().unwrap();
        assert!(c.accepts(&RegionKind::Marginalia));
        assert!(c.accepts(&RegionKind::Other("stamp".into())));
    }

    #[test]
    fn test_empty_markers_rejected() {
        let err = NormalizerConfig::builder()
            .continuation_markers(vec![])
            .build()
            .unwrap_err();
        assert!(matches!(err, NormalizeError::InvalidConfig(_)));
    }

    #[test]
    fn test_letter_marker_rejected() {
        let err = NormalizerConfig::builder()
            .continuation_markers(vec!['-', 'q'])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("'q'"), "got: {err}");
    }

    #[test]
    fn test_debug_hides_callback() {
        let c = NormalizerConfig::default();
        let dbg = format!("{c:?}");
        assert!(dbg.contains("rules_path"));
    }
}
