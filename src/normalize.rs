//! The [`Normalizer`]: loads the rule resources once and runs pages through
//! every pipeline stage.
//!
//! Per line: expand → tokenize → resolve macrons. Per page, once every line
//! is built: resolve linebreaks. Rendering for display is left to the
//! caller via [`Normalizer::render`], at the moment of display.

use crate::config::NormalizerConfig;
use crate::error::NormalizeError;
use crate::output::{Line, Page, PageResult};
use crate::pipeline::input::{self, RawLine, RawPage};
use crate::pipeline::linebreak::LinebreakResolver;
use crate::pipeline::macron::{MacronResolver, MacronTable};
use crate::pipeline::rules::SubstitutionTable;
use crate::pipeline::{expand, spacing, tokenize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// A ready-to-use normalization pipeline.
///
/// The rule tables are immutable after construction and shared behind
/// `Arc`s, so cloning a `Normalizer` is cheap.
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: Arc<SubstitutionTable>,
    macrons: MacronResolver,
    linebreaks: LinebreakResolver,
    config: NormalizerConfig,
}

impl Normalizer {
    /// Load the resources named in `config`.
    ///
    /// # Errors
    /// Any [`crate::ConfigError`] from the substitution or macron table, or
    /// [`NormalizeError::InvalidConfig`] when no substitution table is
    /// configured. Nothing is processed before this succeeds.
    pub fn new(config: NormalizerConfig) -> Result<Self, NormalizeError> {
        let rules_path = config.rules_path.as_ref().ok_or_else(|| {
            NormalizeError::InvalidConfig("No substitution table configured".into())
        })?;
        let rules = SubstitutionTable::load(rules_path)?;
        let macrons = match config.macron_table_path {
            Some(ref path) => MacronTable::load(path)?,
            None => MacronTable::builtin(),
        };
        info!(
            "Loaded {} substitution rules and {} macron entries",
            rules.len(),
            macrons.entries().len()
        );
        Ok(Self::with_tables(rules, macrons, config))
    }

    /// Build a pipeline from tables already in memory.
    pub fn with_tables(
        rules: SubstitutionTable,
        macrons: MacronTable,
        config: NormalizerConfig,
    ) -> Self {
        let linebreaks = LinebreakResolver::new(
            config.continuation_markers.clone(),
            config.heuristic_linebreaks,
        );
        Self {
            rules: Arc::new(rules),
            macrons: MacronResolver::new(Arc::new(macrons)),
            linebreaks,
            config,
        }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn rules(&self) -> &SubstitutionTable {
        &self.rules
    }

    /// Run one raw line through expansion, tokenization and macron
    /// resolution. Linebreaks need the whole page and are not touched.
    pub fn normalize_line(&self, raw: &RawLine) -> Line {
        let id = raw.id();
        let cleaned = expand::expand(&raw.text, &self.rules);
        let words = self.macrons.resolve(tokenize::tokenize(&cleaned, id));
        Line {
            id,
            raw_data: raw.text.clone(),
            cleaned_data: cleaned,
            words,
        }
    }

    /// Normalize a whole page.
    ///
    /// Lines of regions outside the configured filter are dropped first.
    /// The page either comes back complete or not at all.
    pub fn normalize_page(&self, raw: &RawPage) -> Result<Page, NormalizeError> {
        raw.validate()?;

        let lines: Vec<Line> = raw
            .lines
            .iter()
            .filter(|l| {
                let keep = self.config.accepts(&l.region_kind);
                if !keep {
                    debug!("Skipping {} ({} region)", l.id(), l.region_kind);
                }
                keep
            })
            .map(|l| self.normalize_line(l))
            .collect();

        let mut page = Page {
            source: raw.source.clone(),
            lines,
            merges: Vec::new(),
        };
        self.linebreaks.resolve(&mut page);

        let stats = page.stats();
        info!(
            "Normalized {}: {} lines, {} words, {} merges, {} unresolved glyphs",
            page.source, stats.lines, stats.words, stats.merges, stats.gaps
        );
        if stats.heuristic_merges > 0 {
            warn!(
                "{}: {} heuristic linebreak merges need review",
                page.source, stats.heuristic_merges
            );
        }
        Ok(page)
    }

    /// Read a PAGE-XML file and normalize it.
    pub fn normalize_file(&self, path: impl AsRef<Path>) -> Result<Page, NormalizeError> {
        let raw = input::read_page_xml(path)?;
        self.normalize_page(&raw)
    }

    /// Normalize several PAGE-XML files, one after another.
    ///
    /// A failing page is reported in its [`PageResult`] and through the
    /// progress callback; it never stops the batch.
    pub fn normalize_files<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<PageResult> {
        let start = Instant::now();
        let total = paths.len();
        let cb = self.config.progress_callback.as_ref();
        if let Some(cb) = cb {
            cb.on_batch_start(total);
        }

        let mut results = Vec::with_capacity(total);
        for (idx, path) in paths.iter().enumerate() {
            let path = path.as_ref();
            let page_num = idx + 1;
            let source = path.display().to_string();
            if let Some(cb) = cb {
                cb.on_page_start(page_num, total, &source);
            }

            let result = match self.normalize_file(path) {
                Ok(page) => {
                    if let Some(cb) = cb {
                        cb.on_page_complete(page_num, total, page.lines.len(), page.gaps().count());
                    }
                    PageResult {
                        source,
                        page: Some(page),
                        error: None,
                    }
                }
                Err(e) => {
                    warn!("Discarding {}: {}", source, e);
                    if let Some(cb) = cb {
                        cb.on_page_error(page_num, total, &e.to_string());
                    }
                    PageResult {
                        source,
                        page: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let succeeded = results.iter().filter(|r| r.page.is_some()).count();
        info!(
            "Batch complete: {}/{} pages in {}ms",
            succeeded,
            total,
            start.elapsed().as_millis()
        );
        if let Some(cb) = cb {
            cb.on_batch_complete(total, succeeded);
        }
        results
    }

    /// Display string for one line.
    pub fn render(&self, line: &Line) -> String {
        spacing::render(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::pipeline::input::RegionKind;

    fn normalizer(config: NormalizerConfig) -> Normalizer {
        let rules = SubstitutionTable::from_pairs([
            ("æ", "ae"),
            ("ę", "ae"),
            ("ū", "um"),
            (r"\bquum\b", "cum"),
        ])
        .unwrap();
        Normalizer::with_tables(rules, MacronTable::builtin(), config)
    }

    #[test]
    fn test_normalize_line_end_to_end() {
        let n = normalizer(NormalizerConfig::default());
        let line = n.normalize_line(&RawLine::new(3, 2, RegionKind::Paragraph, "Prędicamus Christū"));

        assert_eq!(line.id.to_string(), "r3l2");
        assert_eq!(line.raw_data, "Prędicamus Christū");
        assert_eq!(line.cleaned_data, "Praedicamus Christum");
        let forms: Vec<&str> = line.words.iter().map(|w| w.resolved.as_str()).collect();
        assert_eq!(forms, vec!["Praedicamus", "Christum"]);
        assert!(line.words.iter().all(|w| w.surface == w.resolved));
        assert_eq!(n.render(&line), line.cleaned_data);
    }

    #[test]
    fn test_region_filter() {
        let n = normalizer(NormalizerConfig::default());
        let raw = RawPage::new(
            "p",
            vec![
                RawLine::new(0, 0, RegionKind::Heading, "CAPUT I."),
                RawLine::new(1, 0, RegionKind::Paragraph, "quum venisset"),
                RawLine::new(2, 0, RegionKind::Marginalia, "nota"),
            ],
        );
        let page = n.normalize_page(&raw).unwrap();
        assert_eq!(page.lines.len(), 1);
        assert_eq!(n.render(&page.lines[0]), "cum venisset");
    }

    #[test]
    fn test_linebreaks_run_after_filtering() {
        let n = normalizer(NormalizerConfig::builder().all_regions().build().unwrap());
        let raw = RawPage::new(
            "p",
            vec![
                RawLine::new(0, 0, RegionKind::Paragraph, "Prędi-"),
                RawLine::new(0, 1, RegionKind::Paragraph, "camus Christū"),
            ],
        );
        let page = n.normalize_page(&raw).unwrap();
        assert_eq!(n.render(&page.lines[0]), "Praedicamus");
        assert_eq!(n.render(&page.lines[1]), "Christum");
        assert_eq!(page.merges.len(), 1);
    }

    #[test]
    fn test_duplicate_ids_discard_page() {
        let n = normalizer(NormalizerConfig::default());
        let raw = RawPage::new(
            "p",
            vec![
                RawLine::new(0, 0, RegionKind::Paragraph, "a"),
                RawLine::new(0, 0, RegionKind::Paragraph, "b"),
            ],
        );
        assert!(matches!(
            n.normalize_page(&raw),
            Err(NormalizeError::Validation(ValidationError::DuplicateLine { .. }))
        ));
    }

    #[test]
    fn test_new_requires_rules_path() {
        let mut config = NormalizerConfig::default();
        config.rules_path = None;
        assert!(matches!(
            Normalizer::new(config),
            Err(NormalizeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_new_fails_on_missing_rules() {
        let config = NormalizerConfig::builder()
            .rules_path("/no/such/rules.tsv")
            .build()
            .unwrap();
        assert!(matches!(
            Normalizer::new(config),
            Err(NormalizeError::Config(crate::ConfigError::NotFound { .. }))
        ));
    }
}
