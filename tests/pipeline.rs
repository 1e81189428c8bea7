//! Integration tests for manuscript-normalizer.
//!
//! Every test writes its own rule tables and PAGE-XML pages into a
//! temporary directory and drives the public API only.

use manuscript_normalizer::{
    render, tokenize, ConfigError, LineId, MergeKind, NormalizeError, NormalizeProgressCallback,
    Normalizer, NormalizerConfig, RegionKind, ValidationError,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

const RULES: &str = "pattern\treplacement\næ\tae\nę\tae\nū\tum\n\\bquum\\b\tcum\n";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("write fixture");
    path
}

/// A PAGE document with one region per `(type, lines)` entry.
fn page_xml(regions: &[(&str, &[&str])]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <PcGts xmlns=\"http://schema.primaresearch.org/PAGE/gts/pagecontent/2013-07-15\">\n\
         <Page imageFilename=\"0001.jpg\">\n",
    );
    for (r, (kind, lines)) in regions.iter().enumerate() {
        xml.push_str(&format!(
            "<TextRegion id=\"tr{r}\" custom=\"readingOrder {{index:{r};}} structure {{type:{kind};}}\">\n"
        ));
        for (l, text) in lines.iter().enumerate() {
            xml.push_str(&format!(
                "<TextLine id=\"tl{r}_{l}\" custom=\"readingOrder {{index:{l};}}\">\
                 <Baseline points=\"0,0 10,0\"/>\
                 <TextEquiv><Unicode>{text}</Unicode></TextEquiv></TextLine>\n"
            ));
        }
        xml.push_str("</TextRegion>\n");
    }
    xml.push_str("</Page>\n</PcGts>\n");
    xml
}

fn paragraph(lines: &[&str]) -> String {
    page_xml(&[("paragraph", lines)])
}

fn setup() -> (TempDir, NormalizerConfig) {
    let dir = tempfile::tempdir().expect("tempdir");
    let rules = write(dir.path(), "replacement_table.tsv", RULES);
    let config = NormalizerConfig::builder()
        .rules_path(rules)
        .build()
        .expect("config");
    (dir, config)
}

fn rendered(normalizer: &Normalizer, path: &Path) -> Vec<(String, String)> {
    let page = normalizer.normalize_file(path).expect("normalize");
    page.lines
        .iter()
        .map(|l| (l.id.to_string(), render(l)))
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[test]
fn test_expands_ligatures_and_macrons() {
    let (dir, config) = setup();
    let page = write(
        dir.path(),
        "0001.xml",
        &paragraph(&["Prędicamus Christū", "Prædicamus Christum"]),
    );
    let n = Normalizer::new(config).unwrap();

    assert_eq!(
        rendered(&n, &page),
        vec![
            ("r0l0".to_string(), "Praedicamus Christum".to_string()),
            ("r0l1".to_string(), "Praedicamus Christum".to_string()),
        ]
    );
}

#[test]
fn test_anchored_rule_only_matches_whole_word() {
    let (dir, config) = setup();
    let page = write(
        dir.path(),
        "0001.xml",
        &paragraph(&["Quum venisset quumque"]),
    );
    let n = Normalizer::new(config).unwrap();

    let lines = rendered(&n, &page);
    assert_eq!(lines[0].1, "cum venisset quumque");
}

#[test]
fn test_raw_text_is_kept_next_to_cleaned() {
    let (dir, config) = setup();
    let page = write(dir.path(), "0001.xml", &paragraph(&["Christū"]));
    let page = Normalizer::new(config).unwrap().normalize_file(page).unwrap();

    let line = &page.lines[0];
    assert_eq!(line.raw_data, "Christū");
    assert_eq!(line.cleaned_data, "Christum");
    assert_eq!(line.words[0].id, "r0l0w1");
}

#[test]
fn test_malformed_rule_row_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(
        dir.path(),
        "replacement_table.tsv",
        "pattern\treplacement\næ\tae\nbroken\n",
    );
    let config = NormalizerConfig::builder().rules_path(rules).build().unwrap();

    match Normalizer::new(config) {
        Err(NormalizeError::Config(ConfigError::MalformedRow { row, .. })) => assert_eq!(row, 3),
        other => panic!("expected MalformedRow, got {other:?}"),
    }
}

#[test]
fn test_invalid_pattern_fails_construction() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "replacement_table.tsv", "(unclosed\tx\n");
    let config = NormalizerConfig::builder().rules_path(rules).build().unwrap();

    assert!(matches!(
        Normalizer::new(config),
        Err(NormalizeError::Config(ConfigError::InvalidPattern { .. }))
    ));
}

#[test]
fn test_page_without_baselines_is_discarded() {
    let (dir, config) = setup();
    let xml = "<PcGts><Page><TextRegion><TextLine>\
               <TextEquiv><Unicode>a</Unicode></TextEquiv>\
               </TextLine></TextRegion></Page></PcGts>";
    let page = write(dir.path(), "bad.xml", xml);
    let n = Normalizer::new(config).unwrap();

    match n.normalize_file(&page) {
        Err(NormalizeError::Validation(ValidationError::NoBaselines { page })) => {
            assert!(page.ends_with("bad.xml"));
        }
        other => panic!("expected NoBaselines, got {other:?}"),
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl NormalizeProgressCallback for Recorder {
    fn on_batch_start(&self, total: usize) {
        self.events.lock().unwrap().push(format!("start {total}"));
    }
    fn on_page_complete(&self, page_num: usize, _total: usize, lines: usize, gaps: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("ok {page_num} {lines} {gaps}"));
    }
    fn on_page_error(&self, page_num: usize, _total: usize, _error: &str) {
        self.events.lock().unwrap().push(format!("err {page_num}"));
    }
    fn on_batch_complete(&self, total: usize, success: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {success}/{total}"));
    }
}

#[test]
fn test_batch_survives_a_failing_page() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "replacement_table.tsv", RULES);
    let good = write(dir.path(), "a.xml", &paragraph(&["quum"]));
    let bad = write(dir.path(), "b.xml", "<PcGts><Page></Page></PcGts>");
    let missing = dir.path().join("c.xml");

    let recorder = Arc::new(Recorder::default());
    let config = NormalizerConfig::builder()
        .rules_path(rules)
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let results = Normalizer::new(config)
        .unwrap()
        .normalize_files(&[good, bad, missing]);

    assert_eq!(results.len(), 3);
    assert!(results[0].page.is_some());
    assert!(results[1].error.as_deref().unwrap().contains("no TextRegions"));
    assert!(results[2].page.is_none());

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec!["start 3", "ok 1 1 0", "err 2", "err 3", "done 1/3"]
    );
}

#[test]
fn test_region_filter_and_all_regions() {
    const HEADING: &[&str] = &["CAPUT I."];
    const BODY: &[&str] = &["Prędicamus"];
    const NOTE: &[&str] = &["nota"];

    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "replacement_table.tsv", RULES);
    let page = write(
        dir.path(),
        "0001.xml",
        &page_xml(&[
            ("heading", HEADING),
            ("paragraph", BODY),
            ("marginalia", NOTE),
        ]),
    );

    let default = Normalizer::new(
        NormalizerConfig::builder().rules_path(&rules).build().unwrap(),
    )
    .unwrap();
    let lines = rendered(&default, &page);
    assert_eq!(lines, vec![("r1l0".to_string(), "Praedicamus".to_string())]);

    let chosen = Normalizer::new(
        NormalizerConfig::builder()
            .rules_path(&rules)
            .region_filter(vec![RegionKind::Paragraph, RegionKind::Heading])
            .build()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(rendered(&chosen, &page).len(), 2);

    let all = Normalizer::new(
        NormalizerConfig::builder()
            .rules_path(&rules)
            .all_regions()
            .build()
            .unwrap(),
    )
    .unwrap();
    assert_eq!(rendered(&all, &page).len(), 3);
}

#[test]
fn test_linebreak_merge_across_lines() {
    let (dir, config) = setup();
    let page = write(
        dir.path(),
        "0001.xml",
        &paragraph(&["et Prędi-", "camus Christū", "in sæ¬", "cula"]),
    );
    let n = Normalizer::new(config).unwrap();
    let page = n.normalize_file(page).unwrap();

    let text: Vec<String> = page.lines.iter().map(render).collect();
    assert_eq!(text, vec!["et Praedicamus", "Christum", "in saecula", ""]);
    // Emptied lines keep their identifiers.
    assert_eq!(page.lines[3].id, LineId::new(0, 3));

    assert_eq!(page.merges.len(), 2);
    assert!(page.merges.iter().all(|m| m.kind == MergeKind::Explicit));
    assert_eq!(page.merges[0].from, LineId::new(0, 0));
    assert_eq!(page.merges[0].into, LineId::new(0, 1));
}

#[test]
fn test_heuristic_merges_are_opt_in_and_flagged() {
    let dir = tempfile::tempdir().unwrap();
    let rules = write(dir.path(), "replacement_table.tsv", RULES);
    let page = write(
        dir.path(),
        "0001.xml",
        &paragraph(&["Prędica", "mus Christū"]),
    );

    let strict = Normalizer::new(
        NormalizerConfig::builder().rules_path(&rules).build().unwrap(),
    )
    .unwrap();
    assert!(strict.normalize_file(&page).unwrap().merges.is_empty());

    let loose = Normalizer::new(
        NormalizerConfig::builder()
            .rules_path(&rules)
            .heuristic_linebreaks(true)
            .build()
            .unwrap(),
    )
    .unwrap();
    let result = loose.normalize_file(&page).unwrap();
    assert_eq!(result.merges.len(), 1);
    assert_eq!(result.merges[0].kind, MergeKind::Heuristic);
    assert_eq!(render(&result.lines[0]), "Praedicamus");
    assert_eq!(result.stats().heuristic_merges, 1);
}

#[test]
fn test_unresolved_macron_is_reported_not_dropped() {
    let (dir, config) = setup();
    // Medial ā has no rule in either table.
    let page = write(dir.path(), "0001.xml", &paragraph(&["grātia"]));
    let page = Normalizer::new(config).unwrap().normalize_file(page).unwrap();

    let gaps: Vec<_> = page.gaps().collect();
    assert_eq!(gaps.len(), 1);
    assert_eq!(gaps[0].word, "grātia");
    assert_eq!(render(&page.lines[0]), "grātia");
}

#[test]
fn test_tokenize_then_render_reproduces_spacing() {
    let cleaned = "Dixit ( ut aiunt ) , et abiit .";
    let words = tokenize(cleaned, LineId::new(0, 0));
    assert_eq!(words.len(), 9);
    for w in &words {
        assert_eq!(&cleaned[w.span.clone()], w.surface);
    }

    let line = manuscript_normalizer::Line {
        id: LineId::new(0, 0),
        raw_data: cleaned.to_string(),
        cleaned_data: cleaned.to_string(),
        words,
    };
    assert_eq!(render(&line), "Dixit (ut aiunt), et abiit.");
}

#[test]
fn test_json_output_shape() {
    let (dir, config) = setup();
    let page = write(dir.path(), "0001.xml", &paragraph(&["Christū"]));
    let results = Normalizer::new(config).unwrap().normalize_files(&[page]);

    let json = serde_json::to_value(&results).unwrap();
    let line = &json[0]["page"]["lines"][0];
    assert_eq!(line["id"]["region"], 0);
    assert_eq!(line["raw_data"], "Christū");
    assert_eq!(line["words"][0]["resolved"], "Christum");
}

#[test]
fn test_shipped_tables_load() {
    let data = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data");
    let config = NormalizerConfig::builder()
        .rules_path(data.join("replacement_table.tsv"))
        .macron_table_path(data.join("macron_table.tsv"))
        .build()
        .unwrap();
    let n = Normalizer::new(config).unwrap();
    assert_eq!(n.rules().len(), 5);

    let dir = tempfile::tempdir().unwrap();
    let page = write(dir.path(), "0001.xml", &paragraph(&["cœlū"]));
    assert_eq!(rendered(&n, &page)[0].1, "coelum");
}

#[test]
fn test_custom_macron_table_resolves_medial_glyph() {
    let dir = tempfile::tempdir().unwrap();
    // No substitution rules: every macron goes through the macron table.
    let rules = write(dir.path(), "replacement_table.tsv", "pattern\treplacement\n");
    let macrons = write(
        dir.path(),
        "macron_table.tsv",
        "glyph\tposition\tneighbour\texpansion\n\
         ū\tfinal\tany\tum\n\
         ā\tmedial\tconsonant\tan\n",
    );
    let config = NormalizerConfig::builder()
        .rules_path(rules)
        .macron_table_path(macrons)
        .build()
        .unwrap();
    let n = Normalizer::new(config).unwrap();
    let page = write(dir.path(), "0001.xml", &paragraph(&["grātia Christū"]));

    let page = n.normalize_file(page).unwrap();
    let words = &page.lines[0].words;
    assert_eq!(words[0].surface, "grātia");
    assert_eq!(words[0].resolved, "grantia");
    assert_eq!(words[1].resolved, "Christum");
    assert_eq!(page.gaps().count(), 0);
    // The cleaned line is untouched by macron resolution.
    assert_eq!(page.lines[0].cleaned_data, "grātia Christū");
}
