//! Input adaptation: typed raw lines, and a reader for PAGE-XML files.
//!
//! The pipeline itself only needs [`RawPage`]: ordered lines, each tagged
//! with its region index, line index and region classification. How those
//! lines are obtained is up to the caller. [`read_page_xml`] covers the
//! common case of a PAGE-XML export sitting on disk.
//!
//! ## PAGE-XML specifics
//!
//! Transkribus stores indices and region types inside a free-text `custom`
//! attribute, e.g. `readingOrder {index:2;} structure {type:paragraph;}`.
//! That string is parsed exactly once, here, into typed fields; nothing
//! downstream ever sees it.

use crate::error::{NormalizeError, ValidationError};
use crate::output::LineId;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Structural classification of a text region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKind {
    Paragraph,
    Heading,
    Header,
    Footer,
    PageNumber,
    Marginalia,
    Footnote,
    Caption,
    /// The region carries no type.
    Unclassified,
    Other(String),
}

impl RegionKind {
    /// Parse a region type name; unknown names are kept as [`RegionKind::Other`].
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "paragraph" => RegionKind::Paragraph,
            "heading" => RegionKind::Heading,
            "header" => RegionKind::Header,
            "footer" => RegionKind::Footer,
            "page-number" | "page_number" | "pagenumber" => RegionKind::PageNumber,
            "marginalia" => RegionKind::Marginalia,
            "footnote" => RegionKind::Footnote,
            "caption" => RegionKind::Caption,
            "" | "unclassified" => RegionKind::Unclassified,
            other => RegionKind::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegionKind::Paragraph => "paragraph",
            RegionKind::Heading => "heading",
            RegionKind::Header => "header",
            RegionKind::Footer => "footer",
            RegionKind::PageNumber => "page-number",
            RegionKind::Marginalia => "marginalia",
            RegionKind::Footnote => "footnote",
            RegionKind::Caption => "caption",
            RegionKind::Unclassified => "unclassified",
            RegionKind::Other(s) => s,
        };
        f.write_str(name)
    }
}

/// One line of diplomatic transcription, as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    pub region: u32,
    pub line: u32,
    pub region_kind: RegionKind,
    pub text: String,
}

impl RawLine {
    pub fn new(region: u32, line: u32, region_kind: RegionKind, text: impl Into<String>) -> Self {
        Self {
            region,
            line,
            region_kind,
            text: text.into(),
        }
    }

    pub fn id(&self) -> LineId {
        LineId::new(self.region, self.line)
    }
}

/// A page as supplied to the pipeline: lines in reading order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPage {
    /// Label used in logs and errors, typically the file name.
    pub source: String,
    pub lines: Vec<RawLine>,
}

impl RawPage {
    pub fn new(source: impl Into<String>, lines: Vec<RawLine>) -> Self {
        Self {
            source: source.into(),
            lines,
        }
    }

    /// Reject pages whose line identifiers collide.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(self.lines.len());
        for line in &self.lines {
            if !seen.insert(line.id()) {
                return Err(ValidationError::DuplicateLine {
                    page: self.source.clone(),
                    id: line.id().to_string(),
                });
            }
        }
        Ok(())
    }
}

// ── PAGE-XML ─────────────────────────────────────────────────────────────────

/// Read and parse a PAGE-XML file.
pub fn read_page_xml(path: impl AsRef<Path>) -> Result<RawPage, NormalizeError> {
    let path = path.as_ref();
    let xml = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            NormalizeError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            NormalizeError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let page = parse_page_xml(&xml, source_label(path))?;
    debug!("Read {} lines from {}", page.lines.len(), path.display());
    Ok(page)
}

fn source_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Typed view of a `custom` attribute.
#[derive(Debug, Default, PartialEq, Eq)]
struct Custom {
    index: Option<u32>,
    kind: Option<String>,
}

static RE_CUSTOM_GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s*\{([^}]*)\}").unwrap());
static RE_CUSTOM_PAIR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s*:\s*([^;]*);").unwrap());

fn parse_custom(custom: &str) -> Custom {
    let mut out = Custom::default();
    for group in RE_CUSTOM_GROUP.captures_iter(custom) {
        for pair in RE_CUSTOM_PAIR.captures_iter(&group[2]) {
            match (&group[1], &pair[1]) {
                ("readingOrder", "index") => out.index = pair[2].trim().parse().ok(),
                ("structure", "type") => out.kind = Some(pair[2].trim().to_string()),
                _ => {}
            }
        }
    }
    out
}

struct RegionCtx {
    index: u32,
    kind: RegionKind,
    lines_seen: u32,
}

struct PendingLine {
    region: u32,
    line: u32,
    kind: RegionKind,
    text: Option<String>,
}

#[derive(Default)]
struct Structure {
    regions: bool,
    baselines: bool,
    text_equivs: bool,
}

/// Parse PAGE-XML markup into a [`RawPage`].
///
/// Fails with a [`ValidationError`] when the page has no `TextRegion`, no
/// `Baseline` or no `TextEquiv`, checked in that order.
pub fn parse_page_xml(xml: &str, source: impl Into<String>) -> Result<RawPage, ValidationError> {
    let source = source.into();
    let malformed = |detail: String| ValidationError::MalformedXml {
        page: source.clone(),
        detail,
    };

    let mut reader = Reader::from_str(xml);
    let mut path: Vec<String> = Vec::new();
    let mut regions: Vec<RegionCtx> = Vec::new();
    let mut region_ordinal = 0u32;
    let mut pending: Option<PendingLine> = None;
    let mut seen = Structure::default();
    let mut lines = Vec::new();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| malformed(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                match name.as_str() {
                    "TextRegion" => {
                        seen.regions = true;
                        let (custom, type_attr) = region_attributes(&e).map_err(&malformed)?;
                        let kind = custom
                            .kind
                            .or(type_attr)
                            .map(|k| RegionKind::parse(&k))
                            .unwrap_or(RegionKind::Unclassified);
                        regions.push(RegionCtx {
                            index: custom.index.unwrap_or(region_ordinal),
                            kind,
                            lines_seen: 0,
                        });
                        region_ordinal += 1;
                    }
                    "TextLine" => {
                        let custom = custom_attribute(&e).map_err(&malformed)?;
                        let (region, kind, ordinal) = match regions.last_mut() {
                            Some(r) => {
                                r.lines_seen += 1;
                                (r.index, r.kind.clone(), r.lines_seen - 1)
                            }
                            None => (0, RegionKind::Unclassified, 0),
                        };
                        pending = Some(PendingLine {
                            region,
                            line: custom.index.unwrap_or(ordinal),
                            kind,
                            text: None,
                        });
                    }
                    "Baseline" => seen.baselines = true,
                    "TextEquiv" => seen.text_equivs = true,
                    _ => {}
                }
                path.push(name);
            }
            Event::Empty(e) => match local_name(&e).as_str() {
                "Baseline" => seen.baselines = true,
                "TextEquiv" => seen.text_equivs = true,
                "TextRegion" => seen.regions = true,
                _ => {}
            },
            Event::Text(t) => {
                if in_line_unicode(&path) {
                    if let Some(line) = pending.as_mut() {
                        let text = t.unescape().map_err(|e| malformed(e.to_string()))?;
                        line.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
            }
            Event::CData(c) => {
                if in_line_unicode(&path) {
                    if let Some(line) = pending.as_mut() {
                        let text = String::from_utf8_lossy(&c).into_owned();
                        line.text.get_or_insert_with(String::new).push_str(&text);
                    }
                }
            }
            Event::End(_) => {
                match path.pop().as_deref() {
                    Some("TextRegion") => {
                        regions.pop();
                    }
                    Some("TextLine") => {
                        if let Some(line) = pending.take() {
                            lines.push(RawLine {
                                region: line.region,
                                line: line.line,
                                region_kind: line.kind,
                                text: line.text.unwrap_or_default(),
                            });
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen.regions {
        return Err(ValidationError::NoTextRegions { page: source });
    }
    if !seen.baselines {
        return Err(ValidationError::NoBaselines { page: source });
    }
    if !seen.text_equivs {
        return Err(ValidationError::NoText { page: source });
    }

    Ok(RawPage { source, lines })
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// True inside the line's own `TextEquiv/Unicode`, not a word's.
fn in_line_unicode(path: &[String]) -> bool {
    matches!(
        path,
        [.., line, equiv, unicode]
            if line == "TextLine" && equiv == "TextEquiv" && unicode == "Unicode"
    )
}

fn custom_attribute(e: &BytesStart<'_>) -> Result<Custom, String> {
    Ok(region_attributes(e)?.0)
}

/// The parsed `custom` attribute and the plain `type` attribute, if any.
fn region_attributes(e: &BytesStart<'_>) -> Result<(Custom, Option<String>), String> {
    let mut custom = Custom::default();
    let mut type_attr = None;
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        match attr.key.local_name().as_ref() {
            b"custom" => custom = parse_custom(&value),
            b"type" => type_attr = Some(value.into_owned()),
            _ => {}
        }
    }
    Ok((custom, type_attr))
}

/// Whether `path` looks like a PAGE-XML export.
pub fn is_page_xml(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("xml"))
}

/// Expand directories into the PAGE-XML files they contain, sorted by name.
pub fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>, NormalizeError> {
    let mut out = Vec::new();
    for path in paths {
        if path.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|e| NormalizeError::ReadFailed {
                path: path.clone(),
                source: e,
            })?;
            let mut files: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_page_xml(p))
                .collect();
            files.sort();
            out.extend(files);
        } else {
            out.push(path.clone());
        }
    }
    Ok(out)
}
