//! CLI binary for manuscript-normalizer.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `NormalizerConfig` and prints normalized lines.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use manuscript_normalizer::pipeline::input::collect_inputs;
use manuscript_normalizer::{
    render, MergeKind, NormalizeProgressCallback, Normalizer, NormalizerConfig, Page,
    PageResult, ProgressCallback, RegionKind,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar at the bottom of the terminal and one
/// log line per page above it.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        bar.set_prefix("Normalizing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl NormalizeProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_pages: usize) {
        self.bar.set_length(total_pages as u64);
    }

    fn on_page_start(&self, page_num: usize, _total: usize, source: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(source.to_string());
    }

    fn on_page_complete(&self, page_num: usize, total: usize, lines: usize, gaps: usize) {
        let secs = self.elapsed_secs(page_num);
        let gaps = if gaps == 0 {
            dim("no gaps")
        } else {
            yellow(&format!("{gaps} gaps"))
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{lines:>4} lines")),
            gaps,
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(error),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_pages.saturating_sub(success_count);
        if failed == 0 {
            eprintln!("{} {} pages normalized", green("✔"), bold(&success_count.to_string()));
        } else {
            eprintln!(
                "{} {}/{} pages normalized  ({} discarded)",
                if failed == total_pages { red("✘") } else { yellow("⚠") },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Normalize one page with the table in the working directory
  msnorm page_0001.xml

  # A whole folder of PAGE-XML exports, raw text under each line
  msnorm --raw export/

  # Custom tables, all regions, structured output
  msnorm --rules data/replacement_table.tsv --macrons data/macron_table.tsv \
         --regions all --json export/ > pages.json

  # Also join unmarked line ends (merges are flagged for review)
  msnorm --heuristic-linebreaks page_0001.xml

TABLE FORMATS (tab-separated, optional header row):
  replacement_table.tsv   pattern  replacement
  macron_table.tsv        glyph    position  neighbour  expansion
                          position:  final | medial | any
                          neighbour: any | vowel | consonant | <letter>

ENVIRONMENT VARIABLES:
  MSNORM_RULES            Substitution table path
  MSNORM_MACRONS          Macron table path
  MSNORM_REGIONS          Region kinds to normalize
  MSNORM_MARKERS          Continuation markers
  RUST_LOG                Override the log filter
"#;

/// Normalize diplomatic transcriptions of Latin manuscripts.
#[derive(Parser, Debug)]
#[command(
    name = "msnorm",
    version,
    about = "Normalize diplomatic transcriptions of Latin manuscripts",
    long_about = "Read Transkribus PAGE-XML pages, expand abbreviations, ligatures and \
macrons, rejoin words split across lines and print the normalized reading text with \
line identifiers.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PAGE-XML files or directories containing them.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Substitution table (TSV: pattern, replacement).
    #[arg(long, env = "MSNORM_RULES", default_value = manuscript_normalizer::DEFAULT_RULES_PATH)]
    rules: PathBuf,

    /// Macron table (TSV: glyph, position, neighbour, expansion).
    #[arg(long, env = "MSNORM_MACRONS")]
    macrons: Option<PathBuf>,

    /// Comma-separated region kinds to normalize, or "all".
    #[arg(long, env = "MSNORM_REGIONS", default_value = "paragraph")]
    regions: String,

    /// Continuation marker glyphs, written together (e.g. "-¬=").
    #[arg(long, env = "MSNORM_MARKERS")]
    markers: Option<String>,

    /// Also merge unmarked line ends when casing suggests a split word.
    #[arg(long, env = "MSNORM_HEURISTIC_LINEBREAKS")]
    heuristic_linebreaks: bool,

    /// Print the raw transcription under each normalized line.
    #[arg(long)]
    raw: bool,

    /// Output structured JSON (one PageResult per input) instead of text.
    #[arg(long, env = "MSNORM_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MSNORM_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MSNORM_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MSNORM_QUIET")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn NormalizeProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;
    let normalizer = Normalizer::new(config).context("Failed to load normalization tables")?;

    let inputs = collect_inputs(&cli.inputs).context("Failed to collect input files")?;
    if inputs.is_empty() {
        anyhow::bail!("No PAGE-XML files found in the given inputs");
    }

    // ── Run ──────────────────────────────────────────────────────────────
    let results = normalizer.normalize_files(&inputs);

    if cli.json {
        let json = serde_json::to_string_pretty(&results).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        let multi = results.len() > 1;
        for (i, result) in results.iter().enumerate() {
            if let Some(ref page) = result.page {
                if multi {
                    if i > 0 {
                        writeln!(handle)?;
                    }
                    writeln!(handle, "# {}", page.source)?;
                }
                write_page(&mut handle, page, cli.raw).context("Failed to write to stdout")?;
            }
        }
    }

    if !cli.quiet {
        print_summary(&results, show_progress);
    }

    if results.iter().all(|r| r.page.is_none()) {
        anyhow::bail!("Every page was discarded");
    }
    Ok(())
}

/// Text rendering: the line id right-aligned in 8 columns, then the line.
fn write_page(out: &mut impl Write, page: &Page, raw: bool) -> io::Result<()> {
    for line in &page.lines {
        writeln!(out, "{:>8} {}", line.id, render(line))?;
        if raw {
            writeln!(out, "{:>8} {}", "", line.raw_data)?;
        }
    }
    Ok(())
}

/// Gaps and merges go to stderr so stdout stays clean text.
fn print_summary(results: &[PageResult], show_progress: bool) {
    for page in results.iter().filter_map(|r| r.page.as_ref()) {
        for merge in &page.merges {
            let tag = match merge.kind {
                MergeKind::Explicit => dim("merge"),
                MergeKind::Heuristic => yellow("merge?"),
            };
            eprintln!(
                "{} {}  {} + {}  ({} → {})",
                tag, page.source, merge.word, merge.consumed, merge.from, merge.into
            );
        }
        for gap in page.gaps() {
            eprintln!("{} {}  {}", yellow("gap"), page.source, gap);
        }
    }

    if !show_progress {
        for r in results {
            if let Some(ref e) = r.error {
                eprintln!("{} {}", red("discarded"), e);
            }
        }
        let ok = results.iter().filter(|r| r.page.is_some()).count();
        eprintln!("Normalized {}/{} pages", ok, results.len());
    }
}

/// Map CLI args to `NormalizerConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<NormalizerConfig> {
    let mut builder = NormalizerConfig::builder()
        .rules_path(&cli.rules)
        .region_filter(parse_regions(&cli.regions))
        .heuristic_linebreaks(cli.heuristic_linebreaks);

    if let Some(ref path) = cli.macrons {
        builder = builder.macron_table_path(path);
    }
    if let Some(ref markers) = cli.markers {
        builder = builder.continuation_markers(parse_markers(markers));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--regions` into a filter; "all" (or nothing) accepts every region.
fn parse_regions(s: &str) -> Vec<RegionKind> {
    if s.trim().eq_ignore_ascii_case("all") {
        return Vec::new();
    }
    s.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(RegionKind::parse)
        .collect()
}

/// Parse `--markers`; whitespace and commas between glyphs are ignored.
fn parse_markers(s: &str) -> Vec<char> {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != ',')
        .collect()
}
