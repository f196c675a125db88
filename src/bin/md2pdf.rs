//! CLI binary for md2pdf.
//!
//! A thin shim over the library crate that maps CLI flags (and an optional
//! JSON settings file) to an `OptionSet` and reports the result.

use anyhow::{Context, Result};
use clap::Parser;
use md2pdf::{
    cancel_pair, convert_with_cancel, ConversionOutput, ConversionProgressCallback,
    ConversionStage, OptionSetBuilder, Orientation, PageSize, RawOptions, Theme,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner whose message follows the coordinator's stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("md2pdf");
        bar.set_message("starting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: ConversionStage) {
        let msg = match stage {
            ConversionStage::Validating => "checking inputs",
            ConversionStage::Composing => "building HTML",
            ConversionStage::Staging => "staging",
            ConversionStage::Rendering => "rendering with wkhtmltopdf",
            ConversionStage::Finalizing => "writing PDF",
            other => other.as_str(),
        };
        self.bar.set_message(msg);
    }

    fn on_complete(&self, output: &ConversionOutput) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&output.output_path.display().to_string()),
            dim(&format!(
                "{} bytes, {}ms",
                output.stats.output_bytes, output.stats.total_duration_ms
            )),
        );
    }

    fn on_error(&self, stage: ConversionStage, _error: &str) {
        self.bar.finish_and_clear();
        eprintln!("{} failed while {}", red("✘"), stage);
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a file (writes README.pdf)
  md2pdf README.md

  # Explicit output, GitHub stylesheet, Letter landscape
  md2pdf notes.md -o out/notes.pdf --theme github --page-size letter --orientation landscape

  # Inline Markdown
  md2pdf --text '# Hello' -o hello.pdf

  # Custom template and CSS, keep the intermediate HTML
  md2pdf report.md --template report.html --css print.css --debug

  # Pass flags straight through to wkhtmltopdf
  md2pdf doc.md --global-args '--grayscale' --page-args '--footer-center "[page]/[topage]"'

  # Settings file, with flags overriding it
  md2pdf --settings md2pdf.json --dpi 150 doc.md

TEMPLATES:
  A template must contain {$html}, replaced by the rendered Markdown.
  The stylesheet goes to {$css} if present, else before </head>.

ENVIRONMENT VARIABLES:
  WKHTMLTOPDF_PATH   Renderer binary (default: wkhtmltopdf on PATH)
  MD2PDF_*           Most flags, e.g. MD2PDF_THEME=github
  RUST_LOG           Log filter, overrides -v / -q
"#;

/// Convert Markdown files to PDF with wkhtmltopdf.
#[derive(Parser, Debug)]
#[command(
    name = "md2pdf",
    version,
    about = "Convert Markdown files to PDF with wkhtmltopdf",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Markdown file to convert.
    #[arg(conflicts_with = "text")]
    input: Option<PathBuf>,

    /// Output PDF path. Defaults to the input with a `.pdf` extension.
    #[arg(short, long, env = "MD2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Inline Markdown instead of an input file.
    #[arg(long)]
    text: Option<String>,

    /// Stylesheet replacing the built-in theme.
    #[arg(long, env = "MD2PDF_CSS")]
    css: Option<PathBuf>,

    /// HTML template containing a {$html} placeholder.
    #[arg(long, env = "MD2PDF_TEMPLATE")]
    template: Option<PathBuf>,

    /// Built-in stylesheet.
    #[arg(long, env = "MD2PDF_THEME", value_enum)]
    theme: Option<ThemeArg>,

    #[arg(long, env = "MD2PDF_PAGE_SIZE", value_enum)]
    page_size: Option<PageSizeArg>,

    #[arg(long, env = "MD2PDF_ORIENTATION", value_enum)]
    orientation: Option<OrientationArg>,

    /// Image DPI passed to the renderer (default 300).
    #[arg(long, env = "MD2PDF_DPI", allow_negative_numbers = true)]
    dpi: Option<i64>,

    /// JPEG quality 0-100 (default 100).
    #[arg(long, env = "MD2PDF_QUALITY", allow_negative_numbers = true)]
    quality: Option<i64>,

    /// Left margin in millimetres.
    #[arg(long, allow_negative_numbers = true)]
    margin_left: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    margin_right: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    margin_top: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    margin_bottom: Option<i64>,

    /// Extra global options for wkhtmltopdf (quoted, shell-style).
    #[arg(long, env = "MD2PDF_GLOBAL_ARGS", allow_hyphen_values = true)]
    global_args: Option<String>,

    /// Extra page options for wkhtmltopdf (quoted, shell-style).
    #[arg(long, env = "MD2PDF_PAGE_ARGS", allow_hyphen_values = true)]
    page_args: Option<String>,

    /// Enable tables, footnotes, task lists, strikethrough and more.
    #[arg(long)]
    advanced_extensions: bool,

    /// Enable pipe tables only.
    #[arg(long)]
    pipe_tables: bool,

    /// Keep the intermediate HTML beside the output.
    #[arg(long, env = "MD2PDF_DEBUG")]
    debug: bool,

    /// Renderer timeout in seconds (default 180).
    #[arg(long, env = "MD2PDF_TIMEOUT")]
    timeout: Option<u64>,

    /// wkhtmltopdf binary.
    #[arg(long, env = "WKHTMLTOPDF_PATH")]
    renderer: Option<PathBuf>,

    /// Document title for the built-in page skeleton.
    #[arg(long)]
    title: Option<String>,

    /// Fail instead of replacing an existing output file.
    #[arg(long)]
    no_overwrite: bool,

    /// JSON settings file; flags override its values.
    #[arg(long, env = "MD2PDF_SETTINGS")]
    settings: Option<PathBuf>,

    /// Print the conversion result as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "MD2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MD2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MD2PDF_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ThemeArg {
    Default,
    Github,
}

impl From<ThemeArg> for Theme {
    fn from(v: ThemeArg) -> Self {
        match v {
            ThemeArg::Default => Theme::Default,
            ThemeArg::Github => Theme::Github,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PageSizeArg {
    A4,
    Letter,
}

impl From<PageSizeArg> for PageSize {
    fn from(v: PageSizeArg) -> Self {
        match v {
            PageSizeArg::A4 => PageSize::A4,
            PageSizeArg::Letter => PageSize::Letter,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<OrientationArg> for Orientation {
    fn from(v: OrientationArg) -> Self {
        match v {
            OrientationArg::Portrait => Orientation::Portrait,
            OrientationArg::Landscape => Orientation::Landscape,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner replaces INFO logs; -v brings them back.
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

    // ── Build options ────────────────────────────────────────────────────
    let raw = build_raw_options(&cli)?;
    let mut builder = OptionSetBuilder::from_raw(raw);
    if show_progress {
        builder = builder.progress_callback(CliProgressCallback::new());
    }
    let options = builder.build().context("Invalid options")?;

    // ── Run conversion (Ctrl-C terminates the renderer) ──────────────────
    let (handle, token) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let output = convert_with_cancel(&options, token)
        .await
        .context("Conversion failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet && !show_progress {
        eprintln!(
            "Wrote {} ({} bytes) in {}ms",
            output.output_path.display(),
            output.stats.output_bytes,
            output.stats.total_duration_ms
        );
    }
    if let Some(ref html) = output.retained_html {
        if !cli.quiet {
            eprintln!("   intermediate HTML kept at {}", dim(&html.display().to_string()));
        }
    }

    Ok(())
}

/// Settings file first, then every flag that was given on top.
fn build_raw_options(cli: &Cli) -> Result<RawOptions> {
    let mut raw = match cli.settings {
        Some(ref path) => RawOptions::from_json_file(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => RawOptions::default(),
    };

    if let Some(ref input) = cli.input {
        raw.markdown_file = Some(input.clone());
        raw.markdown_text = None;
    }
    if let Some(ref text) = cli.text {
        raw.markdown_text = Some(text.clone());
        raw.markdown_file = None;
    }

    raw.output_path = cli
        .output
        .clone()
        .or(raw.output_path)
        .or_else(|| cli.input.as_ref().map(|p| p.with_extension("pdf")));

    override_with(&mut raw.css_path, &cli.css);
    override_with(&mut raw.html_template_path, &cli.template);
    override_with(&mut raw.theme, &cli.theme.map(Theme::from));
    override_with(&mut raw.page_size, &cli.page_size.map(PageSize::from));
    override_with(&mut raw.orientation, &cli.orientation.map(Orientation::from));
    override_with(&mut raw.image_dpi, &cli.dpi);
    override_with(&mut raw.image_quality, &cli.quality);
    override_with(&mut raw.extra_global_args, &cli.global_args);
    override_with(&mut raw.extra_page_args, &cli.page_args);
    override_with(&mut raw.timeout_ms, &cli.timeout.map(|s| s.saturating_mul(1000)));
    override_with(&mut raw.renderer_path, &cli.renderer);
    override_with(&mut raw.title, &cli.title);

    if let Some(v) = cli.margin_left {
        raw.margins.left = v;
    }
    if let Some(v) = cli.margin_right {
        raw.margins.right = v;
    }
    if let Some(v) = cli.margin_top {
        raw.margins.top = v;
    }
    if let Some(v) = cli.margin_bottom {
        raw.margins.bottom = v;
    }

    raw.markdown_extensions.advanced |= cli.advanced_extensions;
    raw.markdown_extensions.pipe_tables |= cli.pipe_tables;
    raw.debug_retain_artifacts |= cli.debug;
    if cli.no_overwrite {
        raw.overwrite = Some(false);
    }

    Ok(raw)
}

fn override_with<T: Clone>(slot: &mut Option<T>, flag: &Option<T>) {
    if let Some(v) = flag {
        *slot = Some(v.clone());
    }
}
