//! Conversion options.
//!
//! Two forms exist:
//!
//! * [`RawOptions`]: what a caller or settings file supplied, unvalidated.
//!   Numbers are signed so that nonsense such as a negative margin can be
//!   represented and rejected with a precise error.
//! * [`OptionSet`]: the validated, immutable value every pipeline stage
//!   reads. It can only be obtained from [`validate`] (directly, or through
//!   [`OptionSetBuilder::build`]).
//!
//! Defaults are plain constants applied once during validation.

use crate::error::ValidationError;
use crate::pipeline::markdown::MarkdownParser;
use crate::progress::ConversionProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_IMAGE_DPI: u32 = 300;
pub const DEFAULT_IMAGE_QUALITY: u8 = 100;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3 * 60);
pub const DEFAULT_RENDERER: &str = "wkhtmltopdf";

// ── Enums ────────────────────────────────────────────────────────────────

/// Built-in stylesheet used when no CSS file is supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Default,
    Github,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    Letter,
    #[default]
    A4,
}

impl PageSize {
    /// Token understood by the renderer's `--page-size` flag.
    pub fn as_flag(self) -> &'static str {
        match self {
            PageSize::Letter => "Letter",
            PageSize::A4 => "A4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

impl Orientation {
    /// Token understood by the renderer's `--orientation` flag.
    pub fn as_flag(self) -> &'static str {
        match self {
            Orientation::Portrait => "Portrait",
            Orientation::Landscape => "Landscape",
        }
    }
}

/// Markdown extensions forwarded to the parser collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownExtensions {
    /// Tables, footnotes, task lists, autolinks, strikethrough and friends.
    pub advanced: bool,
    /// GitHub-style pipe tables only.
    pub pipe_tables: bool,
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

/// Unvalidated margins; negative values are rejected by [`validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMargins {
    pub left: i64,
    pub right: i64,
    pub top: i64,
    pub bottom: i64,
}

/// Where the Markdown comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MarkdownSource {
    File(PathBuf),
    Text(String),
}

// ── Raw options ──────────────────────────────────────────────────────────

/// Conversion options as supplied, before validation.
///
/// Deserialises from a JSON settings file; every field is optional there.
///
/// ```rust
/// let raw: md2pdf::RawOptions = serde_json::from_str(
///     r##"{ "markdown_text": "# Hi", "output_path": "out.pdf", "theme": "github" }"##,
/// ).unwrap();
/// assert_eq!(raw.theme, Some(md2pdf::Theme::Github));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawOptions {
    pub markdown_file: Option<PathBuf>,
    pub markdown_text: Option<String>,
    pub output_path: Option<PathBuf>,
    pub css_path: Option<PathBuf>,
    pub html_template_path: Option<PathBuf>,
    pub theme: Option<Theme>,
    pub page_size: Option<PageSize>,
    pub orientation: Option<Orientation>,
    pub image_dpi: Option<i64>,
    pub image_quality: Option<i64>,
    pub margins: RawMargins,
    pub extra_global_args: Option<String>,
    pub extra_page_args: Option<String>,
    pub markdown_extensions: MarkdownExtensions,
    pub debug_retain_artifacts: bool,
    pub timeout_ms: Option<u64>,
    pub renderer_path: Option<PathBuf>,
    pub environment: BTreeMap<String, String>,
    pub overwrite: Option<bool>,
    pub title: Option<String>,
}

impl RawOptions {
    /// Load raw options from a JSON settings file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, crate::ConversionError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| crate::ConversionError::io("read settings file", path, e))?;
        serde_json::from_str(&text).map_err(|e| {
            crate::ConversionError::io(
                "parse settings file",
                path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })
    }
}

// ── Validated options ────────────────────────────────────────────────────

/// Validated, immutable conversion parameters.
///
/// Built via [`OptionSet::builder()`] or [`validate`].
///
/// # Example
/// ```rust
/// use md2pdf::{OptionSet, PageSize, Theme};
///
/// let options = OptionSet::builder()
///     .markdown_text("# Hello")
///     .output_path("hello.pdf")
///     .theme(Theme::Github)
///     .page_size(PageSize::Letter)
///     .build()
///     .unwrap();
/// assert_eq!(options.image_dpi(), 300);
/// ```
#[derive(Clone)]
pub struct OptionSet {
    source: MarkdownSource,
    output_path: PathBuf,
    css_path: Option<PathBuf>,
    html_template_path: Option<PathBuf>,
    theme: Theme,
    page_size: PageSize,
    orientation: Orientation,
    image_dpi: u32,
    image_quality: u8,
    margins: Margins,
    extra_global_args: Vec<String>,
    extra_page_args: Vec<String>,
    markdown_extensions: MarkdownExtensions,
    debug_retain_artifacts: bool,
    timeout: Duration,
    renderer_path: PathBuf,
    environment: BTreeMap<String, String>,
    overwrite: bool,
    title: Option<String>,
    markdown_parser: Option<Arc<dyn MarkdownParser>>,
    progress_callback: Option<Arc<dyn ConversionProgressCallback>>,
}

impl fmt::Debug for OptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSet")
            .field("source", &self.source)
            .field("output_path", &self.output_path)
            .field("css_path", &self.css_path)
            .field("html_template_path", &self.html_template_path)
            .field("theme", &self.theme)
            .field("page_size", &self.page_size)
            .field("orientation", &self.orientation)
            .field("image_dpi", &self.image_dpi)
            .field("image_quality", &self.image_quality)
            .field("margins", &self.margins)
            .field("extra_global_args", &self.extra_global_args)
            .field("extra_page_args", &self.extra_page_args)
            .field("markdown_extensions", &self.markdown_extensions)
            .field("debug_retain_artifacts", &self.debug_retain_artifacts)
            .field("timeout", &self.timeout)
            .field("renderer_path", &self.renderer_path)
            .field("environment", &self.environment)
            .field("overwrite", &self.overwrite)
            .field("title", &self.title)
            .field(
                "markdown_parser",
                &self.markdown_parser.as_ref().map(|_| "<dyn MarkdownParser>"),
            )
            .field(
                "progress_callback",
                &self.progress_callback
                    .as_ref()
                    .map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl OptionSet {
    /// Create a new builder for `OptionSet`.
    pub fn builder() -> OptionSetBuilder {
        OptionSetBuilder::default()
    }

    pub fn source(&self) -> &MarkdownSource {
        &self.source
    }
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
    pub fn css_path(&self) -> Option<&Path> {
        self.css_path.as_deref()
    }
    pub fn html_template_path(&self) -> Option<&Path> {
        self.html_template_path.as_deref()
    }
    pub fn theme(&self) -> Theme {
        self.theme
    }
    pub fn page_size(&self) -> PageSize {
        self.page_size
    }
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }
    pub fn image_dpi(&self) -> u32 {
        self.image_dpi
    }
    pub fn image_quality(&self) -> u8 {
        self.image_quality
    }
    pub fn margins(&self) -> Margins {
        self.margins
    }
    pub fn extra_global_args(&self) -> &[String] {
        &self.extra_global_args
    }
    pub fn extra_page_args(&self) -> &[String] {
        &self.extra_page_args
    }
    pub fn markdown_extensions(&self) -> MarkdownExtensions {
        self.markdown_extensions
    }
    pub fn debug_retain_artifacts(&self) -> bool {
        self.debug_retain_artifacts
    }
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
    pub fn renderer_path(&self) -> &Path {
        &self.renderer_path
    }
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }
    pub fn overwrite(&self) -> bool {
        self.overwrite
    }
    pub(crate) fn markdown_parser(&self) -> Option<&Arc<dyn MarkdownParser>> {
        self.markdown_parser.as_ref()
    }
    pub(crate) fn progress_callback(&self) -> Option<&Arc<dyn ConversionProgressCallback>> {
        self.progress_callback.as_ref()
    }

    /// Title for the built-in HTML skeleton.
    ///
    /// Falls back to the Markdown file stem, then to `Document`.
    pub fn title(&self) -> String {
        if let Some(ref t) = self.title {
            return t.clone();
        }
        match &self.source {
            MarkdownSource::File(p) => p
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Document".to_string()),
            MarkdownSource::Text(_) => "Document".to_string(),
        }
    }

    /// Re-check that every referenced input file is still readable.
    ///
    /// The filesystem may have changed between validation and conversion.
    pub fn check_files(&self) -> Result<(), ValidationError> {
        if let MarkdownSource::File(ref p) = self.source {
            require_readable("markdown_file", p)?;
        }
        if let Some(ref p) = self.css_path {
            require_readable("css_path", p)?;
        }
        if let Some(ref p) = self.html_template_path {
            require_readable("html_template_path", p)?;
        }
        Ok(())
    }
}

// ── Validation ───────────────────────────────────────────────────────────

/// Validate raw options and apply defaults.
///
/// Checks run in a fixed order: source, output path, numeric ranges, then
/// files, so the first reported error is stable for a given input.
pub fn validate(raw: RawOptions) -> Result<OptionSet, ValidationError> {
    validate_with(raw, None, None)
}

fn validate_with(
    raw: RawOptions,
    markdown_parser: Option<Arc<dyn MarkdownParser>>,
    progress_callback: Option<Arc<dyn ConversionProgressCallback>>,
) -> Result<OptionSet, ValidationError> {
    let source = match (raw.markdown_file, raw.markdown_text) {
        (Some(_), Some(_)) => {
            return Err(ValidationError::ConflictingSource {
                detail: "both a Markdown file and inline Markdown text were given".into(),
            })
        }
        (None, None) => {
            return Err(ValidationError::ConflictingSource {
                detail: "neither a Markdown file nor inline Markdown text was given".into(),
            })
        }
        (Some(path), None) => MarkdownSource::File(path),
        (None, Some(text)) => MarkdownSource::Text(text),
    };

    let output_path = match raw.output_path {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Err(ValidationError::MissingOutput),
    };

    let image_dpi = match raw.image_dpi {
        None => DEFAULT_IMAGE_DPI,
        Some(v) if v > 0 && v <= u32::MAX as i64 => v as u32,
        Some(v) => {
            return Err(ValidationError::OutOfRange {
                field: "image_dpi",
                value: v,
                expected: "a positive integer",
            })
        }
    };

    let image_quality = match raw.image_quality {
        None => DEFAULT_IMAGE_QUALITY,
        Some(v) if (0..=100).contains(&v) => v as u8,
        Some(v) => {
            return Err(ValidationError::OutOfRange {
                field: "image_quality",
                value: v,
                expected: "between 0 and 100",
            })
        }
    };

    let margins = Margins {
        left: margin("margins.left", raw.margins.left)?,
        right: margin("margins.right", raw.margins.right)?,
        top: margin("margins.top", raw.margins.top)?,
        bottom: margin("margins.bottom", raw.margins.bottom)?,
    };

    let timeout = match raw.timeout_ms {
        None => DEFAULT_TIMEOUT,
        Some(0) => {
            return Err(ValidationError::OutOfRange {
                field: "timeout_ms",
                value: 0,
                expected: "greater than zero",
            })
        }
        Some(ms) => Duration::from_millis(ms),
    };

    let source = match source {
        MarkdownSource::File(p) => {
            require_readable("markdown_file", &p)?;
            // Absolute so the composed document can point relative links
            // back at the Markdown file's directory.
            MarkdownSource::File(std::fs::canonicalize(&p).unwrap_or(p))
        }
        text => text,
    };
    if let Some(ref p) = raw.css_path {
        require_readable("css_path", p)?;
    }
    if let Some(ref p) = raw.html_template_path {
        require_readable("html_template_path", p)?;
    }

    Ok(OptionSet {
        source,
        output_path,
        css_path: raw.css_path,
        html_template_path: raw.html_template_path,
        theme: raw.theme.unwrap_or_default(),
        page_size: raw.page_size.unwrap_or_default(),
        orientation: raw.orientation.unwrap_or_default(),
        image_dpi,
        image_quality,
        margins,
        extra_global_args: split_arguments(raw.extra_global_args.as_deref().unwrap_or("")),
        extra_page_args: split_arguments(raw.extra_page_args.as_deref().unwrap_or("")),
        markdown_extensions: raw.markdown_extensions,
        debug_retain_artifacts: raw.debug_retain_artifacts,
        timeout,
        renderer_path: raw
            .renderer_path
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RENDERER)),
        environment: raw.environment,
        overwrite: raw.overwrite.unwrap_or(true),
        title: raw.title,
        markdown_parser,
        progress_callback,
    })
}

fn margin(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    if (0..=u32::MAX as i64).contains(&value) {
        Ok(value as u32)
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            expected: "a non-negative number of millimetres",
        })
    }
}

fn require_readable(field: &'static str, path: &Path) -> Result<(), ValidationError> {
    let readable = path.is_file() && File::open(path).is_ok();
    if readable {
        Ok(())
    } else {
        Err(ValidationError::MissingFile {
            field,
            path: path.to_path_buf(),
        })
    }
}

// ── Pass-through argument tokenising ─────────────────────────────────────

static RE_ARG_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:[^\s"']+|"[^"]*"|'[^']*'|["'])+"#).unwrap());

static RE_ARG_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""([^"]*)"|'([^']*)'|([^"']+)|(["'])"#).unwrap());

/// Split a pass-through option string into argv tokens.
///
/// Whitespace separates tokens; a single- or double-quoted run groups
/// whitespace into one token and the quotes are removed. A stray quote with
/// no partner is kept literally.
pub fn split_arguments(input: &str) -> Vec<String> {
    RE_ARG_TOKEN
        .find_iter(input)
        .map(|token| {
            RE_ARG_SEGMENT
                .captures_iter(token.as_str())
                .filter_map(|caps| {
                    caps.get(1)
                        .or_else(|| caps.get(2))
                        .or_else(|| caps.get(3))
                        .or_else(|| caps.get(4))
                        .map(|m| m.as_str().to_string())
                })
                .collect::<String>()
        })
        .collect()
}

// ── Builder ──────────────────────────────────────────────────────────────

/// Builder for [`OptionSet`].
#[derive(Default)]
pub struct OptionSetBuilder {
    raw: RawOptions,
    markdown_parser: Option<Arc<dyn MarkdownParser>>,
    progress_callback: Option<Arc<dyn ConversionProgressCallback>>,
}

impl fmt::Debug for OptionSetBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionSetBuilder")
            .field("raw", &self.raw)
            .finish_non_exhaustive()
    }
}

impl OptionSetBuilder {
    /// Start from previously loaded raw options (e.g. a settings file).
    pub fn from_raw(raw: RawOptions) -> Self {
        Self {
            raw,
            ..Self::default()
        }
    }

    pub fn markdown_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.markdown_file = Some(path.into());
        self
    }

    pub fn markdown_text(mut self, text: impl Into<String>) -> Self {
        self.raw.markdown_text = Some(text.into());
        self
    }

    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.output_path = Some(path.into());
        self
    }

    pub fn css_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.css_path = Some(path.into());
        self
    }

    pub fn html_template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.html_template_path = Some(path.into());
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.raw.theme = Some(theme);
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.raw.page_size = Some(size);
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.raw.orientation = Some(orientation);
        self
    }

    pub fn image_dpi(mut self, dpi: i64) -> Self {
        self.raw.image_dpi = Some(dpi);
        self
    }

    pub fn image_quality(mut self, quality: i64) -> Self {
        self.raw.image_quality = Some(quality);
        self
    }

    /// Set all four margins (millimetres).
    pub fn margins(mut self, left: i64, right: i64, top: i64, bottom: i64) -> Self {
        self.raw.margins = RawMargins {
            left,
            right,
            top,
            bottom,
        };
        self
    }

    pub fn extra_global_args(mut self, args: impl Into<String>) -> Self {
        self.raw.extra_global_args = Some(args.into());
        self
    }

    pub fn extra_page_args(mut self, args: impl Into<String>) -> Self {
        self.raw.extra_page_args = Some(args.into());
        self
    }

    pub fn advanced_extensions(mut self, v: bool) -> Self {
        self.raw.markdown_extensions.advanced = v;
        self
    }

    pub fn pipe_tables(mut self, v: bool) -> Self {
        self.raw.markdown_extensions.pipe_tables = v;
        self
    }

    pub fn debug_retain_artifacts(mut self, v: bool) -> Self {
        self.raw.debug_retain_artifacts = v;
        self
    }

    /// Renderer timeout. Sub-millisecond durations round down to zero and
    /// are rejected.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.raw.timeout_ms = Some(timeout.as_millis().min(u64::MAX as u128) as u64);
        self
    }

    pub fn renderer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.raw.renderer_path = Some(path.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.raw.environment.insert(key.into(), value.into());
        self
    }

    pub fn overwrite(mut self, v: bool) -> Self {
        self.raw.overwrite = Some(v);
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.raw.title = Some(title.into());
        self
    }

    /// Replace the default comrak-based Markdown parser.
    pub fn markdown_parser(mut self, parser: Arc<dyn MarkdownParser>) -> Self {
        self.markdown_parser = Some(parser);
        self
    }

    pub fn progress_callback(mut self, cb: Arc<dyn ConversionProgressCallback>) -> Self {
        self.progress_callback = Some(cb);
        self
    }

    /// Build the option set, validating constraints.
    pub fn build(self) -> Result<OptionSet, ValidationError> {
        validate_with(self.raw, self.markdown_parser, self.progress_callback)
    }
}
