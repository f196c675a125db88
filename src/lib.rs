//! # md2pdf
//!
//! Convert Markdown documents to PDF by rendering generated HTML through
//! `wkhtmltopdf`.
//!
//! ## Pipeline Overview
//!
//! ```text
//! Markdown
//!  │
//!  ├─ 1. Validate  options checked once, defaults applied (OptionSet)
//!  ├─ 2. Parse     Markdown → HTML fragment (comrak, or your own parser)
//!  ├─ 3. Compose   fragment + theme CSS + optional template → HTML page
//!  ├─ 4. Stage     write the page into a scoped directory beside the output
//!  ├─ 5. Render    wkhtmltopdf with a timeout; stderr captured
//!  └─ 6. Finalize  atomic move onto the output path, staging removed
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use md2pdf::{convert, OptionSet, Theme};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = OptionSet::builder()
//!         .markdown_file("CHANGELOG.md")
//!         .output_path("CHANGELOG.pdf")
//!         .theme(Theme::Github)
//!         .build()?;
//!     let output = convert(&options).await?;
//!     eprintln!("{} bytes in {}ms",
//!         output.stats.output_bytes,
//!         output.stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `md2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! md2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Renderer
//!
//! `wkhtmltopdf` must be installed. It is looked up on `PATH` unless
//! [`OptionSetBuilder::renderer_path`] names a binary.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod cancel;
pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod themes;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::convert_all;
pub use cancel::{cancel_pair, CancelHandle, CancelToken};
pub use config::{
    validate, MarkdownExtensions, MarkdownSource, Margins, OptionSet, OptionSetBuilder,
    Orientation, PageSize, RawMargins, RawOptions, Theme,
};
pub use convert::{convert, convert_sync, convert_with_cancel, ConversionStage};
pub use error::{ConversionError, ErrorKind, ParseError, TemplateError, ValidationError};
pub use output::{ConversionOutput, ConversionStats};
pub use pipeline::compose::{compose, ComposedDocument, StylesheetSource};
pub use pipeline::markdown::{ComrakParser, MarkdownParser};
pub use pipeline::render::{InvocationOutcome, InvocationResult};
pub use progress::{ConversionProgressCallback, NoopProgressCallback};
