//! Conversion coordinator: one Markdown document to one PDF.
//!
//! ## Stages
//!
//! ```text
//! Idle ─▶ Validating ─▶ Composing ─▶ Staging ─▶ Rendering ─▶ Finalizing ─▶ Done
//!              │             │           │           │             │
//!              └─────────────┴───────────┴─────┬─────┴─────────────┘
//!                                              ▼
//!                                            Failed
//! ```
//!
//! Nothing is written at the output path unless `Finalizing` succeeds. The
//! staging directory is removed on every exit path; with
//! `debug_retain_artifacts` the staged HTML is first linked beside the
//! output, on failure as well as on success.

use crate::cancel::CancelToken;
use crate::config::OptionSet;
use crate::error::ConversionError;
use crate::output::{ConversionOutput, ConversionStats};
use crate::pipeline::compose::{compose, ComposedDocument};
use crate::pipeline::markdown::{ComrakParser, MarkdownParser};
use crate::pipeline::stage::StagingArea;
use crate::pipeline::{input, render};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where a conversion currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConversionStage {
    Idle,
    Validating,
    Composing,
    Staging,
    Rendering,
    Finalizing,
    Done,
    Failed,
}

impl ConversionStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ConversionStage::Idle => "idle",
            ConversionStage::Validating => "validating",
            ConversionStage::Composing => "composing",
            ConversionStage::Staging => "staging",
            ConversionStage::Rendering => "rendering",
            ConversionStage::Finalizing => "finalizing",
            ConversionStage::Done => "done",
            ConversionStage::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ConversionStage::Done | ConversionStage::Failed)
    }
}

impl fmt::Display for ConversionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert the Markdown described by `options` to a PDF at its output path.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// - `Validation` if an input file vanished since the options were built
/// - `Parse` / `Template` for unusable content
/// - `Invocation` when the renderer times out, cannot start, or fails
/// - `Io` for staging and finalizing failures (including a refused
///   overwrite)
///
/// # Example
/// ```rust,no_run
/// use md2pdf::{convert, OptionSet};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let options = OptionSet::builder()
///     .markdown_file("README.md")
///     .output_path("README.pdf")
///     .build()?;
/// let output = convert(&options).await?;
/// println!("wrote {}", output.output_path.display());
/// # Ok(())
/// # }
/// ```
pub async fn convert(options: &OptionSet) -> Result<ConversionOutput, ConversionError> {
    convert_with_cancel(options, CancelToken::never()).await
}

/// Like [`convert`], but the renderer is terminated when `cancel` fires.
///
/// A cancelled conversion fails with a `Timeout` invocation error.
pub async fn convert_with_cancel(
    options: &OptionSet,
    mut cancel: CancelToken,
) -> Result<ConversionOutput, ConversionError> {
    Coordinator::new(options).run(&mut cancel).await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally, so it must not be called
/// from inside an async context.
pub fn convert_sync(options: &OptionSet) -> Result<ConversionOutput, ConversionError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConversionError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert(options))
}

struct Coordinator<'a> {
    options: &'a OptionSet,
    stage: ConversionStage,
    started: Instant,
}

impl<'a> Coordinator<'a> {
    fn new(options: &'a OptionSet) -> Self {
        Self {
            options,
            stage: ConversionStage::Idle,
            started: Instant::now(),
        }
    }

    fn enter(&mut self, next: ConversionStage) {
        debug!(
            from = self.stage.as_str(),
            to = next.as_str(),
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "Stage transition"
        );
        self.stage = next;
        if let Some(cb) = self.options.progress_callback() {
            cb.on_stage(next);
        }
    }

    async fn run(mut self, cancel: &mut CancelToken) -> Result<ConversionOutput, ConversionError> {
        info!("Starting conversion: {}", self.options.output_path().display());

        match self.drive(cancel).await {
            Ok(output) => {
                self.enter(ConversionStage::Done);
                info!(
                    output = %output.output_path.display(),
                    output_bytes = output.stats.output_bytes,
                    total_ms = output.stats.total_duration_ms,
                    "Conversion complete"
                );
                if let Some(cb) = self.options.progress_callback() {
                    cb.on_complete(&output);
                }
                Ok(output)
            }
            Err(err) => {
                let failed_in = self.stage;
                self.enter(ConversionStage::Failed);
                warn!(stage = failed_in.as_str(), error = %err, "Conversion failed");
                if let Some(cb) = self.options.progress_callback() {
                    cb.on_error(failed_in, &err.to_string());
                }
                Err(err)
            }
        }
    }

    async fn drive(&mut self, cancel: &mut CancelToken) -> Result<ConversionOutput, ConversionError> {
        let options = self.options;

        // ── Validating ───────────────────────────────────────────────────
        self.enter(ConversionStage::Validating);
        options.check_files()?;

        // ── Composing ────────────────────────────────────────────────────
        self.enter(ConversionStage::Composing);
        let markdown = input::resolve_source(options.source()).await?;
        let parser: &dyn MarkdownParser = match options.markdown_parser() {
            Some(p) => p.as_ref(),
            None => &ComrakParser,
        };
        let body = parser.to_html(&markdown, &options.markdown_extensions())?;
        let document = compose(&body, options)?;

        // ── Staging ──────────────────────────────────────────────────────
        self.enter(ConversionStage::Staging);
        let staging = StagingArea::create(options.output_path()).await?;

        let outcome = self.render_and_finalize(&staging, &document, cancel).await;

        let retained_html = if options.debug_retain_artifacts() {
            retain(&staging, options).await
        } else {
            None
        };
        if let Err(err) = staging.close() {
            warn!("Failed to remove staging directory: {err}");
        }

        let (output_bytes, render_duration_ms) = outcome?;
        Ok(ConversionOutput {
            output_path: options.output_path().to_path_buf(),
            retained_html,
            stats: ConversionStats {
                html_bytes: document.byte_len as u64,
                output_bytes,
                render_duration_ms,
                total_duration_ms: self.started.elapsed().as_millis() as u64,
                used_custom_template: document.used_custom_template,
            },
        })
    }

    /// Write, render and move into place. Returns `(output_bytes, render_ms)`.
    async fn render_and_finalize(
        &mut self,
        staging: &StagingArea,
        document: &ComposedDocument,
        cancel: &mut CancelToken,
    ) -> Result<(u64, u64), ConversionError> {
        let options = self.options;
        staging.write_html(&document.html).await?;

        // ── Rendering ────────────────────────────────────────────────────
        self.enter(ConversionStage::Rendering);
        let result =
            render::render_with_cancel(staging.html_path(), options, staging.pdf_path(), cancel)
                .await;
        let render_ms = result.duration.as_millis() as u64;
        if !result.is_success() {
            return Err(result.into_error());
        }

        // ── Finalizing ───────────────────────────────────────────────────
        self.enter(ConversionStage::Finalizing);
        let bytes = staging
            .finalize(options.output_path(), options.overwrite())
            .await?;
        Ok((bytes, render_ms))
    }
}

/// Move the staged HTML beside the output if it was written.
///
/// A failure here is logged and never replaces the conversion's own result.
async fn retain(staging: &StagingArea, options: &OptionSet) -> Option<PathBuf> {
    if !tokio::fs::try_exists(staging.html_path()).await.unwrap_or(false) {
        return None;
    }
    match staging.retain_html(options.output_path()).await {
        Ok(path) => {
            info!("Kept intermediate HTML at {}", path.display());
            Some(path)
        }
        Err(err) => {
            warn!("Could not keep intermediate HTML: {err}");
            None
        }
    }
}
