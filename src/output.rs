//! Conversion results.

use serde::Serialize;
use std::path::PathBuf;

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionOutput {
    /// Where the PDF now lives (the requested output path).
    pub output_path: PathBuf,
    /// The staged HTML, when debug retention was requested.
    pub retained_html: Option<PathBuf>,
    pub stats: ConversionStats,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConversionStats {
    /// Size of the composed HTML document.
    pub html_bytes: u64,
    /// Size of the final PDF.
    pub output_bytes: u64,
    /// Wall-clock time spent in the renderer process.
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
    pub used_custom_template: bool,
}
