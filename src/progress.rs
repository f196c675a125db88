//! Progress-callback trait for conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::OptionSetBuilder::progress_callback`] to observe the
//! coordinator as it moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use md2pdf::{ConversionProgressCallback, ConversionStage, OptionSet};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct StageLog(Mutex<Vec<ConversionStage>>);
//!
//! impl ConversionProgressCallback for StageLog {
//!     fn on_stage(&self, stage: ConversionStage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let log = Arc::new(StageLog::default());
//! let options = OptionSet::builder()
//!     .markdown_text("# Hi")
//!     .output_path("hi.pdf")
//!     .progress_callback(log.clone() as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::convert::ConversionStage;
use crate::output::ConversionOutput;
use std::sync::Arc;

/// Receives coordinator events.
///
/// Batch conversion calls the same callback from several conversions at
/// once, so implementations must be `Send + Sync` and synchronise any
/// shared state. All methods default to no-ops.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called on entry to every stage, `Done` and `Failed` included.
    fn on_stage(&self, stage: ConversionStage) {
        let _ = stage;
    }

    /// Called once after the PDF is in place.
    fn on_complete(&self, output: &ConversionOutput) {
        let _ = output;
    }

    /// Called once when the conversion fails.
    ///
    /// # Arguments
    /// * `stage` - the stage that was running when the failure happened
    /// * `error` - human-readable error description
    fn on_error(&self, stage: ConversionStage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::OptionSet`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
