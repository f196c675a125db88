//! Concurrent conversion of independent documents.

use crate::config::OptionSet;
use crate::convert::convert;
use crate::error::ConversionError;
use crate::output::ConversionOutput;
use futures::stream::{self, StreamExt};
use tracing::info;

/// Convert every option set, running at most `concurrency` renderers at a
/// time. Results come back in input order; one failure does not stop the
/// others.
///
/// A `concurrency` of zero is treated as one.
pub async fn convert_all(
    jobs: &[OptionSet],
    concurrency: usize,
) -> Vec<Result<ConversionOutput, ConversionError>> {
    let limit = concurrency.max(1);
    info!("Converting {} documents, concurrency {}", jobs.len(), limit);

    let mut results: Vec<(usize, Result<ConversionOutput, ConversionError>)> =
        stream::iter(jobs.iter().enumerate().map(|(idx, options)| async move {
            (idx, convert(options).await)
        }))
        .buffer_unordered(limit)
        .collect()
        .await;

    results.sort_by_key(|(idx, _)| *idx);
    let failed = results.iter().filter(|(_, r)| r.is_err()).count();
    info!("Batch finished: {} ok, {} failed", results.len() - failed, failed);
    results.into_iter().map(|(_, r)| r).collect()
}
