//! Input resolution: turn a [`MarkdownSource`] into Markdown text.
//!
//! Inline text is used as-is. File sources are read as UTF-8 with a leading
//! byte-order mark removed, since editors on some platforms add one and the
//! parser would otherwise emit it as a stray character.

use crate::config::MarkdownSource;
use crate::error::ConversionError;
use tracing::debug;

/// Read the Markdown for a conversion.
pub async fn resolve_source(source: &MarkdownSource) -> Result<String, ConversionError> {
    match source {
        MarkdownSource::Text(text) => Ok(text.clone()),
        MarkdownSource::File(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ConversionError::io("read Markdown file", path, e))?;
            debug!("Read Markdown file: {} ({} bytes)", path.display(), text.len());
            Ok(strip_bom(text))
        }
    }
}

fn strip_bom(text: String) -> String {
    if text.starts_with('\u{FEFF}') {
        text['\u{FEFF}'.len_utf8()..].to_string()
    } else {
        text
    }
}
