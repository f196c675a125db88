//! Markdown → HTML fragment, through a pluggable parser.
//!
//! The pipeline only needs "Markdown text in, HTML fragment out", so the
//! parser sits behind the small [`MarkdownParser`] trait. [`ComrakParser`]
//! is the default; callers can inject their own implementation through
//! [`crate::config::OptionSetBuilder::markdown_parser`].

use crate::config::MarkdownExtensions;
use crate::error::ParseError;
use comrak::markdown_to_html;
use comrak::options::Options;
use tracing::debug;

/// Converts Markdown text into an HTML fragment (no `<html>`/`<body>`).
pub trait MarkdownParser: Send + Sync {
    fn to_html(&self, markdown: &str, extensions: &MarkdownExtensions) -> Result<String, ParseError>;
}

/// Default parser backed by comrak (CommonMark + GFM extensions).
#[derive(Debug, Clone, Copy, Default)]
pub struct ComrakParser;

impl ComrakParser {
    /// Build comrak options from the requested extension set.
    fn options(extensions: &MarkdownExtensions) -> Options<'static> {
        let mut options = Options::default();
        if extensions.pipe_tables {
            options.extension.table = true;
        }
        if extensions.advanced {
            options.extension.table = true;
            options.extension.strikethrough = true;
            options.extension.tasklist = true;
            options.extension.autolink = true;
            options.extension.footnotes = true;
            options.extension.superscript = true;
            options.extension.description_lists = true;
            options.extension.header_id_prefix = Some(String::new());
        }
        // Raw HTML in the source reaches the renderer untouched.
        options.render.r#unsafe = true;
        options
    }
}

impl MarkdownParser for ComrakParser {
    fn to_html(&self, markdown: &str, extensions: &MarkdownExtensions) -> Result<String, ParseError> {
        let html = markdown_to_html(markdown, &Self::options(extensions));
        debug!(
            markdown_bytes = markdown.len(),
            html_bytes = html.len(),
            "Parsed Markdown"
        );
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "| A | B |\n| --- | --- |\n| 1 | 2 |\n";

    #[test]
    fn heading() {
        let html = ComrakParser
            .to_html("# Hi", &MarkdownExtensions::default())
            .unwrap();
        assert_eq!(html.trim(), "<h1>Hi</h1>");
    }

    #[test]
    fn tables_need_an_extension() {
        let plain = ComrakParser
            .to_html(TABLE, &MarkdownExtensions::default())
            .unwrap();
        assert!(!plain.contains("<table>"));

        let piped = ComrakParser
            .to_html(
                TABLE,
                &MarkdownExtensions {
                    pipe_tables: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(piped.contains("<table>"));
    }

    #[test]
    fn advanced_enables_strikethrough_and_tables() {
        let ext = MarkdownExtensions {
            advanced: true,
            ..Default::default()
        };
        let html = ComrakParser.to_html("~~gone~~", &ext).unwrap();
        assert!(html.contains("<del>gone</del>"), "got: {html}");
        let html = ComrakParser.to_html(TABLE, &ext).unwrap();
        assert!(html.contains("<table>"));
    }

    #[test]
    fn advanced_gives_headings_anchor_ids() {
        let ext = MarkdownExtensions {
            advanced: true,
            ..Default::default()
        };
        let html = ComrakParser.to_html("## Getting Started", &ext).unwrap();
        assert!(html.contains("id=\"getting-started\""), "got: {html}");

        let plain = ComrakParser
            .to_html("## Getting Started", &MarkdownExtensions::default())
            .unwrap();
        assert_eq!(plain.trim(), "<h2>Getting Started</h2>");
    }

    #[test]
    fn raw_html_passes_through() {
        let html = ComrakParser
            .to_html("<div class=\"note\">x</div>\n", &MarkdownExtensions::default())
            .unwrap();
        assert!(html.contains("<div class=\"note\">x</div>"));
    }
}
