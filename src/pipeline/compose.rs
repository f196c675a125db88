//! Document composition: HTML fragment + stylesheet + template → one page.
//!
//! ## Determinism
//!
//! The output depends only on the body, the option values and the contents
//! of the referenced CSS/template files. Nothing time- or random-dependent
//! is emitted, so converting the same input twice stages byte-identical
//! HTML.
//!
//! ## Head injection
//!
//! The `<style>` block (preceded by a `<base href>` when the Markdown came
//! from a file) goes to the first of these that exists in a user template:
//!
//! 1. the `{$css}` placeholder,
//! 2. just before `</head>`,
//! 3. directly in front of the body.

use crate::config::{MarkdownSource, OptionSet, Theme};
use crate::error::{ConversionError, TemplateError};
use crate::themes::{self, BODY_PLACEHOLDER, STYLE_PLACEHOLDER};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Where the injected stylesheet came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum StylesheetSource {
    Builtin(Theme),
    File(PathBuf),
}

/// A complete, self-contained HTML document ready for staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedDocument {
    pub html: String,
    pub byte_len: usize,
    pub used_custom_template: bool,
    pub stylesheet: StylesheetSource,
}

static RE_HEAD_CLOSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</head\s*>").unwrap());

/// Assemble the final HTML document for `body`.
///
/// # Errors
/// - [`TemplateError::MissingPlaceholder`] if a template lacks `{$html}`
/// - `Io` if the template or CSS file cannot be read
pub fn compose(body: &str, options: &OptionSet) -> Result<ComposedDocument, ConversionError> {
    // Template first: a bad template should fail before any other read.
    let template = match options.html_template_path() {
        Some(path) => Some(load_template(path)?),
        None => None,
    };

    let (css, stylesheet) = match options.css_path() {
        Some(path) => (
            std::fs::read_to_string(path)
                .map_err(|e| ConversionError::io("read CSS file", path, e))?,
            StylesheetSource::File(path.to_path_buf()),
        ),
        None => (
            themes::stylesheet(options.theme()).to_string(),
            StylesheetSource::Builtin(options.theme()),
        ),
    };

    let head = head_injection(&css, base_href(options.source()).as_deref());
    let used_custom_template = template.is_some();

    let html = match template {
        Some(template) => fill_template(&template, &head, body),
        None => {
            let title = html_escape::encode_text(&options.title()).into_owned();
            themes::skeleton(&title, &head, body.trim_end())
        }
    };

    debug!(
        html_bytes = html.len(),
        custom_template = used_custom_template,
        "Composed HTML document"
    );

    Ok(ComposedDocument {
        byte_len: html.len(),
        html,
        used_custom_template,
        stylesheet,
    })
}

fn load_template(path: &Path) -> Result<String, ConversionError> {
    let template = std::fs::read_to_string(path)
        .map_err(|e| ConversionError::io("read HTML template", path, e))?;
    if !template.contains(BODY_PLACEHOLDER) {
        return Err(TemplateError::MissingPlaceholder {
            path: path.to_path_buf(),
            token: BODY_PLACEHOLDER,
        }
        .into());
    }
    Ok(template)
}

fn fill_template(template: &str, head: &str, body: &str) -> String {
    if template.contains(STYLE_PLACEHOLDER) {
        return template
            .replace(STYLE_PLACEHOLDER, head)
            .replace(BODY_PLACEHOLDER, body);
    }

    if let Some(m) = RE_HEAD_CLOSE.find(template) {
        let mut out = String::with_capacity(template.len() + head.len() + body.len());
        out.push_str(&template[..m.start()]);
        out.push_str(head);
        out.push_str(&template[m.start()..]);
        return out.replace(BODY_PLACEHOLDER, body);
    }

    let injected = format!("{head}{body}");
    template.replace(BODY_PLACEHOLDER, &injected)
}

fn head_injection(css: &str, base: Option<&str>) -> String {
    let mut head = String::new();
    if let Some(href) = base {
        head.push_str("<base href=\"");
        head.push_str(&html_escape::encode_double_quoted_attribute(href));
        head.push_str("\">\n");
    }
    head.push_str("<style>\n");
    head.push_str(css.trim_end());
    head.push_str("\n</style>\n");
    head
}

/// `file://` URL of the Markdown file's directory, trailing slash included.
fn base_href(source: &MarkdownSource) -> Option<String> {
    match source {
        MarkdownSource::File(path) => path
            .parent()
            .and_then(|dir| Url::from_directory_path(dir).ok())
            .map(String::from),
        MarkdownSource::Text(_) => None,
    }
}
