//! Built-in stylesheets and the HTML skeleton.
//!
//! Every piece of constant markup the composer can emit lives here so the
//! composer itself only deals with assembly. Callers override the
//! stylesheet with a CSS file and the skeleton with an HTML template; the
//! constants are used only when no override is provided.

use crate::config::Theme;

/// Placeholder replaced by the rendered Markdown body in user templates.
pub const BODY_PLACEHOLDER: &str = "{$html}";

/// Optional placeholder replaced by the `<style>` block in user templates.
pub const STYLE_PLACEHOLDER: &str = "{$css}";

/// Stylesheet text for a built-in theme.
pub fn stylesheet(theme: Theme) -> &'static str {
    match theme {
        Theme::Default => DEFAULT_CSS,
        Theme::Github => GITHUB_CSS,
    }
}

/// Plain print stylesheet: serif body text, restrained headings.
pub const DEFAULT_CSS: &str = r#"html {
  font-size: 11pt;
}
body {
  font-family: "Georgia", "Times New Roman", serif;
  line-height: 1.5;
  color: #222;
  margin: 0;
}
h1, h2, h3, h4, h5, h6 {
  font-family: "Helvetica Neue", "Arial", sans-serif;
  line-height: 1.25;
  page-break-after: avoid;
}
h1 { font-size: 2em; margin: 0.67em 0; }
h2 { font-size: 1.5em; margin: 0.83em 0; }
h3 { font-size: 1.17em; }
p, ul, ol, dl, table, pre, blockquote {
  margin: 0 0 1em 0;
}
a { color: #1a4d8f; text-decoration: none; }
img { max-width: 100%; page-break-inside: avoid; }
code, pre {
  font-family: "DejaVu Sans Mono", "Courier New", monospace;
  font-size: 0.9em;
}
pre {
  padding: 0.75em;
  background: #f5f5f5;
  border: 1px solid #ddd;
  white-space: pre-wrap;
  page-break-inside: avoid;
}
blockquote {
  padding-left: 1em;
  border-left: 3px solid #ccc;
  color: #555;
}
table { border-collapse: collapse; }
th, td { border: 1px solid #bbb; padding: 0.3em 0.6em; }
th { background: #eee; }
tr { page-break-inside: avoid; }
hr { border: 0; border-top: 1px solid #ccc; }
"#;

/// Approximation of GitHub's Markdown rendering.
pub const GITHUB_CSS: &str = r#"body {
  font-family: -apple-system, "Segoe UI", "Helvetica", "Arial", sans-serif;
  font-size: 16px;
  line-height: 1.5;
  color: #24292f;
  word-wrap: break-word;
  margin: 0;
}
h1, h2, h3, h4, h5, h6 {
  margin-top: 24px;
  margin-bottom: 16px;
  font-weight: 600;
  line-height: 1.25;
  page-break-after: avoid;
}
h1 { font-size: 2em; padding-bottom: 0.3em; border-bottom: 1px solid #d0d7de; }
h2 { font-size: 1.5em; padding-bottom: 0.3em; border-bottom: 1px solid #d0d7de; }
h3 { font-size: 1.25em; }
h4 { font-size: 1em; }
h5 { font-size: 0.875em; }
h6 { font-size: 0.85em; color: #57606a; }
p, blockquote, ul, ol, dl, table, pre, details {
  margin-top: 0;
  margin-bottom: 16px;
}
a { color: #0969da; text-decoration: none; }
img { max-width: 100%; box-sizing: content-box; page-break-inside: avoid; }
code, kbd, pre, samp {
  font-family: ui-monospace, "SFMono-Regular", "Consolas", "Liberation Mono", monospace;
}
code {
  padding: 0.2em 0.4em;
  margin: 0;
  font-size: 85%;
  background-color: rgba(175, 184, 193, 0.2);
  border-radius: 6px;
}
pre {
  padding: 16px;
  overflow: auto;
  font-size: 85%;
  line-height: 1.45;
  background-color: #f6f8fa;
  border-radius: 6px;
  page-break-inside: avoid;
}
pre code {
  padding: 0;
  background-color: transparent;
  border: 0;
}
blockquote {
  margin-left: 0;
  padding: 0 1em;
  color: #57606a;
  border-left: 0.25em solid #d0d7de;
}
table {
  border-spacing: 0;
  border-collapse: collapse;
  display: table;
}
table th { font-weight: 600; }
table th, table td { padding: 6px 13px; border: 1px solid #d0d7de; }
table tr { background-color: #ffffff; border-top: 1px solid #d8dee4; page-break-inside: avoid; }
table tr:nth-child(2n) { background-color: #f6f8fa; }
hr {
  height: 0.25em;
  padding: 0;
  margin: 24px 0;
  background-color: #d0d7de;
  border: 0;
}
ul.contains-task-list { list-style-type: none; padding-left: 1.2em; }
.footnotes { font-size: 85%; color: #57606a; border-top: 1px solid #d0d7de; }
"#;

/// Wrap a rendered body in the built-in page skeleton.
///
/// `title` must already be HTML-escaped; `head` is inserted verbatim.
pub fn skeleton(title: &str, head: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n{head}</head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}
