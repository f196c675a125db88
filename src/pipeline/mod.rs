//! Pipeline stages for Markdown-to-PDF conversion.
//!
//! Each submodule implements one transformation step; the coordinator in
//! [`crate::convert`] strings them together.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ markdown ──▶ compose ──▶ stage ──▶ render (args) ──▶ stage
//! (text)    (comrak)     (HTML doc)  (write)  (wkhtmltopdf)     (rename)
//! ```
//!
//! 1. [`input`]: read the Markdown file or take the inline text
//! 2. [`markdown`]: Markdown to an HTML fragment behind a pluggable trait
//! 3. [`compose`]: fragment + stylesheet + template into one document
//! 4. [`stage`]: scoped directory next to the output, atomic final move
//! 5. [`render`]: run the renderer with arguments from [`args`], bounded by
//!    the timeout, and classify the outcome

pub mod args;
pub mod compose;
pub mod input;
pub mod markdown;
pub mod render;
pub mod stage;
