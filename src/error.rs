//! Error types for the md2pdf library.
//!
//! Each pipeline stage has its own narrow error type:
//!
//! * [`ValidationError`]: the options themselves are unusable.
//! * [`ParseError`]: the Markdown collaborator rejected the input.
//! * [`TemplateError`]: a user HTML template is malformed.
//!
//! All of them, plus renderer invocation failures and I/O failures, are
//! folded into [`ConversionError`] at the coordinator boundary. Callers that
//! only need to branch on the failure category use [`ConversionError::kind`].

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::render::InvocationOutcome;

/// Options rejected by [`crate::config::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Both or neither of the Markdown file and inline text were given.
    #[error("Exactly one Markdown source is required: {detail}")]
    ConflictingSource { detail: String },

    /// A referenced input file does not exist or cannot be read.
    #[error("{field} '{path}' does not exist or is not a readable file")]
    MissingFile { field: &'static str, path: PathBuf },

    /// A numeric option is outside its permitted range.
    #[error("{field} must be {expected}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        expected: &'static str,
    },

    /// No output path was supplied.
    #[error("An output path is required")]
    MissingOutput,
}

/// The Markdown collaborator failed to produce HTML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Markdown parsing failed: {message}")]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A user-supplied HTML template cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template does not contain the body placeholder token.
    #[error("HTML template '{path}' has no '{token}' placeholder for the document body")]
    MissingPlaceholder { path: PathBuf, token: &'static str },
}

/// Flat discriminant of [`ConversionError`], one value per failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    ConflictingSource,
    MissingFile,
    OutOfRange,
    MissingOutput,
    Parse,
    MissingPlaceholder,
    Timeout,
    LaunchFailure,
    NonZeroExit,
    Io,
}

/// All errors returned by the md2pdf conversion entry points.
#[derive(Debug, Error)]
pub enum ConversionError {
    // ── Option errors ─────────────────────────────────────────────────────
    #[error("Invalid options: {0}")]
    Validation(#[from] ValidationError),

    // ── Content errors ────────────────────────────────────────────────────
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    // ── Renderer errors ───────────────────────────────────────────────────
    /// The renderer did not produce a usable PDF.
    ///
    /// `stderr` is whatever the renderer printed before it exited or was
    /// killed; it is often the only clue to what went wrong.
    #[error("{}", invocation_message(.outcome, .diagnostic, .exit_code, .stderr))]
    Invocation {
        outcome: InvocationOutcome,
        exit_code: Option<i32>,
        diagnostic: String,
        stderr: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    #[error("Failed to {action} '{path}': {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConversionError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConversionError::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// The failure category, without payload.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::Validation(v) => match v {
                ValidationError::ConflictingSource { .. } => ErrorKind::ConflictingSource,
                ValidationError::MissingFile { .. } => ErrorKind::MissingFile,
                ValidationError::OutOfRange { .. } => ErrorKind::OutOfRange,
                ValidationError::MissingOutput => ErrorKind::MissingOutput,
            },
            ConversionError::Parse(_) => ErrorKind::Parse,
            ConversionError::Template(TemplateError::MissingPlaceholder { .. }) => {
                ErrorKind::MissingPlaceholder
            }
            ConversionError::Invocation { outcome, .. } => match outcome {
                InvocationOutcome::Timeout => ErrorKind::Timeout,
                InvocationOutcome::LaunchFailure => ErrorKind::LaunchFailure,
                // Success never becomes an error.
                InvocationOutcome::NonZeroExit | InvocationOutcome::Success => {
                    ErrorKind::NonZeroExit
                }
            },
            ConversionError::Io { .. } | ConversionError::Internal(_) => ErrorKind::Io,
        }
    }
}

fn invocation_message(
    outcome: &InvocationOutcome,
    diagnostic: &str,
    exit_code: &Option<i32>,
    stderr: &str,
) -> String {
    let mut msg = match (outcome, exit_code) {
        (InvocationOutcome::NonZeroExit, Some(code)) => {
            format!("Renderer failed (exit {code}): {diagnostic}")
        }
        _ => format!("Renderer failed ({}): {diagnostic}", outcome.as_str()),
    };
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        msg.push_str("\nRenderer stderr:\n");
        msg.push_str(stderr);
    }
    if *outcome == InvocationOutcome::LaunchFailure {
        msg.push_str(
            "\nInstall wkhtmltopdf or point --renderer / WKHTMLTOPDF_PATH at the binary.",
        );
    }
    msg
}
