//! Renderer invocation: run wkhtmltopdf on a staged HTML file.
//!
//! ## Outcome classification
//!
//! | What happened                                   | Outcome         |
//! |-------------------------------------------------|-----------------|
//! | process could not be started                    | `LaunchFailure` |
//! | still running when the timeout elapsed          | `Timeout`       |
//! | cancelled through a [`CancelToken`]             | `Timeout`       |
//! | exited non-zero or was killed by a signal       | `NonZeroExit`   |
//! | exited 0 but the output file is missing/empty   | `NonZeroExit`   |
//! | exited 0 with a non-empty output file           | `Success`       |
//!
//! wkhtmltopdf sometimes exits 0 after failing to load the page, leaving no
//! PDF behind, which is why a zero exit status alone is not success.
//!
//! On timeout or cancellation the child is killed *and reaped* before this
//! module returns. If the calling future is dropped instead, `kill_on_drop`
//! terminates the child.

use crate::cancel::CancelToken;
use crate::config::OptionSet;
use crate::error::ConversionError;
use crate::pipeline::args::build_arguments;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// How long to keep draining stderr after the child has gone away.
const STDERR_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvocationOutcome {
    Success,
    Timeout,
    NonZeroExit,
    LaunchFailure,
}

impl InvocationOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            InvocationOutcome::Success => "success",
            InvocationOutcome::Timeout => "timeout",
            InvocationOutcome::NonZeroExit => "non-zero exit",
            InvocationOutcome::LaunchFailure => "launch failure",
        }
    }
}

/// Everything known about one renderer run.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationResult {
    pub outcome: InvocationOutcome,
    /// `None` when the process never started or died from a signal.
    pub exit_code: Option<i32>,
    pub stderr: String,
    pub duration: Duration,
    /// Arguments passed to the renderer (lossy UTF-8, for diagnostics).
    pub args: Vec<String>,
    /// Set when a `Timeout` outcome came from cancellation.
    pub cancelled: bool,
    /// Human-readable explanation for non-success outcomes.
    pub diagnostic: Option<String>,
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        self.outcome == InvocationOutcome::Success
    }

    /// Convert a failed invocation into the coordinator's error type.
    pub fn into_error(self) -> ConversionError {
        ConversionError::Invocation {
            outcome: self.outcome,
            exit_code: self.exit_code,
            diagnostic: self
                .diagnostic
                .unwrap_or_else(|| self.outcome.as_str().to_string()),
            stderr: self.stderr,
        }
    }
}

/// Render `html_path` to `output_path` with the options' renderer.
pub async fn render(html_path: &Path, options: &OptionSet, output_path: &Path) -> InvocationResult {
    render_with_cancel(html_path, options, output_path, &mut CancelToken::never()).await
}

/// Like [`render`], but stops early when `cancel` fires.
pub async fn render_with_cancel(
    html_path: &Path,
    options: &OptionSet,
    output_path: &Path,
    cancel: &mut CancelToken,
) -> InvocationResult {
    let program = options.renderer_path();
    let args = build_arguments(html_path, options, output_path);
    let display_args: Vec<String> = args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    debug!("Running {} {}", program.display(), display_args.join(" "));

    let started = Instant::now();
    let result = |outcome: InvocationOutcome,
                  exit_code: Option<i32>,
                  stderr: String,
                  diagnostic: Option<String>| InvocationResult {
        outcome,
        exit_code,
        stderr,
        duration: started.elapsed(),
        args: display_args.clone(),
        cancelled: false,
        diagnostic,
    };

    if cancel.is_cancelled() {
        let mut r = result(
            InvocationOutcome::Timeout,
            None,
            String::new(),
            Some("conversion was cancelled before the renderer started".to_string()),
        );
        r.cancelled = true;
        return r;
    }

    let mut child = match Command::new(program)
        .args(&args)
        .envs(options.environment())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(err) => {
            warn!(
                op = "render",
                result = "launch_failure",
                program = %program.display(),
                error = %err,
                "Failed to start renderer"
            );
            let diagnostic = format!("could not start '{}': {err}", program.display());
            return result(InvocationOutcome::LaunchFailure, None, String::new(), Some(diagnostic));
        }
    };

    let mut stderr_task = child.stderr.take().map(|mut pipe| {
        tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        })
    });

    enum Waited {
        Exited(std::io::Result<ExitStatus>),
        TimedOut,
        Cancelled,
    }

    let timeout = options.timeout();
    let waited = tokio::select! {
        status = child.wait() => Waited::Exited(status),
        _ = tokio::time::sleep(timeout) => Waited::TimedOut,
        _ = cancel.cancelled() => Waited::Cancelled,
    };

    let cancelled = match waited {
        Waited::Exited(Err(err)) => {
            let stderr = drain_stderr(stderr_task.as_mut()).await;
            let diagnostic = format!("failed to wait for renderer: {err}");
            return result(InvocationOutcome::NonZeroExit, None, stderr, Some(diagnostic));
        }
        Waited::Exited(Ok(status)) => {
            let stderr = drain_stderr(stderr_task.as_mut()).await;
            return classify_exit(status, output_path, stderr, result).await;
        }
        Waited::TimedOut => false,
        Waited::Cancelled => true,
    };

    // `kill` also waits, so the process is reaped on return.
    if let Err(err) = child.kill().await {
        warn!(error = %err, "Failed to kill renderer process");
    }
    let stderr = drain_stderr(stderr_task.as_mut()).await;
    let diagnostic = if cancelled {
        "conversion was cancelled; renderer terminated".to_string()
    } else {
        format!(
            "renderer did not finish within {}s and was terminated",
            timeout.as_secs_f64()
        )
    };
    warn!(
        op = "render",
        result = "timeout",
        cancelled,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Renderer stopped before completion"
    );
    let mut r = result(InvocationOutcome::Timeout, None, stderr, Some(diagnostic));
    r.cancelled = cancelled;
    r
}

async fn classify_exit<F>(
    status: ExitStatus,
    output_path: &Path,
    stderr: String,
    result: F,
) -> InvocationResult
where
    F: Fn(InvocationOutcome, Option<i32>, String, Option<String>) -> InvocationResult,
{
    let code = status.code();
    if !status.success() {
        let diagnostic = match code {
            Some(c) => format!("renderer exited with status {c}"),
            None => "renderer was terminated by a signal".to_string(),
        };
        let r = result(InvocationOutcome::NonZeroExit, code, stderr, Some(diagnostic));
        warn!(
            op = "render",
            result = "non_zero_exit",
            exit_code = code.map(i64::from).unwrap_or(-1),
            elapsed_ms = r.duration.as_millis() as u64,
            stderr = %r.stderr.trim(),
            "Renderer failed"
        );
        return r;
    }

    let produced = tokio::fs::metadata(output_path)
        .await
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);
    if !produced {
        let diagnostic = format!(
            "renderer exited successfully but produced no output at '{}' (silent failure)",
            output_path.display()
        );
        warn!(
            op = "render",
            result = "empty_output",
            output = %output_path.display(),
            "Renderer exited 0 without writing a PDF"
        );
        return result(InvocationOutcome::NonZeroExit, code, stderr, Some(diagnostic));
    }

    let r = result(InvocationOutcome::Success, code, stderr, None);
    info!(
        op = "render",
        result = "success",
        elapsed_ms = r.duration.as_millis() as u64,
        "Renderer finished"
    );
    r
}

/// Collect captured stderr, giving up after [`STDERR_GRACE`].
///
/// A grandchild that inherited the pipe can keep it open after the child
/// itself is gone; the reader is aborted in that case.
async fn drain_stderr(task: Option<&mut JoinHandle<String>>) -> String {
    let Some(task) = task else {
        return String::new();
    };
    match tokio::time::timeout(STDERR_GRACE, &mut *task).await {
        Ok(Ok(text)) => text,
        Ok(Err(_)) => String::new(),
        Err(_) => {
            task.abort();
            String::new()
        }
    }
}
