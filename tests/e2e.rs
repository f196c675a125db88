//! End-to-end integration tests for md2pdf.
//!
//! Most tests drive the full pipeline against a fake renderer: a small shell
//! script that records its arguments and writes a stub PDF to its last
//! argument. Tests against a real `wkhtmltopdf` are gated behind the
//! `E2E_ENABLED` environment variable.
//!
//! Run with:
//!   cargo test --test e2e -- --nocapture
//!
//! Including the real renderer:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
#![cfg(unix)]

use md2pdf::{
    cancel_pair, convert, convert_all, convert_with_cancel, ConversionProgressCallback,
    ConversionStage, ErrorKind, OptionSet, OptionSetBuilder, RawOptions,
};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Write an executable `/bin/sh` script into `dir`.
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Fake wkhtmltopdf: logs argv (one per line) to `args.log`, copies the
/// staged HTML to `seen.html`, writes a stub PDF to the last argument.
fn fake_renderer(dir: &Path) -> PathBuf {
    let log = dir.join("args.log");
    let seen = dir.join("seen.html");
    script(
        dir,
        "fake-wkhtmltopdf",
        &format!(
            r#": > '{log}'
for a in "$@"; do
  printf '%s\n' "$a" >> '{log}'
  case "$a" in *.html) cp "$a" '{seen}' ;; esac
  out="$a"
done
printf '%%PDF-1.4\n%%fake\n' > "$out""#,
            log = log.display(),
            seen = seen.display(),
        ),
    )
}

struct Workspace {
    dir: TempDir,
    renderer: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let renderer = fake_renderer(dir.path());
        Self { dir, renderer }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn out_dir(&self) -> PathBuf {
        let d = self.path("out");
        std::fs::create_dir_all(&d).unwrap();
        d
    }

    fn builder(&self) -> OptionSetBuilder {
        OptionSet::builder().renderer_path(&self.renderer)
    }

    fn logged_args(&self) -> Vec<String> {
        std::fs::read_to_string(self.path("args.log"))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn seen_html(&self) -> String {
        std::fs::read_to_string(self.path("seen.html")).unwrap()
    }
}

fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_inline_text_to_pdf_leaves_no_temporaries() {
    let ws = Workspace::new();
    let out_dir = ws.out_dir();
    let options = ws
        .builder()
        .markdown_text("# Hi")
        .output_path(out_dir.join("out.pdf"))
        .build()
        .unwrap();

    let output = convert(&options).await.unwrap();

    assert_eq!(output.output_path, out_dir.join("out.pdf"));
    assert!(output.retained_html.is_none());
    assert!(std::fs::read(&output.output_path).unwrap().starts_with(b"%PDF"));
    assert_eq!(entries(&out_dir), vec!["out.pdf"]);

    let args = ws.logged_args();
    assert_eq!(&args[..4], ["--page-size", "A4", "--orientation", "Portrait"]);
    assert_eq!(args.last().unwrap().rsplit('/').next().unwrap(), "output.pdf");

    let html = ws.seen_html();
    assert!(html.contains("<h1>Hi</h1>"));
    assert!(html.contains("<style>"));
}

#[tokio::test]
async fn test_debug_retains_html_beside_output() {
    let ws = Workspace::new();
    let out_dir = ws.out_dir();
    let options = ws
        .builder()
        .markdown_text("# Hi")
        .output_path(out_dir.join("out.pdf"))
        .debug_retain_artifacts(true)
        .build()
        .unwrap();

    let output = convert(&options).await.unwrap();

    assert_eq!(output.retained_html, Some(out_dir.join("out.html")));
    assert_eq!(entries(&out_dir), vec!["out.html", "out.pdf"]);
    assert_eq!(
        std::fs::read_to_string(out_dir.join("out.html")).unwrap(),
        ws.seen_html()
    );
}

#[tokio::test]
async fn test_debug_retention_never_replaces_template() {
    let ws = Workspace::new();
    let md = ws.path("report.md");
    std::fs::write(&md, "# Report\n").unwrap();
    let template = ws.path("report.html");
    let layout = "<html><head></head><body>MY TEMPLATE {$html}</body></html>";
    std::fs::write(&template, layout).unwrap();

    let options = ws
        .builder()
        .markdown_file(&md)
        .output_path(ws.path("report.pdf"))
        .html_template_path(&template)
        .debug_retain_artifacts(true)
        .overwrite(false)
        .build()
        .unwrap();

    let output = convert(&options).await.unwrap();

    assert_eq!(std::fs::read_to_string(&template).unwrap(), layout);
    assert_eq!(output.retained_html, Some(ws.path("report.md2pdf.html")));
    assert_eq!(
        std::fs::read_to_string(ws.path("report.md2pdf.html")).unwrap(),
        ws.seen_html()
    );
    assert!(ws.seen_html().contains("MY TEMPLATE <h1>Report</h1>"));
}

#[tokio::test]
async fn test_repeat_conversion_is_byte_identical() {
    let ws = Workspace::new();
    let md = ws.path("notes.md");
    std::fs::write(&md, "# Notes\n\n- one\n- two\n\n`code`\n").unwrap();
    let options = ws
        .builder()
        .markdown_file(&md)
        .output_path(ws.path("notes.pdf"))
        .build()
        .unwrap();

    convert(&options).await.unwrap();
    let first_html = ws.seen_html();
    let first_pdf = std::fs::read(ws.path("notes.pdf")).unwrap();

    convert(&options).await.unwrap();
    assert_eq!(ws.seen_html(), first_html);
    assert_eq!(std::fs::read(ws.path("notes.pdf")).unwrap(), first_pdf);
}

#[tokio::test]
async fn test_markdown_file_with_template_and_pass_through() {
    let ws = Workspace::new();
    let md = ws.path("guide.md");
    std::fs::write(&md, "# Guide\n\n| a | b |\n|---|---|\n| 1 | 2 |\n").unwrap();
    let template = ws.path("layout.html");
    std::fs::write(
        &template,
        "<html><head><title>Layout</title></head><body><main>{$html}</main></body></html>",
    )
    .unwrap();

    let options = ws
        .builder()
        .markdown_file(&md)
        .output_path(ws.path("nested/dir/guide.pdf"))
        .html_template_path(&template)
        .pipe_tables(true)
        .extra_global_args("--grayscale")
        .extra_page_args("--footer-center \"[page] of [topage]\"")
        .build()
        .unwrap();

    let output = convert(&options).await.unwrap();
    assert!(output.stats.used_custom_template);
    assert!(ws.path("nested/dir/guide.pdf").is_file());

    let html = ws.seen_html();
    assert!(html.contains("<main><h1>Guide</h1>"));
    assert!(html.contains("<table>"));
    assert!(html.contains("<base href=\"file://"));

    let args = ws.logged_args();
    let pos = |s: &str| args.iter().position(|a| a == s).unwrap();
    let input = args.iter().position(|a| a.ends_with("source.html")).unwrap();
    assert!(pos("--grayscale") < input);
    assert!(pos("--footer-center") > input);
    assert_eq!(args[pos("--footer-center") + 1], "[page] of [topage]");
}

#[tokio::test]
async fn test_settings_file_drives_conversion() {
    let ws = Workspace::new();
    let settings = ws.path("md2pdf.json");
    std::fs::write(
        &settings,
        format!(
            r#"{{
                "markdown_text": "Body",
                "output_path": "{}",
                "renderer_path": "{}",
                "page_size": "letter",
                "orientation": "landscape",
                "margins": {{ "left": 20, "right": 20 }}
            }}"#,
            ws.path("s.pdf").display(),
            ws.renderer.display()
        ),
    )
    .unwrap();

    let raw = RawOptions::from_json_file(&settings).unwrap();
    let options = OptionSetBuilder::from_raw(raw).build().unwrap();
    convert(&options).await.unwrap();

    let args = ws.logged_args();
    assert_eq!(&args[..4], ["--page-size", "Letter", "--orientation", "Landscape"]);
    assert!(args.windows(2).any(|w| w == ["--margin-left", "20mm"]));
}

// ── Failure paths ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_missing_renderer_is_launch_failure() {
    let ws = Workspace::new();
    let out_dir = ws.out_dir();
    let options = OptionSet::builder()
        .markdown_text("# Hi")
        .output_path(out_dir.join("out.pdf"))
        .renderer_path(ws.path("not-installed"))
        .build()
        .unwrap();

    let err = convert(&options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LaunchFailure);
    assert!(entries(&out_dir).is_empty());
}

#[tokio::test]
async fn test_zero_exit_with_empty_output_is_failure() {
    let ws = Workspace::new();
    let renderer = script(
        ws.dir.path(),
        "silent",
        r#"for a in "$@"; do out="$a"; done
: > "$out""#,
    );
    let out_dir = ws.out_dir();
    let options = OptionSet::builder()
        .markdown_text("# Hi")
        .output_path(out_dir.join("out.pdf"))
        .renderer_path(renderer)
        .build()
        .unwrap();

    let err = convert(&options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NonZeroExit);
    assert!(err.to_string().contains("produced no output"), "{err}");
    assert!(entries(&out_dir).is_empty());
}

#[tokio::test]
async fn test_failed_render_keeps_html_when_debugging() {
    let ws = Workspace::new();
    let renderer = script(ws.dir.path(), "broken", "echo 'Exit with code 1' >&2\nexit 1");
    let out_dir = ws.out_dir();
    let options = OptionSet::builder()
        .markdown_text("# Hi")
        .output_path(out_dir.join("out.pdf"))
        .renderer_path(renderer)
        .debug_retain_artifacts(true)
        .build()
        .unwrap();

    let err = convert(&options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NonZeroExit);
    assert!(err.to_string().contains("Exit with code 1"));
    assert_eq!(entries(&out_dir), vec!["out.html"]);
}

#[tokio::test]
async fn test_timeout_terminates_renderer() {
    let ws = Workspace::new();
    let pid_file = ws.path("pid");
    let renderer = script(
        ws.dir.path(),
        "hang",
        &format!("echo $$ > '{}'\nexec sleep 30", pid_file.display()),
    );
    let out_dir = ws.out_dir();
    let options = OptionSet::builder()
        .markdown_text("# Hi")
        .output_path(out_dir.join("out.pdf"))
        .renderer_path(renderer)
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    let started = std::time::Instant::now();
    let err = convert(&options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(entries(&out_dir).is_empty());

    #[cfg(target_os = "linux")]
    {
        let pid = std::fs::read_to_string(&pid_file).unwrap();
        assert!(!Path::new(&format!("/proc/{}", pid.trim())).exists());
    }
}

#[tokio::test]
async fn test_cancel_stops_conversion() {
    let ws = Workspace::new();
    let renderer = script(ws.dir.path(), "slow", "exec sleep 30");
    let out_dir = ws.out_dir();
    let options = OptionSet::builder()
        .markdown_text("# Hi")
        .output_path(out_dir.join("out.pdf"))
        .renderer_path(renderer)
        .build()
        .unwrap();

    let (handle, token) = cancel_pair();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.cancel();
    });

    let err = convert_with_cancel(&options, token).await.unwrap_err();
    canceller.await.unwrap();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(err.to_string().contains("cancelled"));
    assert!(entries(&out_dir).is_empty());
}

#[tokio::test]
async fn test_no_overwrite_refuses_existing_output() {
    let ws = Workspace::new();
    let out_dir = ws.out_dir();
    let target = out_dir.join("out.pdf");
    std::fs::write(&target, b"keep me").unwrap();

    let options = ws
        .builder()
        .markdown_text("# Hi")
        .output_path(&target)
        .overwrite(false)
        .build()
        .unwrap();

    let err = convert(&options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(std::fs::read(&target).unwrap(), b"keep me");
    assert_eq!(entries(&out_dir), vec!["out.pdf"]);
}

#[tokio::test]
async fn test_missing_placeholder_writes_nothing() {
    let ws = Workspace::new();
    let template = ws.path("bad.html");
    std::fs::write(&template, "<html><body></body></html>").unwrap();
    let out_dir = ws.out_dir();
    let options = ws
        .builder()
        .markdown_text("# Hi")
        .output_path(out_dir.join("out.pdf"))
        .html_template_path(&template)
        .build()
        .unwrap();

    let err = convert(&options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingPlaceholder);
    assert!(entries(&out_dir).is_empty());
    assert!(!ws.path("args.log").exists());
}

// ── Batch & callbacks ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_batch_preserves_order() {
    let ws = Workspace::new();
    let jobs: Vec<OptionSet> = (0..5)
        .map(|i| {
            let builder = ws.builder().markdown_text(format!("# Doc {i}"));
            let builder = if i == 2 {
                builder
                    .output_path(ws.path(&format!("doc{i}.pdf")))
                    .renderer_path(ws.path("missing"))
            } else {
                builder.output_path(ws.path(&format!("doc{i}.pdf")))
            };
            builder.build().unwrap()
        })
        .collect();

    let results = convert_all(&jobs, 3).await;
    assert_eq!(results.len(), 5);
    for (i, r) in results.iter().enumerate() {
        if i == 2 {
            assert_eq!(r.as_ref().unwrap_err().kind(), ErrorKind::LaunchFailure);
        } else {
            assert_eq!(r.as_ref().unwrap().output_path, ws.path(&format!("doc{i}.pdf")));
        }
    }
}

#[tokio::test]
async fn test_callback_send_in_tokio_spawn() {
    #[derive(Default)]
    struct Counter {
        stages: AtomicUsize,
        completes: AtomicUsize,
    }

    impl ConversionProgressCallback for Counter {
        fn on_stage(&self, _stage: ConversionStage) {
            self.stages.fetch_add(1, Ordering::SeqCst);
        }
        fn on_complete(&self, _output: &md2pdf::ConversionOutput) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }
    }

    let ws = Workspace::new();
    let counter = Arc::new(Counter::default());
    let options = ws
        .builder()
        .markdown_text("# Hi")
        .output_path(ws.path("spawned.pdf"))
        .progress_callback(counter.clone())
        .build()
        .unwrap();

    tokio::spawn(async move { convert(&options).await })
        .await
        .unwrap()
        .unwrap();

    assert_eq!(counter.stages.load(Ordering::SeqCst), 6);
    assert_eq!(counter.completes.load(Ordering::SeqCst), 1);
}

#[test]
fn test_option_set_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<OptionSet>();
    assert_send_sync::<md2pdf::ConversionError>();
}

// ── Real renderer ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_real_wkhtmltopdf() {
    if std::env::var("E2E_ENABLED").is_err() {
        println!("SKIP: set E2E_ENABLED=1 to run against a real wkhtmltopdf");
        return;
    }
    let dir = TempDir::new().unwrap();
    let options = OptionSet::builder()
        .markdown_text("# Hello\n\nRendered by **wkhtmltopdf**.\n")
        .output_path(dir.path().join("hello.pdf"))
        .advanced_extensions(true)
        .build()
        .unwrap();

    let output = convert(&options).await.unwrap();
    let bytes = std::fs::read(&output.output_path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(entries(dir.path()), vec!["hello.pdf"]);
}
