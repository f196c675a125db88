//! Staging: one scoped directory per conversion.
//!
//! The directory is created *inside the output's parent directory*, so the
//! final rename or hard link of staged files beside the output never
//! crosses a filesystem boundary. It is removed by [`StagingArea::close`], or by
//! `TempDir`'s destructor if the conversion future is dropped.

use crate::error::ConversionError;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const STAGED_HTML: &str = "source.html";
const STAGED_PDF: &str = "output.pdf";

#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
    html_path: PathBuf,
    pdf_path: PathBuf,
}

impl StagingArea {
    /// Create the output's parent directory (if needed) and a fresh scoped
    /// directory inside it.
    pub async fn create(output_path: &Path) -> Result<Self, ConversionError> {
        let parent = output_parent(output_path);
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| ConversionError::io("create output directory", &parent, e))?;

        let dir = tempfile::Builder::new()
            .prefix(".md2pdf-")
            .tempdir_in(&parent)
            .map_err(|e| ConversionError::io("create staging directory", &parent, e))?;
        debug!("Staging directory: {}", dir.path().display());

        Ok(Self {
            html_path: dir.path().join(STAGED_HTML),
            pdf_path: dir.path().join(STAGED_PDF),
            dir,
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn html_path(&self) -> &Path {
        &self.html_path
    }

    /// Where the renderer is told to write.
    pub fn pdf_path(&self) -> &Path {
        &self.pdf_path
    }

    pub async fn write_html(&self, html: &str) -> Result<(), ConversionError> {
        tokio::fs::write(&self.html_path, html)
            .await
            .map_err(|e| ConversionError::io("write staged HTML", &self.html_path, e))
    }

    /// Move the staged PDF onto `output_path`. Returns the output size.
    ///
    /// With `overwrite == false` the PDF is hard-linked into place, so an
    /// existing target (even one created while the renderer ran) is an
    /// `AlreadyExists` error and is left untouched.
    pub async fn finalize(&self, output_path: &Path, overwrite: bool) -> Result<u64, ConversionError> {
        if overwrite {
            tokio::fs::rename(&self.pdf_path, output_path)
                .await
                .map_err(|e| ConversionError::io("move PDF into place", output_path, e))?;
        } else {
            tokio::fs::hard_link(&self.pdf_path, output_path)
                .await
                .map_err(|e| {
                    let e = if e.kind() == io::ErrorKind::AlreadyExists {
                        io::Error::new(
                            io::ErrorKind::AlreadyExists,
                            "file exists and overwrite is disabled",
                        )
                    } else {
                        e
                    };
                    ConversionError::io("write output", output_path, e)
                })?;
        }

        let bytes = tokio::fs::metadata(output_path)
            .await
            .map(|m| m.len())
            .map_err(|e| ConversionError::io("inspect output", output_path, e))?;
        Ok(bytes)
    }

    /// Link the staged HTML beside `output_path` for inspection.
    ///
    /// Existing files are never replaced: the first free name from
    /// [`retained_html_candidates`] is used.
    pub async fn retain_html(&self, output_path: &Path) -> Result<PathBuf, ConversionError> {
        for target in retained_html_candidates(output_path) {
            match tokio::fs::hard_link(&self.html_path, &target).await {
                Ok(()) => {
                    debug!("Retained staged HTML at {}", target.display());
                    return Ok(target);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(ConversionError::io("retain staged HTML", target, e)),
            }
        }
        Err(ConversionError::io(
            "retain staged HTML",
            retained_html_path(output_path),
            io::Error::new(io::ErrorKind::AlreadyExists, "no free file name beside the output"),
        ))
    }

    /// Remove the staging directory and everything left in it.
    pub fn close(self) -> Result<(), ConversionError> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .map_err(|e| ConversionError::io("remove staging directory", path, e))
    }
}

/// `<stem>.html` beside the output, or `<stem>.source.html` when the output
/// itself is already named `<stem>.html`.
pub fn retained_html_path(output_path: &Path) -> PathBuf {
    let candidate = output_path.with_extension("html");
    if candidate == output_path {
        output_path.with_extension("source.html")
    } else {
        candidate
    }
}

const MAX_RETAIN_SUFFIX: u32 = 99;

/// Names tried for retained HTML, in order: [`retained_html_path`], then
/// `<stem>.md2pdf.html`, then `<stem>.md2pdf-1.html` and upwards.
pub fn retained_html_candidates(output_path: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    let stem = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let sibling = move |name: String| output_path.with_file_name(name);
    let numbered = {
        let stem = stem.clone();
        let sibling = sibling.clone();
        (1..=MAX_RETAIN_SUFFIX).map(move |n| sibling(format!("{stem}.md2pdf-{n}.html")))
    };
    std::iter::once(retained_html_path(output_path))
        .chain(std::iter::once(sibling(format!("{stem}.md2pdf.html"))))
        .chain(numbered)
}

fn output_parent(output_path: &Path) -> PathBuf {
    match output_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn retained_names() {
        assert_eq!(retained_html_path(Path::new("d/out.pdf")), Path::new("d/out.html"));
        assert_eq!(retained_html_path(Path::new("d/out")), Path::new("d/out.html"));
        assert_eq!(
            retained_html_path(Path::new("d/out.html")),
            Path::new("d/out.source.html")
        );
    }

    #[test]
    fn bare_file_name_stages_in_cwd() {
        assert_eq!(output_parent(Path::new("out.pdf")), Path::new("."));
    }

    #[tokio::test]
    async fn stage_finalize_and_close() {
        let root = tempfile::TempDir::new().unwrap();
        let output = root.path().join("nested/deeper/out.pdf");

        let stage = StagingArea::create(&output).await.unwrap();
        assert_eq!(stage.dir().parent().unwrap(), output.parent().unwrap());
        stage.write_html("<p>x</p>").await.unwrap();
        std::fs::write(stage.pdf_path(), b"%PDF-1.4").unwrap();

        let bytes = stage.finalize(&output, true).await.unwrap();
        assert_eq!(bytes, 8);

        let dir = stage.dir().to_path_buf();
        stage.close().unwrap();
        assert!(!dir.exists());
        let left: Vec<_> = std::fs::read_dir(output.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(left, vec![std::ffi::OsString::from("out.pdf")]);
    }

    #[tokio::test]
    async fn no_overwrite_keeps_existing() {
        let root = tempfile::TempDir::new().unwrap();
        let output = root.path().join("out.pdf");
        std::fs::write(&output, b"old").unwrap();

        let stage = StagingArea::create(&output).await.unwrap();
        std::fs::write(stage.pdf_path(), b"new").unwrap();
        let err = stage.finalize(&output, false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("overwrite"));
        assert_eq!(std::fs::read(&output).unwrap(), b"old");
        stage.close().unwrap();
    }

    #[tokio::test]
    async fn no_overwrite_writes_fresh_output() {
        let root = tempfile::TempDir::new().unwrap();
        let output = root.path().join("out.pdf");
        let stage = StagingArea::create(&output).await.unwrap();
        std::fs::write(stage.pdf_path(), b"%PDF").unwrap();

        assert_eq!(stage.finalize(&output, false).await.unwrap(), 4);
        stage.close().unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"%PDF");
    }

    #[test]
    fn retained_candidate_order() {
        let names: Vec<PathBuf> = retained_html_candidates(Path::new("d/report.pdf"))
            .take(4)
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("d/report.html"),
                PathBuf::from("d/report.md2pdf.html"),
                PathBuf::from("d/report.md2pdf-1.html"),
                PathBuf::from("d/report.md2pdf-2.html"),
            ]
        );
    }

    #[tokio::test]
    async fn retain_never_replaces_existing_files() {
        let root = tempfile::TempDir::new().unwrap();
        let output = root.path().join("report.pdf");
        std::fs::write(root.path().join("report.html"), "template {$html}").unwrap();
        std::fs::write(root.path().join("report.md2pdf.html"), "older debug copy").unwrap();

        let stage = StagingArea::create(&output).await.unwrap();
        stage.write_html("<p>staged</p>").await.unwrap();
        let kept = stage.retain_html(&output).await.unwrap();
        stage.close().unwrap();

        assert_eq!(kept, root.path().join("report.md2pdf-1.html"));
        assert_eq!(std::fs::read_to_string(&kept).unwrap(), "<p>staged</p>");
        assert_eq!(
            std::fs::read_to_string(root.path().join("report.html")).unwrap(),
            "template {$html}"
        );
        assert_eq!(
            std::fs::read_to_string(root.path().join("report.md2pdf.html")).unwrap(),
            "older debug copy"
        );
    }

    #[tokio::test]
    async fn retain_keeps_html_beside_output() {
        let root = tempfile::TempDir::new().unwrap();
        let output = root.path().join("out.pdf");
        let stage = StagingArea::create(&output).await.unwrap();
        stage.write_html("<p>kept</p>").await.unwrap();

        let kept = stage.retain_html(&output).await.unwrap();
        assert_eq!(kept, root.path().join("out.html"));
        assert_eq!(std::fs::read_to_string(&kept).unwrap(), "<p>kept</p>");
        stage.close().unwrap();
    }

    #[tokio::test]
    async fn drop_removes_directory() {
        let root = tempfile::TempDir::new().unwrap();
        let stage = StagingArea::create(&root.path().join("out.pdf")).await.unwrap();
        let dir = stage.dir().to_path_buf();
        drop(stage);
        assert!(!dir.exists());
    }
}
