//! Renderer command-line construction.
//!
//! wkhtmltopdf reads `[GLOBAL OPTION]... <input> [PAGE OPTION]... <output>`
//! and lets a later occurrence of a flag override an earlier one. Generated
//! flags therefore always come first in their section, so user pass-through
//! arguments placed after them win.

use crate::config::OptionSet;
use std::ffi::OsString;
use std::path::Path;

/// Build the full argv (without the program) for one render.
///
/// Layout:
/// 1. page geometry (`--page-size`, `--orientation`, `--margin-*`)
/// 2. image flags (`--image-dpi`, `--image-quality`)
/// 3. extra global arguments
/// 4. input HTML path
/// 5. page-level flags (`--encoding`, `--enable-local-file-access`)
/// 6. extra page arguments
/// 7. output PDF path
pub fn build_arguments(html_path: &Path, options: &OptionSet, output_path: &Path) -> Vec<OsString> {
    let margins = options.margins();
    let mut args: Vec<OsString> = Vec::with_capacity(
        20 + options.extra_global_args().len() + options.extra_page_args().len(),
    );

    let mut flag = |name: &str, value: String| {
        args.push(name.into());
        args.push(value.into());
    };
    flag("--page-size", options.page_size().as_flag().to_string());
    flag("--orientation", options.orientation().as_flag().to_string());
    flag("--margin-top", format!("{}mm", margins.top));
    flag("--margin-right", format!("{}mm", margins.right));
    flag("--margin-bottom", format!("{}mm", margins.bottom));
    flag("--margin-left", format!("{}mm", margins.left));
    flag("--image-dpi", options.image_dpi().to_string());
    flag("--image-quality", options.image_quality().to_string());

    args.extend(options.extra_global_args().iter().map(OsString::from));
    args.push(html_path.as_os_str().to_owned());

    args.push("--encoding".into());
    args.push("utf-8".into());
    args.push("--enable-local-file-access".into());
    args.extend(options.extra_page_args().iter().map(OsString::from));

    args.push(output_path.as_os_str().to_owned());
    args
}
