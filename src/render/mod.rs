//! Chart rendering with plotters, plus output file naming.

pub mod chart;

pub use chart::{ChartKind, ChartSpec, render_to_file};

use anyhow::{anyhow, bail};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

static UNSAFE_FILE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("file name pattern compiles"));

/// Image formats the drawing backends can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    /// Drawn as svg, then converted.
    Pdf,
    Png,
    Bmp,
    Jpeg,
}

impl OutputFormat {
    pub fn from_extension(ext: &str) -> anyhow::Result<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "svg" => Ok(OutputFormat::Svg),
            "png" => Ok(OutputFormat::Png),
            "bmp" => Ok(OutputFormat::Bmp),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "pdf" => Ok(OutputFormat::Pdf),
            other => bail!(
                "unsupported output format {:?} (expected svg, pdf, png, bmp or jpg)",
                other
            ),
        }
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow!("cannot infer image format of {}: no extension", path.display()))?;
        Self::from_extension(ext)
    }

    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Png => "png",
            OutputFormat::Bmp => "bmp",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Bitmap backends write RGB only; they get a white background.
    pub fn has_alpha(self) -> bool {
        matches!(self, OutputFormat::Svg | OutputFormat::Pdf)
    }
}

/// Presentation options shared by every chart of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    /// Prefixed to every chart title.
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    /// Fixed axis limits; the data extent when absent.
    pub x_range: Option<(f64, f64)>,
    pub y_range: Option<(f64, f64)>,
    pub legend: bool,
    pub width: u32,
    pub height: u32,
    /// Honoured by svg and pdf only.
    pub transparent: bool,
    /// Small margins around the plot area.
    pub tight: bool,
    pub format: OutputFormat,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            title: None,
            x_label: None,
            y_label: None,
            x_range: None,
            y_range: None,
            legend: true,
            width: 800,
            height: 600,
            transparent: false,
            tight: false,
            format: OutputFormat::Svg,
        }
    }
}

/// Where finished charts go.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    /// Temporary file handed to a viewer.
    Show,
    /// `<prefix>-<chart label>.<format>` per chart.
    Prefix(String),
    /// Exactly this file; format from its extension.
    File(PathBuf),
}

impl Output {
    pub fn path_for(&self, label: &str, format: OutputFormat) -> PathBuf {
        match self {
            Output::Show => std::env::temp_dir().join(format!(
                "simlog-plot-{}-{}.{}",
                std::process::id(),
                file_label(label),
                format.extension()
            )),
            Output::Prefix(prefix) => prefixed_path(prefix, label, format),
            Output::File(path) => path.clone(),
        }
    }
}

/// `<prefix>-<label>.<ext>`, or `<prefix>.<ext>` for an unlabelled chart.
pub fn prefixed_path(prefix: &str, label: &str, format: OutputFormat) -> PathBuf {
    if label.is_empty() {
        return PathBuf::from(format!("{}.{}", prefix, format.extension()));
    }
    PathBuf::from(format!(
        "{}-{}.{}",
        prefix,
        file_label(label),
        format.extension()
    ))
}

/// A chart label reduced to characters safe in a file name.
pub fn file_label(label: &str) -> String {
    let cleaned = UNSAFE_FILE_CHARS.replace_all(label.trim(), "_");
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        return "plot".to_string();
    }
    cleaned.to_string()
}

/// Open `path` in `$SIMLOG_VIEWER`, else the platform's default opener.
/// Failure is reported, not fatal: the file is already written.
pub fn open_in_viewer(path: &Path) {
    let viewer = std::env::var("SIMLOG_VIEWER").unwrap_or_else(|_| {
        if cfg!(target_os = "macos") {
            "open".to_string()
        } else {
            "xdg-open".to_string()
        }
    });

    match Command::new(&viewer).arg(path).status() {
        Ok(status) if status.success() => {
            log::debug!("opened {} with {}", path.display(), viewer)
        }
        Ok(status) => log::warn!(
            "viewer {} exited with {}; chart is at {}",
            viewer,
            status,
            path.display()
        ),
        Err(e) => log::warn!(
            "could not launch viewer {}: {}; chart is at {}",
            viewer,
            e,
            path.display()
        ),
    }
}
