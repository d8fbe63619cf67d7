//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Develop
//!
//! ```text
//! Developed beach.jpg (4000x3000)
//!     Crop: 2225.8x3000.0 at (887.1, 0.0)
//!     Card: out/polaroid-1718000000000.png (648x1032, 812.4 KB)
//!     Preview: out/polaroid-1718000000000-preview.png (552x744, 590.1 KB)
//! ```
//!
//! ## Crop
//!
//! ```text
//! Source 4000x3000 → window 552x744
//!     Keep full height, trim sides
//!     Crop: 2225.8x3000.0 at (887.1, 0.0)
//!     Scale: 0.2480 window px per source px
//! ```
//!
//! ## Sound
//!
//! ```text
//! shutter: 0.150s, peak 0.62, played
//! motor: 2.000s, peak 0.04, silent (no audio output)
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. The same report structs
//! serialize to JSON for `--json`.

use crate::audio::Playback;
use crate::imaging::{CropRectangle, Rect};
use serde::Serialize;
use std::path::PathBuf;

// ============================================================================
// Reports
// ============================================================================

/// One written artifact.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// The resolved crop and how much it is scaled into the window.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CropReport {
    pub sx: f64,
    pub sy: f64,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

impl CropReport {
    pub fn new(crop: &CropRectangle, window: Rect) -> Self {
        Self {
            sx: crop.sx,
            sy: crop.sy,
            width: crop.s_width,
            height: crop.s_height,
            scale: crop.scale_to(window.width),
        }
    }
}

/// Everything `develop` did for one photo.
#[derive(Debug, Clone, Serialize)]
pub struct DevelopReport {
    pub source: PathBuf,
    pub source_width: u32,
    pub source_height: u32,
    pub crop: CropReport,
    pub card: FileReport,
    pub preview: Option<FileReport>,
    pub seed: Option<u64>,
}

/// One synthesized sound.
#[derive(Debug, Clone, Serialize)]
pub struct SoundReport {
    pub name: &'static str,
    pub duration: f64,
    pub peak: f32,
    pub played: bool,
}

impl SoundReport {
    pub fn new(name: &'static str, playback: &Playback) -> Self {
        Self {
            name,
            duration: playback.audio.duration(),
            peak: playback.audio.peak(),
            played: playback.queued,
        }
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Human-readable byte size: `512 B`, `12.3 KB`, `4.1 MB`.
fn format_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < KB * KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / (KB * KB))
    }
}

fn crop_line(crop: &CropReport) -> String {
    format!(
        "{}Crop: {:.1}x{:.1} at ({:.1}, {:.1})",
        indent(1),
        crop.width,
        crop.height,
        crop.sx,
        crop.sy
    )
}

fn file_line(label: &str, file: &FileReport) -> String {
    format!(
        "{}{}: {} ({}x{}, {})",
        indent(1),
        label,
        file.path.display(),
        file.width,
        file.height,
        format_bytes(file.bytes)
    )
}

// ============================================================================
// Develop
// ============================================================================

pub fn format_develop_output(report: &DevelopReport) -> Vec<String> {
    let name = report
        .source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| report.source.display().to_string());
    let mut lines = vec![format!(
        "Developed {} ({}x{})",
        name, report.source_width, report.source_height
    )];
    lines.push(crop_line(&report.crop));
    lines.push(file_line("Card", &report.card));
    if let Some(preview) = &report.preview {
        lines.push(file_line("Preview", preview));
    }
    if let Some(seed) = report.seed {
        lines.push(format!("{}Seed: {}", indent(1), seed));
    }
    lines
}

pub fn print_develop_output(report: &DevelopReport) {
    for line in format_develop_output(report) {
        println!("{}", line);
    }
}

// ============================================================================
// Crop
// ============================================================================

pub fn format_crop(
    source_width: u32,
    source_height: u32,
    window: Rect,
    crop: &CropReport,
) -> Vec<String> {
    // Exact-ratio sources can carry float dust in the offset
    const EPS: f64 = 1e-6;
    let trim = if crop.sx > EPS {
        "Keep full height, trim sides"
    } else if crop.sy > EPS {
        "Keep full width, trim top and bottom"
    } else {
        "Exact fit, no trimming"
    };
    vec![
        format!(
            "Source {}x{} → window {}x{}",
            source_width, source_height, window.width, window.height
        ),
        format!("{}{}", indent(1), trim),
        crop_line(crop),
        format!(
            "{}Scale: {:.4} window px per source px",
            indent(1),
            crop.scale
        ),
    ]
}

pub fn print_crop(source_width: u32, source_height: u32, window: Rect, crop: &CropReport) {
    for line in format_crop(source_width, source_height, window, crop) {
        println!("{}", line);
    }
}

// ============================================================================
// Sound
// ============================================================================

pub fn format_sound_output(reports: &[SoundReport]) -> Vec<String> {
    reports
        .iter()
        .map(|r| {
            let status = if r.played {
                "played"
            } else {
                "silent (no audio output)"
            };
            format!(
                "{}: {:.3}s, peak {:.2}, {}",
                r.name, r.duration, r.peak, status
            )
        })
        .collect()
}

pub fn print_sound_output(reports: &[SoundReport]) {
    for line in format_sound_output(reports) {
        println!("{}", line);
    }
}
