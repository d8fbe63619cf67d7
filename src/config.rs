//! Configuration module.
//!
//! Handles loading, validating, and merging a TOML config file. Stock
//! defaults are the base layer; a user file only needs the keys it wants to
//! change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [effects]
//! grain_amplitude = 5.0     # grain offsets are uniform in [-a, +a]
//! vignette_inner = 0.4      # fraction of image width, fully clear inside
//! vignette_outer = 0.9      # fraction of image width, full darkening outside
//! vignette_opacity = 0.4
//! gloss_edge_opacity = 0.1
//! gloss_peak_opacity = 0.2
//! shadow_opacity = 0.1
//!
//! [card]
//! background = "#fcfcfc"    # paper tone
//! rounded_corners = true    # false = square card
//! resample_filter = "lanczos3"
//!
//! [output]
//! filename_prefix = "polaroid"
//! write_preview = true
//!
//! [audio]
//! enabled = true
//! sample_rate = 48000
//!
//! [processing]
//! max_threads = 4           # omit for auto = CPU cores
//! ```
//!
//! Unknown keys are rejected to catch typos early. Card and window sizes are
//! not configurable: they are the film format.

use crate::imaging::{Color, EffectParams};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full configuration.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Film-look layer constants.
    pub effects: EffectParams,
    /// Card paper and clipping.
    pub card: CardConfig,
    /// Download naming.
    pub output: OutputConfig,
    /// Sound synthesis.
    pub audio: AudioConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fx = &self.effects;
        if !(0.0..=255.0).contains(&fx.grain_amplitude) {
            return Err(ConfigError::Validation(
                "effects.grain_amplitude must be 0-255".into(),
            ));
        }
        if !(fx.vignette_inner >= 0.0 && fx.vignette_inner < fx.vignette_outer) {
            return Err(ConfigError::Validation(
                "effects.vignette_inner must be >= 0 and less than vignette_outer".into(),
            ));
        }
        for (name, value) in [
            ("vignette_opacity", fx.vignette_opacity),
            ("gloss_edge_opacity", fx.gloss_edge_opacity),
            ("gloss_peak_opacity", fx.gloss_peak_opacity),
            ("shadow_opacity", fx.shadow_opacity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Validation(format!(
                    "effects.{name} must be 0.0-1.0"
                )));
            }
        }
        if self.output.filename_prefix.is_empty()
            || self
                .output
                .filename_prefix
                .contains(['/', '\\', '.'])
        {
            return Err(ConfigError::Validation(
                "output.filename_prefix must be non-empty and contain no '/', '\\' or '.'".into(),
            ));
        }
        if !(8_000..=192_000).contains(&self.audio.sample_rate) {
            return Err(ConfigError::Validation(
                "audio.sample_rate must be 8000-192000".into(),
            ));
        }
        Ok(())
    }
}

/// Card paper settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CardConfig {
    /// Paper tone behind the photo, `#rrggbb`.
    pub background: Color,
    /// Clip the card to rounded corners. When false (or when the radius
    /// cannot be drawn) the card is a plain rectangle.
    pub rounded_corners: bool,
    /// Filter used to shrink large sources before they are drawn into the
    /// window; also picks the drawing quality.
    pub resample_filter: ResampleFilter,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            background: Color::from_rgb8(0xfc, 0xfc, 0xfc),
            rounded_corners: true,
            resample_filter: ResampleFilter::Lanczos3,
        }
    }
}

/// Resampling filters from the `image` crate, by config name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl From<ResampleFilter> for FilterType {
    fn from(f: ResampleFilter) -> Self {
        match f {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Gaussian => FilterType::Gaussian,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Output naming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Card files are named `<filename_prefix>-<timestamp>.png`.
    pub filename_prefix: String,
    /// Also write the borderless preview next to the card.
    pub write_preview: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filename_prefix: crate::naming::DEFAULT_PREFIX.to_string(),
            write_preview: true,
        }
    }
}

/// Sound settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AudioConfig {
    /// Master switch. When false every sound call is a no-op.
    pub enabled: bool,
    /// Rate the sounds are rendered at. A device running at another rate
    /// gets a resampled copy.
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_rate: 48_000,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of threads used for per-row pixel work.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_threads
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file, or stock defaults when `path` is `None`.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value();
    let overlay = match path {
        Some(p) => {
            let content = fs::read_to_string(p)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Instant Film Configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# The card (648x1032, 30px corners) and image window (552x744) are fixed:
# they are the Instax Mini format at 12px per millimetre.

# ---------------------------------------------------------------------------
# Film look
# ---------------------------------------------------------------------------
[effects]
# Grain: each pixel gets one random offset in [-amplitude, +amplitude],
# added equally to R, G and B.
grain_amplitude = 5.0

# Vignette radii as fractions of the image width, and the darkness at the edge.
vignette_inner = 0.4
vignette_outer = 0.9
vignette_opacity = 0.4

# Gloss: white sheen at the corners and a brighter shine line through the middle.
gloss_edge_opacity = 0.1
gloss_peak_opacity = 0.2

# Inset 1px ring that makes the photo look recessed into the card.
shadow_opacity = 0.1

# ---------------------------------------------------------------------------
# Card
# ---------------------------------------------------------------------------
[card]
# Paper tone.
background = "#fcfcfc"

# Rounded corners. Set to false for a square-cut card.
rounded_corners = true

# Resampling filter: nearest, triangle, catmullrom, gaussian, lanczos3.
resample_filter = "lanczos3"

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Cards are saved as <filename_prefix>-<timestamp>.png
filename_prefix = "polaroid"

# Also save the borderless preview as <filename_prefix>-<timestamp>-preview.png
write_preview = true

# ---------------------------------------------------------------------------
# Audio
# ---------------------------------------------------------------------------
[audio]
# Play the shutter and motor sounds (needs a build with the `playback` feature).
enabled = true
sample_rate = 48000

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum threads for pixel work.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_film_look() {
        let config = Config::default();
        assert_eq!(config.effects.grain_amplitude, 5.0);
        assert_eq!(config.card.background.to_hex(), "#fcfcfc");
        assert!(config.card.rounded_corners);
        assert_eq!(config.output.filename_prefix, "polaroid");
    }

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
[effects]
grain_amplitude = 8.0
"##;
        let config: Config = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(config.effects.grain_amplitude, 8.0);
        // Default values preserved
        assert_eq!(config.effects.vignette_inner, 0.4);
        assert_eq!(config.card.background.to_hex(), "#fcfcfc");
    }

    #[test]
    fn parse_card_settings() {
        let toml = r##"
[card]
background = "#fff8e7"
rounded_corners = false
resample_filter = "catmullrom"
"##;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.card.background.to_hex(), "#fff8e7");
        assert!(!config.card.rounded_corners);
        assert_eq!(config.card.resample_filter, ResampleFilter::CatmullRom);
    }

    #[test]
    fn bad_background_color_rejected() {
        let toml = r##"
[card]
background = "beige"
"##;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        let toml = r##"
[effects]
grain = 5.0
"##;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: Config = toml::from_str(stock_config_toml()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.effects, defaults.effects);
        assert_eq!(config.card.background, defaults.card.background);
        assert_eq!(config.output.filename_prefix, defaults.output.filename_prefix);
        assert_eq!(config.audio.sample_rate, defaults.audio.sample_rate);
        config.validate().unwrap();
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn validate_rejects_inverted_vignette() {
        let mut config = Config::default();
        config.effects.vignette_inner = 0.9;
        config.effects.vignette_outer = 0.4;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_opacity_above_one() {
        let mut config = Config::default();
        config.effects.gloss_peak_opacity = 1.5;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("gloss_peak_opacity"));
    }

    #[test]
    fn validate_rejects_negative_grain() {
        let mut config = Config::default();
        config.effects.grain_amplitude = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_path_in_prefix() {
        let mut config = Config::default();
        config.output.filename_prefix = "../evil".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_silly_sample_rate() {
        let mut config = Config::default();
        config.audio.sample_rate = 100;
        assert!(config.validate().is_err());
    }

    // =========================================================================
    // merge / load
    // =========================================================================

    #[test]
    fn merge_toml_overlay_wins() {
        let base: toml::Value = toml::from_str("[a]\nx = 1\ny = 2").unwrap();
        let overlay: toml::Value = toml::from_str("[a]\ny = 3").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"]["x"].as_integer(), Some(1));
        assert_eq!(merged["a"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn load_config_without_file_is_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config.effects, EffectParams::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("film.toml");
        fs::write(
            &path,
            r##"
[output]
filename_prefix = "instax"

[audio]
enabled = false
"##,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.output.filename_prefix, "instax");
        assert!(!config.audio.enabled);
        // Unspecified values should be defaults
        assert!(config.output.write_preview);
        assert_eq!(config.audio.sample_rate, 48_000);
    }

    #[test]
    fn load_config_validates_merged_result() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("film.toml");
        fs::write(&path, "[effects]\nvignette_opacity = 2.0\n").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn load_config_missing_file_errors() {
        let result = load_config(Some(Path::new("/nonexistent/film.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn effective_threads_clamps_to_cores() {
        let cores = effective_threads(&ProcessingConfig::default());
        assert!(cores >= 1);
        let capped = effective_threads(&ProcessingConfig {
            max_threads: Some(100_000),
        });
        assert_eq!(capped, cores);
        let one = effective_threads(&ProcessingConfig {
            max_threads: Some(1),
        });
        assert_eq!(one, 1);
    }
}
