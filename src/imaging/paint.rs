//! Colors and gradient paints for the drawing surface.
//!
//! Paints are plain descriptions in surface coordinates. [`Paint::to_shader`]
//! turns one into a `tiny_skia` shader when it is drawn. Stops are
//! straight-alpha RGBA; beyond the first and last stop the end colors are
//! padded, matching how a 2D canvas extends gradients.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use tiny_skia::{GradientStop, Point, Shader, SpreadMode, Transform};

/// Straight-alpha RGBA color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// `#rrggbb` hex form (alpha is dropped).
    pub fn to_hex(self) -> String {
        let to8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02x}{:02x}{:02x}", to8(self.r), to8(self.g), to8(self.b))
    }

    /// Clamped into range; a NaN channel makes the color transparent.
    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
        .unwrap_or(tiny_skia::Color::TRANSPARENT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseColorError(String);

impl fmt::Display for ParseColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid color '{}': expected #rgb or #rrggbb", self.0)
    }
}

impl std::error::Error for ParseColorError {}

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |i: usize, len: usize| -> Result<u8, ParseColorError> {
            let v = u8::from_str_radix(&hex[i * len..(i + 1) * len], 16).map_err(|_| err())?;
            Ok(if len == 1 { v * 17 } else { v })
        };
        match hex.len() {
            3 => Ok(Self::from_rgb8(channel(0, 1)?, channel(1, 1)?, channel(2, 1)?)),
            6 => Ok(Self::from_rgb8(channel(0, 2)?, channel(1, 2)?, channel(2, 2)?)),
            _ => Err(err()),
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One gradient stop. `offset` is in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub color: Color,
}

impl ColorStop {
    pub const fn new(offset: f64, color: Color) -> Self {
        Self { offset, color }
    }
}

fn sorted(mut stops: Vec<ColorStop>) -> Vec<ColorStop> {
    stops.sort_by(|a, b| a.offset.total_cmp(&b.offset));
    stops
}

fn skia_stops(stops: impl IntoIterator<Item = ColorStop>) -> Vec<GradientStop> {
    stops
        .into_iter()
        .map(|s| GradientStop::new(s.offset as f32, s.color.to_skia()))
        .collect()
}

/// Gradient along the line from `start` to `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    start: (f64, f64),
    end: (f64, f64),
    stops: Vec<ColorStop>,
}

impl LinearGradient {
    pub fn new(start: (f64, f64), end: (f64, f64), stops: Vec<ColorStop>) -> Self {
        Self {
            start,
            end,
            stops: sorted(stops),
        }
    }

    pub fn stops(&self) -> &[ColorStop] {
        &self.stops
    }

    fn to_shader(&self) -> Option<Shader<'static>> {
        tiny_skia::LinearGradient::new(
            Point::from_xy(self.start.0 as f32, self.start.1 as f32),
            Point::from_xy(self.end.0 as f32, self.end.1 as f32),
            skia_stops(self.stops.iter().copied()),
            SpreadMode::Pad,
            Transform::identity(),
        )
    }
}

/// Gradient between two concentric circles.
///
/// Points inside `inner_radius` take the first stop, points beyond
/// `outer_radius` the last.
#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    center: (f64, f64),
    inner_radius: f64,
    outer_radius: f64,
    stops: Vec<ColorStop>,
}

impl RadialGradient {
    pub fn new(
        center: (f64, f64),
        inner_radius: f64,
        outer_radius: f64,
        stops: Vec<ColorStop>,
    ) -> Self {
        Self {
            center,
            inner_radius,
            outer_radius,
            stops: sorted(stops),
        }
    }

    /// The stops re-expressed over `0..=outer_radius`.
    ///
    /// `tiny_skia` radial gradients start at the center, so the ring between
    /// the radii is folded into the stop offsets; padding supplies the first
    /// stop inside the inner circle.
    pub fn concentric_stops(&self) -> Vec<ColorStop> {
        let outer = self.outer_radius;
        let inner = self.inner_radius.clamp(0.0, outer.max(0.0));
        let span = outer - inner;
        self.stops
            .iter()
            .map(|s| ColorStop::new((inner + s.offset * span) / outer, s.color))
            .collect()
    }

    fn to_shader(&self) -> Option<Shader<'static>> {
        if self.outer_radius.is_nan() || self.outer_radius <= 0.0 {
            return None;
        }
        let center = Point::from_xy(self.center.0 as f32, self.center.1 as f32);
        tiny_skia::RadialGradient::new(
            center,
            center,
            self.outer_radius as f32,
            skia_stops(self.concentric_stops()),
            SpreadMode::Pad,
            Transform::identity(),
        )
    }
}

/// Anything `Surface::fill_rect` can paint with.
#[derive(Debug, Clone, PartialEq)]
pub enum Paint {
    Solid(Color),
    Linear(LinearGradient),
    Radial(RadialGradient),
}

impl Paint {
    /// `None` when the gradient is degenerate and draws nothing.
    pub fn to_shader(&self) -> Option<Shader<'static>> {
        match self {
            Paint::Solid(c) => Some(Shader::SolidColor(c.to_skia())),
            Paint::Linear(g) => g.to_shader(),
            Paint::Radial(g) => g.to_shader(),
        }
    }
}

impl From<Color> for Paint {
    fn from(c: Color) -> Self {
        Paint::Solid(c)
    }
}
