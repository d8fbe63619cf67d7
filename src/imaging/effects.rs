//! The film look, as a stack of independent layers.
//!
//! | Order | Layer | What it does |
//! |---|---|---|
//! | 1 | [`apply_vignette`] | radial darkening from 40% to 90% of the width |
//! | 2 | [`apply_grain`] | per-pixel luminance noise from a [`NoiseBuffer`] |
//! | 3 | [`apply_gloss`] | diagonal white sheen with a shine line at 50% |
//! | 4 | [`apply_inner_shadow`] | 1px inset dark ring (card only) |
//!
//! Each layer takes only the target [`Rect`] and its parameters. Gradients
//! are built from the rect's own origin and size, so running a layer on the
//! card's image window at (48, 48) and on the preview at (0, 0) yields the
//! same values pixel for pixel.

use super::geometry::Rect;
use super::paint::{Color, ColorStop, LinearGradient, Paint, RadialGradient};
use super::surface::{Surface, SurfaceError};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tunable constants for the effect stack.
///
/// The defaults were tuned by eye; they are kept configurable rather than
/// derived.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EffectParams {
    /// Grain offsets are uniform in `[-grain_amplitude, +grain_amplitude]`.
    pub grain_amplitude: f32,
    /// Vignette inner radius as a fraction of the image width.
    pub vignette_inner: f64,
    /// Vignette outer radius as a fraction of the image width.
    pub vignette_outer: f64,
    /// Black opacity at (and beyond) the outer radius.
    pub vignette_opacity: f32,
    /// White opacity of the gloss at both corners.
    pub gloss_edge_opacity: f32,
    /// White opacity of the shine line through the middle.
    pub gloss_peak_opacity: f32,
    /// Black opacity of the inset ring.
    pub shadow_opacity: f32,
}

impl Default for EffectParams {
    fn default() -> Self {
        Self {
            grain_amplitude: 5.0,
            vignette_inner: 0.4,
            vignette_outer: 0.9,
            vignette_opacity: 0.4,
            gloss_edge_opacity: 0.1,
            gloss_peak_opacity: 0.2,
            shadow_opacity: 0.1,
        }
    }
}

/// Per-pixel grain offsets for one image window.
///
/// One value per pixel, applied identically to R, G and B so the grain is
/// luminance-only. A buffer is sampled once per request and must be reused
/// verbatim for every artifact of that request.
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseBuffer {
    width: u32,
    height: u32,
    offsets: Vec<f32>,
}

impl NoiseBuffer {
    /// Sample fresh uniform offsets in `[-amplitude, +amplitude]`.
    pub fn generate<R: Rng + ?Sized>(width: u32, height: u32, amplitude: f32, rng: &mut R) -> Self {
        let amplitude = amplitude.abs();
        let len = width as usize * height as usize;
        let offsets = (0..len)
            .map(|_| rng.gen_range(-amplitude..=amplitude))
            .collect();
        Self {
            width,
            height,
            offsets,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn offset(&self, x: u32, y: u32) -> f32 {
        self.offsets[(y * self.width + x) as usize]
    }

    pub fn offsets(&self) -> &[f32] {
        &self.offsets
    }
}

/// Radial darkening centered on `rect`.
pub fn apply_vignette(surface: &mut Surface, rect: Rect, params: &EffectParams) {
    let w = rect.width as f64;
    let gradient = RadialGradient::new(
        rect.center(),
        w * params.vignette_inner,
        w * params.vignette_outer,
        vec![
            ColorStop::new(0.0, Color::BLACK.with_alpha(0.0)),
            ColorStop::new(1.0, Color::BLACK.with_alpha(params.vignette_opacity)),
        ],
    );
    surface.fill_rect(rect, &Paint::Radial(gradient));
}

/// Add `noise` to the R, G, B channels of every pixel in `rect`.
///
/// Reads the region, perturbs it, and writes it back, so it fails with
/// [`SurfaceError::PixelAccessDenied`] on a tainted surface. Alpha is left
/// alone; channels are rounded and clamped to `0..=255`.
pub fn apply_grain(
    surface: &mut Surface,
    rect: Rect,
    noise: &NoiseBuffer,
) -> Result<(), SurfaceError> {
    let mut region = surface.read_pixels(rect)?;
    for (px, &n) in region.data.chunks_exact_mut(4).zip(noise.offsets()) {
        for c in &mut px[..3] {
            *c = (*c as f32 + n).round().clamp(0.0, 255.0) as u8;
        }
    }
    surface.write_pixels(&region, rect.x, rect.y)
}

/// The five gloss stops, brightest at the center diagonal.
fn gloss_stops(params: &EffectParams) -> Vec<ColorStop> {
    let white = |a: f32| Color::WHITE.with_alpha(a);
    vec![
        ColorStop::new(0.0, white(params.gloss_edge_opacity)),
        ColorStop::new(0.4, white(0.0)),
        ColorStop::new(0.5, white(params.gloss_peak_opacity)),
        ColorStop::new(0.6, white(0.0)),
        ColorStop::new(1.0, white(params.gloss_edge_opacity)),
    ]
}

/// Diagonal sheen from `rect`'s top-left to bottom-right corner.
pub fn apply_gloss(surface: &mut Surface, rect: Rect, params: &EffectParams) {
    let gradient = LinearGradient::new(
        (rect.x as f64, rect.y as f64),
        (rect.right() as f64, rect.bottom() as f64),
        gloss_stops(params),
    );
    surface.fill_rect(rect, &Paint::Linear(gradient));
}

pub fn apply_inner_shadow(surface: &mut Surface, rect: Rect, params: &EffectParams) {
    surface.stroke_inset_rect(rect, Color::BLACK.with_alpha(params.shadow_opacity));
}
