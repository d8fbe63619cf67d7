//! Image processing on top of `image` (decode, resize, PNG) and `tiny_skia`
//! (clipping, gradients, compositing).
//!
//! | Concern | Module / function |
//! |---|---|
//! | **Crop math** | [`resolve_crop`], [`CardGeometry`] |
//! | **Decode** | [`SourceImage`] via `image::ImageReader` |
//! | **Drawing** | [`Surface`]: clip, fill, draw, read/write pixels, PNG encode |
//! | **Paint** | [`Color`], linear and radial gradients |
//! | **Film look** | vignette, grain, gloss, inner shadow in [`effects`] |
//!
//! The module is split into:
//! - **Geometry**: Pure functions for dimension math (unit testable)
//! - **Paint**: Colors and gradient descriptions, turned into `tiny_skia` shaders
//! - **Source**: Decoded input pixels plus their origin
//! - **Surface**: The mutable pixmap every compositor draws on
//! - **Effects**: The film-look layers, each parameterized only by a target rect

pub mod effects;
mod geometry;
mod paint;
mod source;
mod surface;

pub use effects::{EffectParams, NoiseBuffer};
pub use geometry::{CardGeometry, CropRectangle, GeometryError, Rect, resolve_crop};
pub use paint::{Color, ColorStop, LinearGradient, Paint, ParseColorError, RadialGradient};
pub use source::{SourceError, SourceImage, is_supported_path, supported_input_extensions};
pub use surface::{Clip, PixelRegion, Surface, SurfaceError};
