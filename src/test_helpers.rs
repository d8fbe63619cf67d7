//! Shared test utilities for the instant-film test suite.
//!
//! Provides synthetic source photos and encoders so tests never depend on
//! fixture files.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let photo = solid_source(400, 300, [200, 120, 40]);
//! let png = encode_png(&gradient_image(64, 48));
//! ```

use crate::imaging::SourceImage;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

// =========================================================================
// Synthetic images
// =========================================================================

/// An RGB image where every pixel is distinct enough to catch misplaced
/// crops: red ramps with x, green ramps with y, blue mixes both.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(2).saturating_sub(1).max(1)).min(255) as u8;
        let g = (y * 255 / height.max(2).saturating_sub(1).max(1)).min(255) as u8;
        let b = ((x * 7 + y * 13) % 256) as u8;
        Rgb([r, g, b])
    })
}

/// A same-origin source filled with one opaque color.
pub fn solid_source(width: u32, height: u32, rgb: [u8; 3]) -> SourceImage {
    let img = RgbImage::from_pixel(width, height, Rgb(rgb));
    SourceImage::from_image(DynamicImage::ImageRgb8(img)).unwrap()
}

/// A same-origin source built from [`gradient_image`].
pub fn gradient_source(width: u32, height: u32) -> SourceImage {
    SourceImage::from_image(DynamicImage::ImageRgb8(gradient_image(width, height))).unwrap()
}

// =========================================================================
// Encoding
// =========================================================================

/// Encode an RGB image as PNG bytes.
pub fn encode_png(img: &RgbImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

/// Decode PNG bytes to RGBA for pixel comparisons.
pub fn decode_rgba(bytes: &[u8]) -> image::RgbaImage {
    image::load_from_memory(bytes).unwrap().into_rgba8()
}
