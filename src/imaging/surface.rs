//! Owned, mutable drawing surface.
//!
//! A [`Surface`] wraps a `tiny_skia::Pixmap` with just enough of a 2D-canvas
//! model for the compositors: a clip mask, rectangle fills with solid or
//! gradient paint, image drawing, inset strokes, and raw pixel read/write.
//! Each compositor call allocates its own surface and drops it after
//! encoding; there is no shared drawing context.
//!
//! ## Pixel format
//!
//! The pixmap stores premultiplied RGBA. Everything that crosses this
//! module's boundary ([`PixelRegion`], PNG output) is straight alpha, like a
//! canvas `ImageData`. Opaque pixels survive the conversion unchanged.
//!
//! ## Image drawing
//!
//! The crop rectangle is fractional and is honored exactly: the photo is
//! placed with a scale+translate transform, so one source pixel always maps
//! to the same width and height in the window. Large reductions are first
//! resized with the `image` crate's filter, since `tiny_skia` samples
//! without mipmaps.
//!
//! ## Tainting
//!
//! Drawing a foreign-origin [`SourceImage`] taints the surface. A tainted
//! surface still draws, but [`Surface::read_pixels`], [`Surface::write_pixels`]
//! and [`Surface::encode_png`] fail with [`SurfaceError::PixelAccessDenied`].

use super::geometry::{CropRectangle, Rect};
use super::paint::{Color, Paint};
use super::source::SourceImage;
use crate::artifact::EncodedImage;
use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ImageEncoder, RgbaImage};
use rayon::prelude::*;
use thiserror::Error;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, Mask, PathBuilder, Pixmap, PixmapPaint, Transform,
};

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("pixel access denied: surface is tainted by a foreign-origin image")]
    PixelAccessDenied,
    #[error("cannot allocate a {width}x{height} surface")]
    Allocation { width: u32, height: u32 },
    #[error("region {region:?} is outside the {width}x{height} surface")]
    OutOfBounds { region: Rect, width: u32, height: u32 },
    #[error("pixel data length {actual} does not match {width}x{height}")]
    BadRegion { width: u32, height: u32, actual: usize },
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Clip shape applied to every draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clip {
    None,
    Rect(Rect),
    RoundedRect { rect: Rect, radius: f64 },
}

/// Raw straight-alpha RGBA pixels copied out of a surface, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRegion {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PixelRegion {
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }
}

pub struct Surface {
    pixmap: Pixmap,
    clip: Clip,
    mask: Option<Mask>,
    origin_clean: bool,
}

impl Surface {
    /// Allocate a fully transparent surface.
    pub fn new(width: u32, height: u32) -> Result<Self, SurfaceError> {
        let pixmap =
            Pixmap::new(width, height).ok_or(SurfaceError::Allocation { width, height })?;
        Ok(Self {
            pixmap,
            clip: Clip::None,
            mask: None,
            origin_clean: true,
        })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn bounds(&self) -> Rect {
        Rect::sized(self.width(), self.height())
    }

    pub fn is_tainted(&self) -> bool {
        !self.origin_clean
    }

    pub fn clip(&self) -> Clip {
        self.clip
    }

    /// Clip to `rect`. An empty rect leaves the clip unchanged.
    pub fn clip_to_rect(&mut self, rect: Rect) {
        let path = skia_rect(rect).map(PathBuilder::from_rect);
        if let Some(mask) = path.and_then(|p| self.mask_for(&p, false)) {
            self.mask = Some(mask);
            self.clip = Clip::Rect(rect);
        }
    }

    /// Clip to an anti-aliased rounded rectangle.
    ///
    /// Returns `false` and leaves the clip untouched when the radius cannot
    /// be drawn (non-finite, negative, or wider than half the short side) or
    /// the outline cannot be built; the caller decides the fallback.
    pub fn clip_to_rounded_rect(&mut self, rect: Rect, radius: f64) -> bool {
        let max = rect.width.min(rect.height) as f64 / 2.0;
        if !radius.is_finite() || radius < 0.0 || radius > max {
            return false;
        }
        let path = rounded_rect_path(rect, radius as f32);
        let Some(mask) = path.and_then(|p| self.mask_for(&p, true)) else {
            return false;
        };
        self.mask = Some(mask);
        self.clip = Clip::RoundedRect { rect, radius };
        true
    }

    /// Fill `rect` with `paint`, composited source-over inside the clip.
    pub fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        let (Some(area), Some(shader)) = (skia_rect(rect), paint.to_shader()) else {
            return;
        };
        let mut paint = tiny_skia::Paint::default();
        paint.shader = shader;
        paint.anti_alias = false;
        self.pixmap
            .fill_rect(area, &paint, Transform::identity(), self.mask.as_ref());
    }

    /// Draw the `crop` region of `source` scaled into `dest`.
    ///
    /// The crop keeps its fractional origin and size; pixels of the source
    /// outside it never reach the surface.
    pub fn draw_image(
        &mut self,
        source: &SourceImage,
        crop: &CropRectangle,
        dest: Rect,
        filter: FilterType,
    ) -> Result<(), SurfaceError> {
        if dest.width == 0 || dest.height == 0 || crop.s_width <= 0.0 || crop.s_height <= 0.0 {
            return Ok(());
        }
        let (width, height) = (source.width(), source.height());
        let scale = dest.width as f64 / crop.s_width;

        // Reduce first so tiny-skia only ever samples close to 1:1
        let reduced;
        let (pixels, fx, fy) = if scale < 1.0 {
            let w = ((width as f64 * scale).round() as u32).max(1);
            let h = ((height as f64 * scale).round() as u32).max(1);
            reduced = imageops::resize(source.pixels(), w, h, filter);
            (&reduced, w as f64 / width as f64, h as f64 / height as f64)
        } else {
            (source.pixels(), 1.0, 1.0)
        };
        let image = pixmap_from_rgba(pixels)?;

        // Per-axis factors absorb the rounding of the reduced size
        let sx = dest.width as f64 / (crop.s_width * fx);
        let sy = dest.height as f64 / (crop.s_height * fy);
        let tx = -crop.sx * fx * sx;
        let ty = -crop.sy * fy * sy;
        let transform = Transform::from_row(sx as f32, 0.0, 0.0, sy as f32, tx as f32, ty as f32);

        let mut paint = PixmapPaint::default();
        paint.quality = if filter == FilterType::Nearest || is_pixel_aligned(sx, sy, tx, ty) {
            FilterQuality::Nearest
        } else if filter == FilterType::Triangle {
            FilterQuality::Bilinear
        } else {
            FilterQuality::Bicubic
        };

        let mut layer = Pixmap::new(dest.width, dest.height).ok_or(SurfaceError::Allocation {
            width: dest.width,
            height: dest.height,
        })?;
        layer.draw_pixmap(0, 0, image.as_ref(), &paint, transform, None);

        if !source.origin_clean() {
            self.origin_clean = false;
        }
        self.pixmap.draw_pixmap(
            dest.x as i32,
            dest.y as i32,
            layer.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            self.mask.as_ref(),
        );
        Ok(())
    }

    /// Composite another surface at `(x, y)`, inside the clip.
    ///
    /// Taint travels with the pixels.
    pub fn draw_surface(&mut self, layer: &Surface, x: u32, y: u32) {
        if layer.is_tainted() {
            self.origin_clean = false;
        }
        self.pixmap.draw_pixmap(
            x as i32,
            y as i32,
            layer.pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            self.mask.as_ref(),
        );
    }

    /// Composite `color` over the 1px ring just inside `rect`'s edges.
    pub fn stroke_inset_rect(&mut self, rect: Rect, color: Color) {
        if rect.width == 0 || rect.height == 0 {
            return;
        }
        let mut pb = PathBuilder::new();
        if let Some(outer) = skia_rect(rect) {
            pb.push_rect(outer);
        }
        if rect.width > 2 && rect.height > 2 {
            let inner = Rect::new(rect.x + 1, rect.y + 1, rect.width - 2, rect.height - 2);
            if let Some(inner) = skia_rect(inner) {
                pb.push_rect(inner);
            }
        }
        let Some(ring) = pb.finish() else {
            return;
        };
        let mut paint = tiny_skia::Paint::default();
        paint.set_color(color.to_skia());
        paint.anti_alias = false;
        self.pixmap.fill_path(
            &ring,
            &paint,
            FillRule::EvenOdd,
            Transform::identity(),
            self.mask.as_ref(),
        );
    }

    /// Copy a region out of the surface (the canvas `getImageData`).
    pub fn read_pixels(&self, rect: Rect) -> Result<PixelRegion, SurfaceError> {
        self.check_access(rect)?;
        let stride = self.width() as usize;
        let pixels = self.pixmap.pixels();
        let mut data = Vec::with_capacity(rect.width as usize * rect.height as usize * 4);
        for y in rect.y..rect.bottom() {
            let row = y as usize * stride;
            for p in &pixels[row + rect.x as usize..row + rect.right() as usize] {
                let c = p.demultiply();
                data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
            }
        }
        Ok(PixelRegion {
            width: rect.width,
            height: rect.height,
            data,
        })
    }

    /// Overwrite pixels at `(x, y)` verbatim, ignoring the clip
    /// (the canvas `putImageData`).
    pub fn write_pixels(
        &mut self,
        region: &PixelRegion,
        x: u32,
        y: u32,
    ) -> Result<(), SurfaceError> {
        let rect = Rect::new(x, y, region.width, region.height);
        self.check_access(rect)?;
        let expected = region.width as usize * region.height as usize * 4;
        if region.data.len() != expected {
            return Err(SurfaceError::BadRegion {
                width: region.width,
                height: region.height,
                actual: region.data.len(),
            });
        }
        let stride = self.width() as usize;
        let pixels = self.pixmap.pixels_mut();
        for (dy, src_row) in region.data.chunks_exact(region.width as usize * 4).enumerate() {
            let row = (y as usize + dy) * stride + x as usize;
            for (dst, px) in pixels[row..row + region.width as usize]
                .iter_mut()
                .zip(src_row.chunks_exact(4))
            {
                *dst = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
            }
        }
        Ok(())
    }

    /// Encode the whole surface as PNG.
    pub fn encode_png(&self) -> Result<EncodedImage, SurfaceError> {
        if self.is_tainted() {
            return Err(SurfaceError::PixelAccessDenied);
        }
        let image = self.to_rgba_image();
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            image.as_raw(),
            self.width(),
            self.height(),
            image::ExtendedColorType::Rgba8,
        )?;
        Ok(EncodedImage::png(bytes, self.width(), self.height()))
    }

    /// Straight-alpha copy of every pixel (bypasses taint, crate-internal).
    pub(crate) fn to_rgba_image(&self) -> RgbaImage {
        let mut image = RgbaImage::new(self.width(), self.height());
        image
            .par_chunks_mut(4)
            .zip(self.pixmap.pixels().par_iter())
            .for_each(|(dst, p)| {
                let c = p.demultiply();
                dst.copy_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
            });
        image
    }

    fn mask_for(&self, path: &tiny_skia::Path, anti_alias: bool) -> Option<Mask> {
        let mut mask = Mask::new(self.width(), self.height())?;
        mask.fill_path(path, FillRule::Winding, anti_alias, Transform::identity());
        Some(mask)
    }

    fn check_access(&self, rect: Rect) -> Result<(), SurfaceError> {
        if self.is_tainted() {
            return Err(SurfaceError::PixelAccessDenied);
        }
        if !self.bounds().encloses(&rect) {
            return Err(SurfaceError::OutOfBounds {
                region: rect,
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }
}

fn skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    tiny_skia::Rect::from_xywh(
        rect.x as f32,
        rect.y as f32,
        rect.width as f32,
        rect.height as f32,
    )
}

/// Rounded rectangle outline with cubic quarter-circle corners.
fn rounded_rect_path(rect: Rect, radius: f32) -> Option<tiny_skia::Path> {
    const KAPPA: f32 = 0.552_284_8;
    let (l, t) = (rect.x as f32, rect.y as f32);
    let (r, b) = (rect.right() as f32, rect.bottom() as f32);
    let k = radius * KAPPA;

    let mut pb = PathBuilder::new();
    pb.move_to(l + radius, t);
    pb.line_to(r - radius, t);
    pb.cubic_to(r - radius + k, t, r, t + radius - k, r, t + radius);
    pb.line_to(r, b - radius);
    pb.cubic_to(r, b - radius + k, r - radius + k, b, r - radius, b);
    pb.line_to(l + radius, b);
    pb.cubic_to(l + radius - k, b, l, b - radius + k, l, b - radius);
    pb.line_to(l, t + radius);
    pb.cubic_to(l, t + radius - k, l + radius - k, t, l + radius, t);
    pb.close();
    pb.finish()
}

/// Premultiply an `image` buffer into a pixmap.
fn pixmap_from_rgba(image: &RgbaImage) -> Result<Pixmap, SurfaceError> {
    let (width, height) = image.dimensions();
    let mut pixmap =
        Pixmap::new(width, height).ok_or(SurfaceError::Allocation { width, height })?;
    pixmap
        .pixels_mut()
        .par_iter_mut()
        .zip(image.as_raw().par_chunks_exact(4))
        .for_each(|(dst, px)| {
            *dst = ColorU8::from_rgba(px[0], px[1], px[2], px[3]).premultiply();
        });
    Ok(pixmap)
}

/// Unit scale and whole-pixel offset: sampling would only copy pixels.
fn is_pixel_aligned(sx: f64, sy: f64, tx: f64, ty: f64) -> bool {
    const EPS: f64 = 1e-9;
    (sx - 1.0).abs() < EPS
        && (sy - 1.0).abs() < EPS
        && (tx - tx.round()).abs() < EPS
        && (ty - ty.round()).abs() < EPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::geometry::resolve_crop;
    use crate::imaging::paint::{ColorStop, LinearGradient, RadialGradient};
    use crate::test_helpers::{gradient_image, solid_source};
    use image::{DynamicImage, Rgb, RgbImage};

    fn surface(w: u32, h: u32) -> Surface {
        Surface::new(w, h).unwrap()
    }

    fn rgba(s: &Surface, x: u32, y: u32) -> [u8; 4] {
        s.to_rgba_image().get_pixel(x, y).0
    }

    fn near(actual: u8, expected: u8, tolerance: u8) -> bool {
        actual.abs_diff(expected) <= tolerance
    }

    // =========================================================================
    // Fills and clipping
    // =========================================================================

    #[test]
    fn new_surface_is_transparent() {
        let s = surface(4, 3);
        assert_eq!(rgba(&s, 3, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn zero_sized_surface_is_an_error() {
        assert!(matches!(
            Surface::new(0, 10),
            Err(SurfaceError::Allocation { width: 0, height: 10 })
        ));
    }

    #[test]
    fn solid_fill_covers_rect_only() {
        let mut s = surface(10, 10);
        s.fill_rect(Rect::new(2, 2, 3, 3), &Paint::Solid(Color::from_rgb8(10, 20, 30)));
        assert_eq!(rgba(&s, 2, 2), [10, 20, 30, 255]);
        assert_eq!(rgba(&s, 4, 4), [10, 20, 30, 255]);
        assert_eq!(rgba(&s, 5, 5), [0, 0, 0, 0]);
    }

    #[test]
    fn fill_rect_is_clamped_to_surface() {
        let mut s = surface(4, 4);
        s.fill_rect(Rect::new(2, 2, 100, 100), &Color::WHITE.into());
        assert_eq!(rgba(&s, 3, 3), [255, 255, 255, 255]);
    }

    #[test]
    fn translucent_black_over_white() {
        let mut s = surface(1, 1);
        let all = s.bounds();
        s.fill_rect(all, &Color::WHITE.into());
        s.fill_rect(all, &Color::BLACK.with_alpha(0.4).into());
        // 255 * 0.6 = 153
        let [r, g, b, a] = rgba(&s, 0, 0);
        assert!(near(r, 153, 1), "got {r}");
        assert_eq!((r, g), (g, b));
        assert_eq!(a, 255);
    }

    #[test]
    fn rect_clip_blocks_outside() {
        let mut s = surface(6, 6);
        s.clip_to_rect(Rect::new(0, 0, 3, 6));
        let all = s.bounds();
        s.fill_rect(all, &Color::WHITE.into());
        assert_eq!(rgba(&s, 2, 0)[3], 255);
        assert_eq!(rgba(&s, 3, 0)[3], 0);
        assert_eq!(s.clip(), Clip::Rect(Rect::new(0, 0, 3, 6)));
    }

    #[test]
    fn rounded_clip_leaves_corners_transparent() {
        let mut s = surface(100, 100);
        let all = s.bounds();
        assert!(s.clip_to_rounded_rect(all, 30.0));
        s.fill_rect(all, &Color::WHITE.into());
        assert_eq!(rgba(&s, 0, 0)[3], 0);
        assert_eq!(rgba(&s, 99, 99)[3], 0);
        assert_eq!(rgba(&s, 50, 0)[3], 255);
        assert_eq!(rgba(&s, 0, 50)[3], 255);
        assert_eq!(rgba(&s, 50, 50)[3], 255);
    }

    #[test]
    fn rounded_clip_antialiases_arc() {
        let mut s = surface(100, 100);
        let all = s.bounds();
        s.clip_to_rounded_rect(all, 30.0);
        s.fill_rect(all, &Color::WHITE.into());
        let image = s.to_rgba_image();
        // Somewhere along the diagonal of the corner the alpha is partial
        let partial = (0..30).any(|i| {
            let a = image.get_pixel(i, i)[3];
            a > 0 && a < 255
        });
        assert!(partial);
    }

    #[test]
    fn rounded_clip_rejects_oversized_radius() {
        let mut s = surface(40, 40);
        let all = s.bounds();
        assert!(!s.clip_to_rounded_rect(all, 25.0));
        assert!(!s.clip_to_rounded_rect(all, f64::NAN));
        assert!(!s.clip_to_rounded_rect(all, -1.0));
        assert_eq!(s.clip(), Clip::None);
    }

    #[test]
    fn inset_stroke_touches_only_ring() {
        let mut s = surface(10, 10);
        let all = s.bounds();
        s.fill_rect(all, &Color::WHITE.into());
        s.stroke_inset_rect(Rect::new(2, 2, 5, 5), Color::BLACK);
        let image = s.to_rgba_image();
        let px = |x, y| image.get_pixel(x, y).0;
        assert_eq!(px(2, 2), [0, 0, 0, 255]);
        assert_eq!(px(6, 4), [0, 0, 0, 255]);
        assert_eq!(px(4, 6), [0, 0, 0, 255]);
        assert_eq!(px(4, 4), [255, 255, 255, 255]);
        assert_eq!(px(7, 4), [255, 255, 255, 255]);
    }

    #[test]
    fn linear_gradient_ramps_across_rect() {
        let mut s = surface(101, 1);
        let all = s.bounds();
        s.fill_rect(all, &Color::WHITE.into());
        let g = LinearGradient::new(
            (0.0, 0.0),
            (101.0, 0.0),
            vec![
                ColorStop::new(0.0, Color::BLACK.with_alpha(0.0)),
                ColorStop::new(1.0, Color::BLACK),
            ],
        );
        s.fill_rect(all, &Paint::Linear(g));
        let image = s.to_rgba_image();
        assert!(image.get_pixel(0, 0)[0] > 250);
        assert!(near(image.get_pixel(50, 0)[0], 127, 3));
        assert!(image.get_pixel(100, 0)[0] < 5);
    }

    #[test]
    fn radial_gradient_is_clear_inside_inner_radius() {
        let mut s = surface(41, 41);
        let all = s.bounds();
        s.fill_rect(all, &Color::WHITE.into());
        let g = RadialGradient::new(
            (20.5, 20.5),
            8.0,
            16.0,
            vec![
                ColorStop::new(0.0, Color::BLACK.with_alpha(0.0)),
                ColorStop::new(1.0, Color::BLACK),
            ],
        );
        s.fill_rect(all, &Paint::Radial(g));
        let image = s.to_rgba_image();
        assert_eq!(image.get_pixel(20, 20)[0], 255);
        assert_eq!(image.get_pixel(24, 20)[0], 255);
        // Halfway between the radii
        assert!(near(image.get_pixel(32, 20)[0], 128, 10));
        // Beyond the outer radius
        assert!(image.get_pixel(0, 0)[0] < 3);
    }

    // =========================================================================
    // Image drawing
    // =========================================================================

    #[test]
    fn draw_image_same_size_copies_pixels() {
        let img = gradient_image(6, 4);
        let src = SourceImage::from_image(DynamicImage::ImageRgb8(img.clone())).unwrap();
        let crop = resolve_crop(6, 4, 6, 4).unwrap();
        let mut s = surface(8, 6);
        s.draw_image(&src, &crop, Rect::new(1, 1, 6, 4), FilterType::Lanczos3)
            .unwrap();
        let p = img.get_pixel(2, 3).0;
        assert_eq!(rgba(&s, 3, 4), [p[0], p[1], p[2], 255]);
        assert_eq!(rgba(&s, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn draw_image_scales_to_dest() {
        let src = solid_source(300, 200, [200, 100, 50]);
        let crop = resolve_crop(300, 200, 30, 40).unwrap();
        let mut s = surface(30, 40);
        let all = s.bounds();
        s.draw_image(&src, &crop, all, FilterType::Triangle).unwrap();
        let image = s.to_rgba_image();
        for (x, y) in [(0, 0), (29, 39), (15, 20)] {
            let [r, g, b, a] = image.get_pixel(x, y).0;
            assert!(near(r, 200, 1) && near(g, 100, 1) && near(b, 50, 1), "({x}, {y})");
            assert_eq!(a, 255);
        }
    }

    #[test]
    fn draw_image_stays_inside_dest() {
        let src = solid_source(20, 10, [0, 0, 0]);
        let crop = resolve_crop(20, 10, 4, 4).unwrap();
        let mut s = surface(10, 10);
        s.draw_image(&src, &crop, Rect::new(3, 3, 4, 4), FilterType::Triangle)
            .unwrap();
        assert_eq!(rgba(&s, 2, 4)[3], 0);
        assert_eq!(rgba(&s, 7, 4)[3], 0);
        assert_eq!(rgba(&s, 4, 4)[3], 255);
    }

    /// Dark left/top quadrant edges at known source coordinates; the drawn
    /// edge positions give the horizontal and vertical scale.
    fn edge_source(width: u32, height: u32, edge_x: u32, edge_y: u32) -> SourceImage {
        let img = RgbImage::from_fn(width, height, |x, y| {
            let r = if x < edge_x { 0 } else { 255 };
            let g = if y < edge_y { 0 } else { 255 };
            Rgb([r, g, 0])
        });
        SourceImage::from_image(DynamicImage::ImageRgb8(img)).unwrap()
    }

    /// First column (or row) at which `channel` crosses half intensity.
    fn crossing(image: &RgbaImage, channel: usize, horizontal: bool) -> f64 {
        let (len, line) = if horizontal {
            (image.width(), image.height() / 2)
        } else {
            (image.height(), image.width() / 2)
        };
        let at = |i: u32| {
            let p = if horizontal {
                image.get_pixel(i, line)
            } else {
                image.get_pixel(line, i)
            };
            p[channel] as f64
        };
        for i in 1..len {
            let (a, b) = (at(i - 1), at(i));
            if a < 127.5 && b >= 127.5 {
                // Interpolated between pixel centers
                return (i - 1) as f64 + 0.5 + (127.5 - a) / (b - a);
            }
        }
        panic!("no crossing found");
    }

    #[test]
    fn small_source_keeps_window_aspect() {
        // 13x7: crop is 5.19x7 at (3.90, 0), scale 744/7 on both axes
        let src = edge_source(13, 7, 6, 3);
        let crop = resolve_crop(13, 7, 552, 744).unwrap();
        let mut s = surface(552, 744);
        let all = s.bounds();
        s.draw_image(&src, &crop, all, FilterType::CatmullRom).unwrap();
        let image = s.to_rgba_image();

        let scale = 744.0 / 7.0;
        let expect_x = (6.0 - crop.sx) * scale;
        let expect_y = 3.0 * scale;
        let got_x = crossing(&image, 0, true);
        let got_y = crossing(&image, 1, false);
        assert!((got_x - expect_x).abs() < 2.0, "x edge {got_x} vs {expect_x}");
        assert!((got_y - expect_y).abs() < 2.0, "y edge {got_y} vs {expect_y}");
    }

    #[test]
    fn reduced_source_keeps_window_aspect() {
        // 2600x1400 is reduced to 1382x744 first, a slightly different
        // factor per axis
        let src = edge_source(2600, 1400, 1200, 600);
        let crop = resolve_crop(2600, 1400, 552, 744).unwrap();
        let mut s = surface(552, 744);
        let all = s.bounds();
        s.draw_image(&src, &crop, all, FilterType::Lanczos3).unwrap();
        let image = s.to_rgba_image();

        let scale = 744.0 / 1400.0;
        let expect_x = (1200.0 - crop.sx) * scale;
        let expect_y = 600.0 * scale;
        assert!((crossing(&image, 0, true) - expect_x).abs() < 2.0);
        assert!((crossing(&image, 1, false) - expect_y).abs() < 2.0);
    }

    // =========================================================================
    // Layers
    // =========================================================================

    #[test]
    fn draw_surface_copies_opaque_pixels_exactly() {
        let mut layer = surface(3, 3);
        let all = layer.bounds();
        layer.fill_rect(all, &Color::from_rgb8(17, 99, 201).into());
        let mut s = surface(10, 10);
        s.draw_surface(&layer, 4, 5);
        assert_eq!(rgba(&s, 4, 5), [17, 99, 201, 255]);
        assert_eq!(rgba(&s, 6, 7), [17, 99, 201, 255]);
        assert_eq!(rgba(&s, 7, 7), [0, 0, 0, 0]);
    }

    #[test]
    fn draw_surface_respects_clip_and_taint() {
        let src = solid_source(2, 2, [5, 5, 5]).with_foreign_origin();
        let crop = resolve_crop(2, 2, 2, 2).unwrap();
        let mut layer = surface(2, 2);
        let all = layer.bounds();
        layer.draw_image(&src, &crop, all, FilterType::Nearest).unwrap();

        let mut s = surface(4, 4);
        s.clip_to_rect(Rect::new(0, 0, 1, 4));
        s.draw_surface(&layer, 0, 0);
        assert!(s.is_tainted());
        assert_eq!(s.to_rgba_image().get_pixel(1, 0)[3], 0);
    }

    // =========================================================================
    // Pixel access
    // =========================================================================

    #[test]
    fn read_write_roundtrip() {
        let mut s = surface(5, 5);
        s.fill_rect(Rect::new(1, 1, 2, 2), &Color::from_rgb8(9, 8, 7).into());
        let region = s.read_pixels(Rect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(region.pixel(1, 1), [9, 8, 7, 255]);

        let mut other = surface(5, 5);
        other.write_pixels(&region, 3, 3).unwrap();
        assert_eq!(rgba(&other, 4, 4), [9, 8, 7, 255]);
    }

    #[test]
    fn write_pixels_ignores_clip() {
        let mut s = surface(4, 4);
        s.clip_to_rect(Rect::new(0, 0, 1, 1));
        let region = PixelRegion {
            width: 1,
            height: 1,
            data: vec![1, 2, 3, 255],
        };
        s.write_pixels(&region, 3, 3).unwrap();
        assert_eq!(rgba(&s, 3, 3), [1, 2, 3, 255]);
    }

    #[test]
    fn read_out_of_bounds_errors() {
        let s = surface(4, 4);
        let err = s.read_pixels(Rect::new(2, 2, 3, 3)).unwrap_err();
        assert!(matches!(err, SurfaceError::OutOfBounds { .. }));
    }

    #[test]
    fn write_bad_length_errors() {
        let mut s = surface(4, 4);
        let region = PixelRegion {
            width: 2,
            height: 2,
            data: vec![0; 3],
        };
        assert!(matches!(
            s.write_pixels(&region, 0, 0),
            Err(SurfaceError::BadRegion { actual: 3, .. })
        ));
    }

    #[test]
    fn foreign_source_taints_surface() {
        let src = solid_source(4, 4, [1, 2, 3]).with_foreign_origin();
        let crop = resolve_crop(4, 4, 4, 4).unwrap();
        let mut s = surface(4, 4);
        let all = s.bounds();
        s.draw_image(&src, &crop, all, FilterType::Nearest).unwrap();

        assert!(s.is_tainted());
        assert!(matches!(
            s.read_pixels(all),
            Err(SurfaceError::PixelAccessDenied)
        ));
        assert!(matches!(s.encode_png(), Err(SurfaceError::PixelAccessDenied)));
    }

    #[test]
    fn encode_png_produces_decodable_image() {
        let mut s = surface(7, 3);
        let all = s.bounds();
        s.fill_rect(all, &Color::WHITE.into());
        let encoded = s.encode_png().unwrap();
        let decoded = image::load_from_memory(encoded.as_bytes()).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (7, 3));
    }
}
