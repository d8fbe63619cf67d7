//! Pure geometry for the instant-film card.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! The card proportions come from Instax Mini film: a 54×86mm card with a
//! 46×62mm image window, scaled ×12 to get a print-quality pixel grid. The
//! numbers are compile-time constants on [`CardGeometry::INSTAX_MINI`].

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("dimensions must be positive, got {width}x{height}")]
    EmptyDimensions { width: u32, height: u32 },
}

/// Integer pixel rectangle on a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle of the given size anchored at the origin.
    pub const fn sized(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Center point in continuous surface coordinates.
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// True when `other` lies entirely inside `self`.
    pub fn encloses(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }
}

/// Fixed layout of the physical film card.
///
/// ```text
/// ┌──────────────── 648 ────────────────┐
/// │  48                                 │
/// │    ┌──────────── 552 ────────────┐  │
/// │    │                             │  │
/// │    │           image             │ 1032
/// │    │          window            744 │
/// │    │                             │  │
/// │    └─────────────────────────────┘  │
/// │            writing strip            │
/// └─────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardGeometry {
    pub card_width: u32,
    pub card_height: u32,
    pub corner_radius: u32,
    pub image_width: u32,
    pub image_height: u32,
}

impl CardGeometry {
    pub const INSTAX_MINI: Self = Self {
        card_width: 648,
        card_height: 1032,
        corner_radius: 30,
        image_width: 552,
        image_height: 744,
    };

    /// Side margin, also used as the top margin. Zero when the window is
    /// wider than the card.
    pub const fn margin(&self) -> u32 {
        self.card_width.saturating_sub(self.image_width) / 2
    }

    pub const fn card_rect(&self) -> Rect {
        Rect::sized(self.card_width, self.card_height)
    }

    /// Where the photo sits on the card.
    pub const fn image_window(&self) -> Rect {
        let m = self.margin();
        Rect::new(m, m, self.image_width, self.image_height)
    }

    /// The preview frame: the image window moved to the origin.
    pub const fn preview_rect(&self) -> Rect {
        Rect::sized(self.image_width, self.image_height)
    }
}

/// Source-image region selected to match the target aspect ratio.
///
/// Coordinates are fractional source pixels. One axis always spans the full
/// source extent; the other is shrunk and centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRectangle {
    pub sx: f64,
    pub sy: f64,
    pub s_width: f64,
    pub s_height: f64,
}

impl CropRectangle {
    pub fn aspect_ratio(&self) -> f64 {
        self.s_width / self.s_height
    }

    /// Window pixels per source pixel when drawn `target_width` wide.
    ///
    /// The crop has the window's aspect ratio, so this holds on both axes.
    pub fn scale_to(&self, target_width: u32) -> f64 {
        target_width as f64 / self.s_width
    }
}

/// Compute the centered crop of a source image for a target aspect ratio.
///
/// # Arguments
/// * `source_width`, `source_height` - Source image size in pixels
/// * `target_width`, `target_height` - Target frame size (only the ratio matters)
///
/// # Examples
/// ```
/// # use instant_film::imaging::resolve_crop;
/// // Landscape 4:3 into the 552x744 window: full height, centered horizontally
/// let crop = resolve_crop(4000, 3000, 552, 744).unwrap();
/// assert_eq!(crop.sy, 0.0);
/// assert_eq!(crop.s_height, 3000.0);
/// assert!((crop.sx - 887.097).abs() < 1e-3);
/// ```
pub fn resolve_crop(
    source_width: u32,
    source_height: u32,
    target_width: u32,
    target_height: u32,
) -> Result<CropRectangle, GeometryError> {
    if source_width == 0 || source_height == 0 {
        return Err(GeometryError::EmptyDimensions {
            width: source_width,
            height: source_height,
        });
    }
    if target_width == 0 || target_height == 0 {
        return Err(GeometryError::EmptyDimensions {
            width: target_width,
            height: target_height,
        });
    }

    let (sw, sh) = (source_width as f64, source_height as f64);
    let target_ratio = target_width as f64 / target_height as f64;
    let source_ratio = sw / sh;

    if source_ratio > target_ratio {
        // Source is wider: keep full height, trim the sides
        let s_width = sh * target_ratio;
        Ok(CropRectangle {
            sx: (sw - s_width) / 2.0,
            sy: 0.0,
            s_width,
            s_height: sh,
        })
    } else {
        // Source is taller (or exact): keep full width, trim top and bottom
        let s_height = sw / target_ratio;
        Ok(CropRectangle {
            sx: 0.0,
            sy: (sh - s_height) / 2.0,
            s_width: sw,
            s_height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: CardGeometry = CardGeometry::INSTAX_MINI;
    const TARGET: f64 = 552.0 / 744.0;

    fn crop(w: u32, h: u32) -> CropRectangle {
        resolve_crop(w, h, WINDOW.image_width, WINDOW.image_height).unwrap()
    }

    // =========================================================================
    // CardGeometry tests
    // =========================================================================

    #[test]
    fn instax_mini_margin_is_48() {
        assert_eq!(WINDOW.margin(), 48);
    }

    #[test]
    fn oversized_window_has_no_margin() {
        let geo = CardGeometry {
            image_width: 700,
            ..CardGeometry::INSTAX_MINI
        };
        assert_eq!(geo.margin(), 0);
        assert_eq!(geo.image_window().x, 0);
    }

    #[test]
    fn image_window_is_centered_horizontally() {
        let win = WINDOW.image_window();
        assert_eq!(win, Rect::new(48, 48, 552, 744));
        assert_eq!(WINDOW.card_width - win.right(), win.x);
    }

    #[test]
    fn image_window_fits_inside_card() {
        assert!(WINDOW.card_rect().encloses(&WINDOW.image_window()));
    }

    #[test]
    fn preview_rect_is_window_at_origin() {
        assert_eq!(WINDOW.preview_rect(), Rect::new(0, 0, 552, 744));
    }

    // =========================================================================
    // resolve_crop tests
    // =========================================================================

    #[test]
    fn landscape_source_uses_full_height() {
        // 4000x3000 (1.333) is wider than 0.742
        let c = crop(4000, 3000);
        assert_eq!(c.sy, 0.0);
        assert_eq!(c.s_height, 3000.0);
        assert!((c.s_width - 2225.806).abs() < 1e-3);
        assert!((c.sx - 887.097).abs() < 1e-3);
    }

    #[test]
    fn tall_source_uses_full_width() {
        // 400x800 (0.5) is narrower than 0.742
        let c = crop(400, 800);
        assert_eq!(c.sx, 0.0);
        assert_eq!(c.s_width, 400.0);
        assert!((c.s_height - 539.130).abs() < 1e-3);
        assert!((c.sy - 130.435).abs() < 1e-3);
    }

    #[test]
    fn exact_ratio_source_is_uncropped() {
        let c = crop(552, 744);
        assert_eq!(c.sx, 0.0);
        assert!(c.sy.abs() < 1e-9);
        assert_eq!(c.s_width, 552.0);
        assert!((c.s_height - 744.0).abs() < 1e-9);
    }

    #[test]
    fn scaled_exact_ratio_source_is_uncropped() {
        let c = crop(1104, 1488);
        assert_eq!(c.sx, 0.0);
        assert!(c.sy.abs() < 1e-9);
    }

    #[test]
    fn crop_ratio_matches_target_for_many_sizes() {
        for &(w, h) in &[
            (1, 1),
            (1, 10_000),
            (10_000, 1),
            (640, 480),
            (480, 640),
            (3024, 4032),
            (6000, 4000),
            (553, 744),
            (552, 745),
        ] {
            let c = crop(w, h);
            assert!(
                (c.aspect_ratio() - TARGET).abs() < 1e-9,
                "{w}x{h} gave ratio {}",
                c.aspect_ratio()
            );
        }
    }

    #[test]
    fn crop_stays_inside_source() {
        for &(w, h) in &[(4000, 3000), (400, 800), (1, 1), (7, 3000), (3000, 7)] {
            let c = crop(w, h);
            assert!(c.sx >= 0.0 && c.sy >= 0.0, "{w}x{h}");
            assert!(c.sx + c.s_width <= w as f64 + 1e-9, "{w}x{h}");
            assert!(c.sy + c.s_height <= h as f64 + 1e-9, "{w}x{h}");
        }
    }

    #[test]
    fn crop_is_centered_on_surplus_axis() {
        let c = crop(4000, 3000);
        let right_margin = 4000.0 - (c.sx + c.s_width);
        assert!((c.sx - right_margin).abs() < 1e-9);

        let c = crop(400, 800);
        let bottom_margin = 800.0 - (c.sy + c.s_height);
        assert!((c.sy - bottom_margin).abs() < 1e-9);
    }

    #[test]
    fn zero_source_dimensions_rejected() {
        assert_eq!(
            resolve_crop(0, 100, 552, 744),
            Err(GeometryError::EmptyDimensions {
                width: 0,
                height: 100
            })
        );
        assert!(resolve_crop(100, 0, 552, 744).is_err());
    }

    #[test]
    fn zero_target_dimensions_rejected() {
        assert!(resolve_crop(100, 100, 0, 744).is_err());
    }

    // =========================================================================
    // scale tests
    // =========================================================================

    #[test]
    fn scale_is_the_same_on_both_axes() {
        for &(w, h) in &[(4000, 3000), (400, 800), (13, 7), (552, 744)] {
            let c = crop(w, h);
            let sx = c.scale_to(552);
            let sy = 744.0 / c.s_height;
            assert!((sx - sy).abs() < 1e-9, "{w}x{h}: {sx} vs {sy}");
        }
    }

    #[test]
    fn scale_of_landscape_source() {
        // 552 / 2225.806
        assert!((crop(4000, 3000).scale_to(552) - 0.248).abs() < 1e-6);
    }
}
