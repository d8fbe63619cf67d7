//! Card and preview compositors.
//!
//! ```text
//! SourceImage ─► resolve_crop ─► compose_card ──► card PNG (648×1032)
//!                                     │
//!                                     └─ NoiseBuffer ─► compose_preview ─► preview PNG (552×744)
//! ```
//!
//! Both compositors develop the image window the same way, on a window-sized
//! surface: paper → photo → vignette → grain → gloss. The preview is that
//! surface as is. The card draws the paper under its clip, lays the window
//! in at the margin, and adds the inset shadow ring. Grain is sampled once,
//! by the card, and the preview reuses that exact buffer, so the preview is
//! the card's image window minus its 1px shadow ring.

use crate::artifact::{Artifacts, EncodedImage};
use crate::config::Config;
use crate::imaging::effects::{apply_gloss, apply_grain, apply_inner_shadow, apply_vignette};
use crate::imaging::{
    CardGeometry, Color, CropRectangle, EffectParams, GeometryError, NoiseBuffer, SourceImage,
    Surface, SurfaceError, resolve_crop,
};
use image::imageops::FilterType;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),
    #[error("pixel access denied: the source image is not same-origin")]
    PixelAccessDenied,
    #[error("noise buffer is {actual:?} but the image window is {expected:?}")]
    NoiseMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("surface error: {0}")]
    Surface(SurfaceError),
}

impl From<SurfaceError> for ComposeError {
    fn from(e: SurfaceError) -> Self {
        match e {
            SurfaceError::PixelAccessDenied => ComposeError::PixelAccessDenied,
            other => ComposeError::Surface(other),
        }
    }
}

/// Everything the compositors need besides the photo itself.
///
/// The film format is always [`CardGeometry::INSTAX_MINI`]; only the look
/// is configurable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardStyle {
    geometry: CardGeometry,
    pub effects: EffectParams,
    /// Paper tone behind the photo.
    pub background: Color,
    pub rounded_corners: bool,
    pub filter: FilterType,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl CardStyle {
    pub fn from_config(config: &Config) -> Self {
        Self {
            geometry: CardGeometry::INSTAX_MINI,
            effects: config.effects,
            background: config.card.background,
            rounded_corners: config.card.rounded_corners,
            filter: config.card.resample_filter.into(),
        }
    }

    pub fn geometry(&self) -> CardGeometry {
        self.geometry
    }
}

/// The card plus the grain it was developed with.
#[derive(Debug, Clone)]
pub struct CardOutput {
    pub card: EncodedImage,
    pub noise: NoiseBuffer,
}

/// Paint the image window at the origin of its own surface.
///
/// Everything both artifacts share happens here, so the card's window and
/// the preview come from one code path.
fn develop_window(
    source: &SourceImage,
    crop: &CropRectangle,
    noise: &NoiseBuffer,
    style: &CardStyle,
) -> Result<Surface, ComposeError> {
    let rect = style.geometry.preview_rect();
    if (noise.width(), noise.height()) != (rect.width, rect.height) {
        return Err(ComposeError::NoiseMismatch {
            expected: (rect.width, rect.height),
            actual: (noise.width(), noise.height()),
        });
    }

    let mut surface = Surface::new(rect.width, rect.height)?;
    // Paper first, so translucent photos sit on the card tone
    surface.fill_rect(rect, &style.background.into());
    surface.draw_image(source, crop, rect, style.filter)?;

    apply_vignette(&mut surface, rect, &style.effects);
    apply_grain(&mut surface, rect, noise)?;
    apply_gloss(&mut surface, rect, &style.effects);
    Ok(surface)
}

/// Render the full card and sample the request's grain.
pub fn compose_card<R: Rng + ?Sized>(
    source: &SourceImage,
    crop: &CropRectangle,
    style: &CardStyle,
    rng: &mut R,
) -> Result<CardOutput, ComposeError> {
    let geo = style.geometry;
    let window = geo.image_window();
    let noise = NoiseBuffer::generate(
        window.width,
        window.height,
        style.effects.grain_amplitude,
        rng,
    );
    let developed = develop_window(source, crop, &noise, style)?;

    let mut surface = Surface::new(geo.card_width, geo.card_height)?;
    let card = geo.card_rect();
    let rounded =
        style.rounded_corners && surface.clip_to_rounded_rect(card, geo.corner_radius as f64);
    if !rounded {
        debug!(
            radius = geo.corner_radius,
            enabled = style.rounded_corners,
            "rounded clip unavailable, using rectangular card"
        );
        surface.clip_to_rect(card);
    }

    surface.fill_rect(card, &style.background.into());
    surface.draw_surface(&developed, window.x, window.y);
    apply_inner_shadow(&mut surface, window, &style.effects);

    let card = surface.encode_png()?;
    Ok(CardOutput { card, noise })
}

/// Render the borderless preview from the card's grain.
pub fn compose_preview(
    source: &SourceImage,
    crop: &CropRectangle,
    noise: &NoiseBuffer,
    style: &CardStyle,
) -> Result<EncodedImage, ComposeError> {
    let surface = develop_window(source, crop, noise, style)?;
    Ok(surface.encode_png()?)
}

/// Run the whole pipeline with fresh entropy for the grain.
pub fn develop(source: &SourceImage, style: &CardStyle) -> Result<Artifacts, ComposeError> {
    develop_with_rng(source, style, &mut StdRng::from_entropy())
}

/// Run the whole pipeline: crop, card, then preview from the card's grain.
///
/// Either both artifacts come back or neither does.
#[tracing::instrument(skip_all, fields(width = source.width(), height = source.height()))]
pub fn develop_with_rng<R: Rng + ?Sized>(
    source: &SourceImage,
    style: &CardStyle,
    rng: &mut R,
) -> Result<Artifacts, ComposeError> {
    let geo = style.geometry;
    let crop = resolve_crop(
        source.width(),
        source.height(),
        geo.image_width,
        geo.image_height,
    )?;
    debug!(
        sx = crop.sx,
        sy = crop.sy,
        s_width = crop.s_width,
        s_height = crop.s_height,
        "resolved crop"
    );

    let CardOutput { card, noise } = compose_card(source, &crop, style, rng)?;
    let preview = compose_preview(source, &crop, &noise, style)?;
    debug!(
        card_bytes = card.as_bytes().len(),
        preview_bytes = preview.as_bytes().len(),
        "developed"
    );
    Ok(Artifacts {
        card,
        preview,
        crop,
    })
}
