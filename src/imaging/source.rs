//! Decoding user photos into a [`SourceImage`].
//!
//! | Input | Path |
//! |---|---|
//! | Raw bytes (JPEG, PNG, TIFF, WebP) | `image::load_from_memory` |
//! | File on disk | `image::ImageReader` with format sniffing |
//! | `data:image/...;base64,` URI | `base64` standard engine, then bytes |
//!
//! Decoding happens once per request, before the compositing pass starts.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Invalid data URI: {0}")]
    DataUri(String),
    #[error("Image has no pixels ({width}x{height})")]
    Empty { width: u32, height: u32 },
}

/// Extensions whose decoders are compiled in.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the set of image file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// True when the path's extension is one we can decode.
pub fn is_supported_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            supported_input_extensions()
                .iter()
                .any(|s| s.eq_ignore_ascii_case(e))
        })
}

/// An immutable decoded photo.
///
/// Pixels are stored as 8-bit RGBA. `origin_clean` mirrors a browser's
/// cross-origin rule: a foreign-origin image may be drawn, but a surface it
/// was drawn into refuses pixel reads afterwards.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
    origin_clean: bool,
}

impl SourceImage {
    /// Wrap an already-decoded image.
    pub fn from_image(image: DynamicImage) -> Result<Self, SourceError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(SourceError::Empty { width, height });
        }
        Ok(Self {
            pixels: image.into_rgba8(),
            origin_clean: true,
        })
    }

    /// Decode encoded image bytes, sniffing the format.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SourceError> {
        let image = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()?;
        Self::from_image(image)
    }

    /// Decode an image file from disk.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        Self::from_image(image)
    }

    /// Decode a `data:image/<type>;base64,<payload>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, SourceError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| SourceError::DataUri("missing 'data:' scheme".into()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| SourceError::DataUri("missing ',' separator".into()))?;
        if !header.ends_with(";base64") {
            return Err(SourceError::DataUri("only base64 payloads are supported".into()));
        }
        if !header.starts_with("image/") {
            return Err(SourceError::DataUri(format!("not an image type: {header}")));
        }
        let bytes = STANDARD
            .decode(payload.trim())
            .map_err(|e| SourceError::DataUri(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Mark this image as coming from a foreign origin.
    pub fn with_foreign_origin(mut self) -> Self {
        self.origin_clean = false;
        self
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn origin_clean(&self) -> bool {
        self.origin_clean
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{encode_png, gradient_image};

    #[test]
    fn supported_extensions_match_decodable_formats() {
        let exts = supported_input_extensions();
        for expected in &["jpg", "jpeg", "png", "tif", "tiff", "webp"] {
            assert!(
                exts.contains(expected),
                "expected {expected} in supported extensions"
            );
        }
    }

    #[test]
    fn supported_path_is_case_insensitive() {
        assert!(is_supported_path(Path::new("holiday.JPG")));
        assert!(is_supported_path(Path::new("a/b/scan.tiff")));
        assert!(!is_supported_path(Path::new("notes.txt")));
        assert!(!is_supported_path(Path::new("no_extension")));
    }

    #[test]
    fn from_bytes_decodes_png() {
        let bytes = encode_png(&gradient_image(30, 20));
        let src = SourceImage::from_bytes(&bytes).unwrap();
        assert_eq!((src.width(), src.height()), (30, 20));
        assert!(src.origin_clean());
    }

    #[test]
    fn from_bytes_rejects_garbage() {
        let result = SourceImage::from_bytes(b"definitely not an image");
        assert!(result.is_err());
    }

    #[test]
    fn from_data_uri_decodes_png() {
        let bytes = encode_png(&gradient_image(8, 6));
        let uri = format!("data:image/png;base64,{}", STANDARD.encode(&bytes));
        let src = SourceImage::from_data_uri(&uri).unwrap();
        assert_eq!((src.width(), src.height()), (8, 6));
    }

    #[test]
    fn from_data_uri_rejects_other_schemes() {
        let err = SourceImage::from_data_uri("https://example.com/a.png").unwrap_err();
        assert!(matches!(err, SourceError::DataUri(_)));
    }

    #[test]
    fn from_data_uri_rejects_non_base64() {
        let err = SourceImage::from_data_uri("data:image/png,rawbytes").unwrap_err();
        assert!(matches!(err, SourceError::DataUri(_)));
    }

    #[test]
    fn from_data_uri_rejects_non_image() {
        let err = SourceImage::from_data_uri("data:text/plain;base64,aGk=").unwrap_err();
        assert!(matches!(err, SourceError::DataUri(_)));
    }

    #[test]
    fn open_reads_file_from_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("photo.png");
        std::fs::write(&path, encode_png(&gradient_image(12, 16))).unwrap();

        let src = SourceImage::open(&path).unwrap();
        assert_eq!((src.width(), src.height()), (12, 16));
    }

    #[test]
    fn open_missing_file_errors() {
        let result = SourceImage::open(Path::new("/nonexistent/photo.jpg"));
        assert!(matches!(result, Err(SourceError::Io(_))));
    }

    #[test]
    fn empty_image_rejected() {
        let result = SourceImage::from_image(DynamicImage::new_rgba8(0, 10));
        assert!(matches!(result, Err(SourceError::Empty { width: 0, .. })));
    }

    #[test]
    fn foreign_origin_flag() {
        let src = SourceImage::from_image(DynamicImage::ImageRgb8(gradient_image(2, 2)))
            .unwrap()
            .with_foreign_origin();
        assert!(!src.origin_clean());
    }
}
