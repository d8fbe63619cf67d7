//! Encoded output images handed back to the caller.
//!
//! The pipeline produces two of these per request: the full card and the
//! borderless preview. Both are lossless PNG and fully owned by the caller.

use crate::imaging::CropRectangle;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::Path;

/// A finished, encoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
    width: u32,
    height: u32,
    mime: &'static str,
}

impl EncodedImage {
    pub fn png(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            bytes,
            width,
            height,
            mime: "image/png",
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// `data:image/png;base64,...`, ready for an `<img src>` or a download link.
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes))
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.bytes)
    }
}

/// The pair every successful request returns.
#[derive(Debug, Clone)]
pub struct Artifacts {
    /// Full 648×1032 card with border, for download.
    pub card: EncodedImage,
    /// Borderless 552×744 image window, for on-screen display.
    pub preview: EncodedImage,
    /// The part of the source that went into the window.
    pub crop: CropRectangle,
}
