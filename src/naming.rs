//! Download filenames for developed cards.
//!
//! Cards are saved as `<prefix>-<token>.png`, where the token is a
//! monotonically increasing value (by default the current Unix time in
//! milliseconds) so repeated downloads never collide. The preview, when the
//! CLI writes it, gets a `-preview` suffix:
//!
//! - `polaroid-1718000000000.png` → card
//! - `polaroid-1718000000000-preview.png` → preview

use chrono::Utc;

pub const DEFAULT_PREFIX: &str = "polaroid";
const PREVIEW_SUFFIX: &str = "-preview";
const EXTENSION: &str = ".png";

/// Result of parsing a name like `polaroid-1718000000000.png`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedDownloadName {
    /// Everything before the last `-<token>` (may itself contain dashes).
    pub prefix: String,
    /// The distinguishing token.
    pub token: String,
    /// Whether this names the preview rather than the card.
    pub preview: bool,
}

/// Token for a new download: milliseconds since the Unix epoch.
pub fn timestamp_token() -> String {
    Utc::now().timestamp_millis().to_string()
}

/// `<prefix>-<token>.png`
pub fn card_file_name(prefix: &str, token: &str) -> String {
    format!("{prefix}-{token}{EXTENSION}")
}

/// `<prefix>-<token>-preview.png`
pub fn preview_file_name(prefix: &str, token: &str) -> String {
    format!("{prefix}-{token}{PREVIEW_SUFFIX}{EXTENSION}")
}

/// Parse a download filename back into its parts.
///
/// Handles these patterns:
/// - `"polaroid-1718.png"` → prefix="polaroid", token="1718", preview=false
/// - `"polaroid-1718-preview.png"` → prefix="polaroid", token="1718", preview=true
/// - `"my-trip-42.png"` → prefix="my-trip", token="42", preview=false
/// - `"polaroid.png"`, `"polaroid-.png"`, `"photo.jpg"` → None
pub fn parse_download_name(name: &str) -> Option<ParsedDownloadName> {
    let stem = name.strip_suffix(EXTENSION)?;
    let (stem, preview) = match stem.strip_suffix(PREVIEW_SUFFIX) {
        Some(s) => (s, true),
        None => (stem, false),
    };
    let (prefix, token) = stem.rsplit_once('-')?;
    if prefix.is_empty() || token.is_empty() {
        return None;
    }
    Some(ParsedDownloadName {
        prefix: prefix.to_string(),
        token: token.to_string(),
        preview,
    })
}
