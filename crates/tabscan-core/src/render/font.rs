//! Label font discovery.

use std::path::Path;

use ab_glyph::FontVec;
use tracing::{debug, info};

const SYSTEM_FONT_PATHS: [&str; 5] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Load a TrueType font from a file.
pub fn font_from_file(path: &Path) -> Option<FontVec> {
    let data = std::fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

/// Load the configured font, falling back to common system fonts.
pub fn load_font(configured: Option<&Path>) -> Option<FontVec> {
    if let Some(path) = configured {
        if let Some(font) = font_from_file(path) {
            info!("Loaded font: {}", path.display());
            return Some(font);
        }
        debug!("Configured font {} could not be loaded", path.display());
    }

    for path in SYSTEM_FONT_PATHS {
        if let Some(font) = font_from_file(Path::new(path)) {
            info!("Loaded system font: {}", path);
            return Some(font);
        }
    }

    debug!("No system font found, text rendering will be skipped");
    None
}
