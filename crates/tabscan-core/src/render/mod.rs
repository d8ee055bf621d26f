//! Image outputs: detection overlay and grid preview.

mod font;
mod overlay;
mod preview;

pub use font::{font_from_file, load_font};
pub use overlay::{draw_overlay, label, render_overlay, OverlayStyle};
pub use preview::{draw_table_preview, PREVIEW_CELL_HEIGHT, PREVIEW_CELL_WIDTH};

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};

use crate::error::ExportError;
use crate::export::write_atomically;

/// Encode `image` in memory in the format implied by `path`.
pub fn encode_image(image: RgbImage, path: &Path) -> Result<Vec<u8>, ExportError> {
    let encode_err = |source: image::ImageError| ExportError::Encode {
        path: path.to_path_buf(),
        source,
    };

    let format = ImageFormat::from_path(path).map_err(encode_err)?;
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(image)
        .write_to(&mut buffer, format)
        .map_err(encode_err)?;

    Ok(buffer.into_inner())
}

/// Encode `image` in the format implied by `path` and write it atomically.
pub fn save_image(image: RgbImage, path: &Path) -> Result<PathBuf, ExportError> {
    let bytes = encode_image(image, path)?;
    write_atomically(path, &bytes)?;
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_unknown_extension_is_an_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.nope");
        let err = save_image(RgbImage::new(2, 2), &path).unwrap_err();
        assert!(matches!(err, ExportError::Encode { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_jpeg_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.jpg");
        save_image(RgbImage::from_pixel(8, 4, Rgb([10, 20, 30])), &path).unwrap();
        assert_eq!(image::open(&path).unwrap().height(), 4);
    }
}
