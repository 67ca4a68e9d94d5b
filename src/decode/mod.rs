//! Image file decoding into scratch buffers.
//!
//! Decoding is not poolable: every call allocates a temporary
//! [`RasterImage`] that the caller drops once its pixels have been copied
//! into a pooled buffer.

use std::path::{Path, PathBuf};

use tracing::trace;

use crate::buffer::{PixelFormat, RasterImage, Shape};
use crate::error::{PoolError, Result};

/// Checks that `path` is non-blank and names an existing file.
pub(crate) fn check_path(path: &Path) -> Result<()> {
    if path.as_os_str().to_string_lossy().trim().is_empty() || !path.is_file() {
        return Err(PoolError::InvalidPath {
            path: PathBuf::from(path),
        });
    }
    Ok(())
}

/// Decodes the image at `path` into a new bitmap of `shape`.
///
/// The decoded pixels are converted to `shape.format`; greyscale and indexed
/// targets both receive luminance values, which index the identity palette.
///
/// # Errors
///
/// - [`PoolError::Decode`] if the file cannot be read or decoded
/// - [`PoolError::ShapeMismatch`] if the image dimensions differ from `shape`
pub(crate) fn decode_scratch(path: &Path, shape: Shape) -> Result<RasterImage> {
    let decoded = image::open(path)?;
    if decoded.width() != shape.width || decoded.height() != shape.height {
        return Err(PoolError::ShapeMismatch {
            expected: shape,
            actual: Shape::new(decoded.width(), decoded.height(), shape.format),
        });
    }

    let packed = match shape.format {
        PixelFormat::Indexed8 | PixelFormat::Gray8 => decoded.into_luma8().into_raw(),
        PixelFormat::Rgb24 => decoded.into_rgb8().into_raw(),
        PixelFormat::Rgba32 => decoded.into_rgba8().into_raw(),
        PixelFormat::Undefined => {
            return Err(PoolError::InvalidConfig {
                message: "pixel format must be defined",
            });
        }
    };

    let mut scratch = RasterImage::new(shape);
    for (y, row) in packed.chunks_exact(shape.row_bytes()).enumerate() {
        scratch.row_mut(y as u32).copy_from_slice(row);
    }

    trace!(path = %path.display(), %shape, "decoded scratch image");
    Ok(scratch)
}
