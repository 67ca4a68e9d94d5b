//! Buffer shape, pixel formats and palettes.

use std::fmt;

/// Number of entries in an 8-bit indexed palette.
pub const PALETTE_LEN: usize = 256;

/// Pixel layout of a buffer.
///
/// The pool does not interpret pixel content; the format only fixes the
/// number of bytes per pixel and whether a palette is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// No format. Rejected at pool construction; a released pool reports it.
    #[default]
    Undefined,
    /// 8 bits per pixel, index into a 256-entry palette.
    Indexed8,
    /// 8 bits per pixel, greyscale intensity.
    Gray8,
    /// 24 bits per pixel, three 8-bit channels.
    Rgb24,
    /// 32 bits per pixel, four 8-bit channels.
    Rgba32,
}

impl PixelFormat {
    /// Returns the number of bytes one pixel occupies.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Undefined => 0,
            PixelFormat::Indexed8 | PixelFormat::Gray8 => 1,
            PixelFormat::Rgb24 => 3,
            PixelFormat::Rgba32 => 4,
        }
    }

    /// Returns `true` for palette-based formats.
    pub const fn is_indexed(self) -> bool {
        matches!(self, PixelFormat::Indexed8)
    }

    /// Returns `true` for every format except [`PixelFormat::Undefined`].
    pub const fn is_defined(self) -> bool {
        !matches!(self, PixelFormat::Undefined)
    }
}

/// The `(width, height, format)` triple shared by every buffer of a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub format: PixelFormat,
}

impl Shape {
    /// Creates a new shape.
    pub const fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width,
            height,
            format,
        }
    }

    /// Returns the number of meaningful bytes in one row, without padding.
    pub const fn row_bytes(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Returns the row stride rounded up to a multiple of `align`.
    ///
    /// `align` must be a power of two.
    pub const fn aligned_stride(&self, align: usize) -> usize {
        (self.row_bytes() + align - 1) & !(align - 1)
    }

    /// Returns `true` if `other` has the same dimensions and bytes per pixel.
    ///
    /// Buffers of layout-compatible shapes can be copied into each other even
    /// if their formats differ (`Indexed8` and `Gray8`).
    pub fn is_layout_compatible(&self, other: &Shape) -> bool {
        self.width == other.width
            && self.height == other.height
            && self.format.bytes_per_pixel() == other.format.bytes_per_pixel()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} {:?}", self.width, self.height, self.format)
    }
}

/// A 256-entry RGBA colour table for indexed buffers.
///
/// A pool builds one palette and shares it by reference with all of its
/// buffers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [[u8; 4]; PALETTE_LEN],
}

impl Palette {
    /// Builds the identity greyscale ramp: entry `j` is `(j, j, j, 255)`.
    pub fn greyscale() -> Self {
        let mut entries = [[0u8; 4]; PALETTE_LEN];
        for (j, entry) in entries.iter_mut().enumerate() {
            let v = j as u8;
            *entry = [v, v, v, 255];
        }
        Self { entries }
    }

    /// Returns the RGBA value stored at `index`.
    pub fn entry(&self, index: u8) -> [u8; 4] {
        self.entries[index as usize]
    }

    /// Returns all entries.
    pub fn entries(&self) -> &[[u8; 4]; PALETTE_LEN] {
        &self.entries
    }
}
