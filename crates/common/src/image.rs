//! Packed-pixel source image handed to the detection pipeline

use crate::{ProcessingError, Result};
use ::image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Byte order of a packed pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Alpha, red, green, blue (canonical layout for preprocessing)
    Argb8888,
    /// Alpha, blue, green, red
    Abgr8888,
    /// Blue, green, red, alpha
    Bgra8888,
    /// Red, green, blue, alpha
    Rgba8888,
    /// Packed 24-bit red, green, blue
    Rgb888,
    /// Packed 24-bit blue, green, red
    Bgr888,
    /// Single 8-bit luminance channel
    Gray8,
}

impl PixelFormat {
    #[must_use]
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::Argb8888
            | PixelFormat::Abgr8888
            | PixelFormat::Bgra8888
            | PixelFormat::Rgba8888 => 4,
            PixelFormat::Rgb888 | PixelFormat::Bgr888 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// EXIF-style orientation of the stored pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    Left,
    LeftMirrored,
    Right,
    RightMirrored,
}

/// Immutable packed-pixel image that either owns or borrows its bytes
#[derive(Debug, Clone)]
pub struct Image<'a> {
    data: Cow<'a, [u8]>,
    width: u32,
    height: u32,
    bytes_per_row: usize,
    format: PixelFormat,
    orientation: Orientation,
}

impl<'a> Image<'a> {
    /// Wrap a pixel buffer whose rows may carry trailing padding
    pub fn new(
        data: impl Into<Cow<'a, [u8]>>,
        width: u32,
        height: u32,
        bytes_per_row: usize,
        format: PixelFormat,
    ) -> Result<Self> {
        let data = data.into();
        if width == 0 || height == 0 {
            return Err(ProcessingError::InvalidImageDimensions(format!(
                "{width}x{height}"
            )));
        }

        let row_len = width as usize * format.bytes_per_pixel();
        if bytes_per_row < row_len {
            return Err(ProcessingError::InvalidImageDimensions(format!(
                "bytes per row {bytes_per_row} is less than {row_len} for width {width} ({format})"
            )));
        }

        let required = (height as usize - 1) * bytes_per_row + row_len;
        if data.len() < required {
            return Err(ProcessingError::BufferTooSmall {
                required,
                actual: data.len(),
            });
        }

        Ok(Self {
            data,
            width,
            height,
            bytes_per_row,
            format,
            orientation: Orientation::Up,
        })
    }

    /// Wrap a tightly packed pixel buffer (no row padding)
    pub fn packed(
        data: impl Into<Cow<'a, [u8]>>,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self> {
        let bytes_per_row = width as usize * format.bytes_per_pixel();
        Self::new(data, width, height, bytes_per_row, format)
    }

    /// Attach orientation metadata
    #[must_use]
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn bytes_per_row(&self) -> usize {
        self.bytes_per_row
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Raw bytes, including any row padding
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Pixel bytes of row `y`, without padding
    #[must_use]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.bytes_per_row;
        let len = self.width as usize * self.format.bytes_per_pixel();
        &self.data[start..start + len]
    }
}

impl Image<'static> {
    /// Take ownership of an RGBA buffer from the `image` crate
    pub fn from_rgba8(image: RgbaImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::packed(image.into_raw(), width, height, PixelFormat::Rgba8888)
    }

    /// Convert any decoded image into an owned RGBA image
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        Self::from_rgba8(image.to_rgba8())
    }
}
