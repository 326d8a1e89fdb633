//! Common types and utilities shared by the face detection and recognition crates

use thiserror::Error;

pub mod face;
pub mod geometry;
pub mod image;

pub use crate::face::Face;
pub use crate::geometry::{EulerAngle, Point, Rect};
pub use crate::image::{Image, Orientation, PixelFormat};

/// Processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Unsupported pixel format: {0}")]
    UnsupportedPixelFormat(PixelFormat),

    #[error("Invalid image dimensions: {0}")]
    InvalidImageDimensions(String),

    #[error("Image buffer too small: {actual} bytes (required: {required})")]
    BufferTooSmall { required: usize, actual: usize },
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;
