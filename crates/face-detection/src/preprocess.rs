//! Preprocessing: pixel format conversion, letterbox resize and tensor normalization
//!
//! The detector expects a planar `[1, 3, H, W]` RGB tensor with values in
//! `[-127.5/128, 127.5/128]`. Source images are first converted into a
//! canonical ARGB byte layout so the rest of the pipeline never branches on
//! the source pixel format.

use crate::FaceDetectionError;
use face_analysis_common::{Image, PixelFormat, ProcessingError};
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, RgbaImage};
use ndarray::ArrayView4;
use tracing::debug;

/// Lower bound of the normalized tensor range
pub const NORMALIZED_MIN: f32 = -127.5 / 128.0;
/// Upper bound of the normalized tensor range
pub const NORMALIZED_MAX: f32 = 127.5 / 128.0;

const BYTES_PER_PIXEL: usize = 4;

/// Tightly packed ARGB8888 pixel buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgbBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl ArgbBuffer {
    /// Zero-filled (transparent black) buffer
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        }
    }

    /// Buffer filled with a single ARGB colour
    #[must_use]
    pub fn from_pixel(width: u32, height: u32, argb: [u8; 4]) -> Self {
        Self {
            width,
            height,
            data: argb.repeat(width as usize * height as usize),
        }
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
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// ARGB bytes of the pixel at `(x, y)`
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        [
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ]
    }

    /// Drop alpha and return an RGB image (for alignment and encoding)
    #[must_use]
    pub fn to_rgb_image(&self) -> RgbImage {
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let [_, r, g, b] = self.pixel(x, y);
            Rgb([r, g, b])
        })
    }

    fn to_rgba_image(&self) -> Option<RgbaImage> {
        let rgba = self
            .data
            .chunks_exact(BYTES_PER_PIXEL)
            .flat_map(|px| [px[1], px[2], px[3], px[0]])
            .collect();
        RgbaImage::from_raw(self.width, self.height, rgba)
    }
}

/// Channel permutation into ARGB: destination channel `i` takes source byte `map[i]`
fn argb_permute_map(format: PixelFormat) -> Result<Option<[usize; 4]>, ProcessingError> {
    match format {
        PixelFormat::Argb8888 => Ok(None),
        PixelFormat::Abgr8888 => Ok(Some([0, 3, 2, 1])),
        PixelFormat::Bgra8888 => Ok(Some([3, 2, 1, 0])),
        PixelFormat::Rgba8888 => Ok(Some([3, 0, 1, 2])),
        other => Err(ProcessingError::UnsupportedPixelFormat(other)),
    }
}

/// Convert a 32-bit packed image into canonical ARGB
///
/// Already-canonical input is copied row by row; row padding is dropped.
pub fn convert_to_argb(image: &Image<'_>) -> Result<ArgbBuffer, ProcessingError> {
    let permute = argb_permute_map(image.format())?;
    let (width, height) = (image.width(), image.height());

    let mut data = Vec::with_capacity(width as usize * height as usize * BYTES_PER_PIXEL);
    for y in 0..height {
        let row = image.row(y);
        match permute {
            None => data.extend_from_slice(row),
            Some(map) => {
                for px in row.chunks_exact(BYTES_PER_PIXEL) {
                    data.extend_from_slice(&[px[map[0]], px[map[1]], px[map[2]], px[map[3]]]);
                }
            }
        }
    }

    Ok(ArgbBuffer {
        width,
        height,
        data,
    })
}

/// Size of the scaled image inside the letterbox canvas
#[must_use]
pub fn letterbox_size(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (dst_w, dst_h) = target;
    let image_ratio = f64::from(src_h) / f64::from(src_w);
    let target_ratio = f64::from(dst_h) / f64::from(dst_w);

    let (new_w, new_h) = if image_ratio > target_ratio {
        let new_h = dst_h;
        ((f64::from(new_h) / image_ratio).round() as u32, new_h)
    } else {
        let new_w = dst_w;
        (new_w, (f64::from(new_w) * image_ratio).round() as u32)
    };

    (new_w.clamp(1, dst_w), new_h.clamp(1, dst_h))
}

/// Scale `source` into a zero-padded `target` canvas, preserving aspect ratio
///
/// The scaled image occupies the top-left corner. Returns the canvas and the
/// applied scale (`new_height / source_height`); dividing canvas coordinates by
/// the scale maps them back onto the source image.
pub fn letterbox(
    source: &ArgbBuffer,
    target: (u32, u32),
) -> Result<(ArgbBuffer, f32), FaceDetectionError> {
    let (src_w, src_h) = (source.width(), source.height());
    let (dst_w, dst_h) = target;
    if src_w == 0 || src_h == 0 || dst_w == 0 || dst_h == 0 {
        return Err(FaceDetectionError::ImageResizeFailure(format!(
            "cannot letterbox {src_w}x{src_h} into {dst_w}x{dst_h}"
        )));
    }

    let (new_w, new_h) = letterbox_size((src_w, src_h), target);
    let scale = (f64::from(new_h) / f64::from(src_h)) as f32;

    let rgba = source.to_rgba_image().ok_or_else(|| {
        FaceDetectionError::ImageResizeFailure("source buffer does not match its dimensions".into())
    })?;
    let scaled = imageops::resize(&rgba, new_w, new_h, FilterType::Lanczos3);

    let mut canvas = ArgbBuffer::new(dst_w, dst_h);
    let canvas_row = dst_w as usize * BYTES_PER_PIXEL;
    for (y, row) in scaled.rows().enumerate() {
        let start = y * canvas_row;
        for (x, px) in row.enumerate() {
            let offset = start + x * BYTES_PER_PIXEL;
            let [r, g, b, a] = px.0;
            canvas.data[offset..offset + BYTES_PER_PIXEL].copy_from_slice(&[a, r, g, b]);
        }
    }

    debug!(
        "Letterboxed {}x{} into {}x{} (content {}x{}, scale {:.4})",
        src_w, src_h, dst_w, dst_h, new_w, new_h, scale
    );

    Ok((canvas, scale))
}

/// Map a byte to the normalized tensor range
#[inline]
#[must_use]
pub fn normalize_byte(value: u8) -> f32 {
    let scale = (NORMALIZED_MAX - NORMALIZED_MIN) / 255.0;
    f32::from(value) * scale + NORMALIZED_MIN
}

/// Reusable planar float storage for the model input tensor
///
/// Owned by the caller and passed into each detection call. Storage is kept
/// while the canvas size is unchanged and reallocated when it changes; every
/// call overwrites all `3 * width * height` values.
#[derive(Debug, Default)]
pub struct TensorBuffers {
    size: (usize, usize),
    planes: Vec<f32>,
}

impl TensorBuffers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `(width, height)` of the last written canvas
    #[must_use]
    pub fn size(&self) -> (usize, usize) {
        self.size
    }

    /// Planar R, G, B values from the last write
    #[must_use]
    pub fn planes(&self) -> &[f32] {
        &self.planes
    }

    fn ensure_capacity(&mut self, width: usize, height: usize) {
        if self.size == (width, height) && self.planes.len() == 3 * width * height {
            return;
        }
        self.size = (width, height);
        self.planes = vec![0.0; 3 * width * height];
    }

    /// Write the canvas as normalized planar RGB and view it as a `[1, 3, H, W]` tensor
    pub fn write_normalized_rgb(
        &mut self,
        canvas: &ArgbBuffer,
    ) -> Result<ArrayView4<'_, f32>, FaceDetectionError> {
        let width = canvas.width() as usize;
        let height = canvas.height() as usize;
        self.ensure_capacity(width, height);

        let plane_len = width * height;
        let (red, rest) = self.planes.split_at_mut(plane_len);
        let (green, blue) = rest.split_at_mut(plane_len);
        for (i, px) in canvas.as_bytes().chunks_exact(BYTES_PER_PIXEL).enumerate() {
            red[i] = normalize_byte(px[1]);
            green[i] = normalize_byte(px[2]);
            blue[i] = normalize_byte(px[3]);
        }

        ArrayView4::from_shape((1, 3, height, width), &self.planes[..])
            .map_err(|e| FaceDetectionError::ImageResizeFailure(format!("tensor shape: {e}")))
    }
}

/// Full image-to-tensor preparation for a fixed model input size
#[derive(Debug, Clone, Copy)]
pub struct Preprocessing {
    input_size: (u32, u32),
}

impl Preprocessing {
    #[must_use]
    pub fn new(input_width: u32, input_height: u32) -> Self {
        Self {
            input_size: (input_width, input_height),
        }
    }

    #[must_use]
    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }

    /// Convert, letterbox and normalize `image` into `buffers`
    ///
    /// Returns the tensor view and the letterbox scale.
    pub fn prepare<'b>(
        &self,
        image: &Image<'_>,
        buffers: &'b mut TensorBuffers,
    ) -> Result<(ArrayView4<'b, f32>, f32), FaceDetectionError> {
        let argb = convert_to_argb(image)?;
        let (canvas, scale) = letterbox(&argb, self.input_size)?;
        let tensor = buffers.write_normalized_rgb(&canvas)?;
        Ok((tensor, scale))
    }
}
