//! Shared helpers for recognition integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use face_analysis_common::{EulerAngle, Face, Image, PixelFormat, Point, Rect};
use face_analysis_detection::{FaceDetection, FaceDetectionError};
use face_analysis_recognition::{FaceRecognition, FaceRecognitionError, FaceTemplate};
use image::RgbImage;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Face whose eyes sit 40px apart around `eye_center`
pub fn face_at(eye_center: Point, quality: f32) -> Face {
    let Point { x, y } = eye_center;
    Face {
        bounds: Rect::new(x - 50.0, y - 40.0, 100.0, 120.0),
        angle: EulerAngle::default(),
        quality,
        landmarks: [
            Point::new(x - 20.0, y),
            Point::new(x + 20.0, y),
            Point::new(x, y + 20.0),
            Point::new(x - 15.0, y + 40.0),
            Point::new(x + 15.0, y + 40.0),
        ],
    }
}

pub fn gray_image(width: u32, height: u32) -> Image<'static> {
    Image::packed(
        vec![128u8; width as usize * height as usize * 4],
        width,
        height,
        PixelFormat::Rgba8888,
    )
    .unwrap()
}

/// Detector returning a fixed list of faces, truncated to the limit
#[derive(Debug, Default)]
pub struct FixedDetector {
    pub faces: Vec<Face>,
    pub limits: Vec<usize>,
}

impl FixedDetector {
    pub fn new(faces: Vec<Face>) -> Self {
        Self {
            faces,
            limits: Vec::new(),
        }
    }
}

#[async_trait]
impl FaceDetection for FixedDetector {
    async fn detect_faces_in_image(
        &mut self,
        _image: &Image<'_>,
        limit: usize,
    ) -> Result<Vec<Face>, FaceDetectionError> {
        self.limits.push(limit);
        Ok(self.faces.iter().take(limit).cloned().collect())
    }
}

/// Recognizer deriving a template from each crop's mean colour
#[derive(Debug, Default)]
pub struct MeanColorRecognizer;

#[async_trait]
impl FaceRecognition for MeanColorRecognizer {
    async fn create_templates_from_aligned_faces(
        &self,
        aligned_faces: &[RgbImage],
    ) -> Result<Vec<FaceTemplate>, FaceRecognitionError> {
        Ok(aligned_faces
            .iter()
            .map(|crop| {
                let mut sums = [0.0f32; 3];
                for pixel in crop.pixels() {
                    for (sum, value) in sums.iter_mut().zip(pixel.0) {
                        *sum += f32::from(value);
                    }
                }
                FaceTemplate::new(sums.to_vec()).normalized()
            })
            .collect())
    }
}
