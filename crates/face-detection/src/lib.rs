//! Face detection using a 3-stride `RetinaFace` (SCRFD-style) model
//!
//! This crate turns a packed-pixel image into a ranked list of faces with
//! bounding boxes, 5-point landmarks and head pose. The neural network itself
//! is reached through the [`InferenceEngine`] trait; [`OrtInferenceEngine`]
//! runs it with ONNX Runtime.
//!
//! # Pipeline
//! 1. Convert the source pixels to canonical ARGB ([`preprocess::convert_to_argb`])
//! 2. Letterbox into a 640x640 canvas ([`preprocess::letterbox`])
//! 3. Normalize into a planar `[1, 3, 640, 640]` tensor ([`TensorBuffers`])
//! 4. Run inference, decode the 3 stride heads ([`Postprocessing`])
//! 5. Non-maximum suppression, map back to image space, estimate pose
//!
//! # Example
//! ```no_run
//! use face_analysis_common::Image;
//! use face_analysis_detection::{FaceDetection, FaceDetectionConfig, RetinaFaceDetector};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut detector = RetinaFaceDetector::new(&FaceDetectionConfig::default())?;
//!
//! let decoded = image::open("portrait.jpg")?;
//! let image = Image::from_dynamic(&decoded)?;
//! let faces = detector.detect_faces_in_image(&image, 1).await?;
//!
//! for face in faces {
//!     println!("Face: quality {:.2} at ({:.0}, {:.0}), yaw {:.1}",
//!              face.quality, face.bounds.x, face.bounds.y, face.angle.yaw);
//! }
//! # Ok(())
//! # }
//! ```

pub mod anchors;
pub mod config;
pub mod detector;
pub mod engine;
pub mod pose;
pub mod postprocess;
pub mod preprocess;
pub mod session;
pub mod transform;

use face_analysis_common::ProcessingError;
use thiserror::Error;

pub use config::{ExecutionProvider, FaceDetectionConfig};
pub use detector::{FaceDetection, RetinaFaceDetector};
pub use engine::{InferenceEngine, OrtInferenceEngine};
pub use postprocess::{non_max_suppression, DetectionBox, Postprocessing, StrideOutputs};
pub use preprocess::{ArgbBuffer, Preprocessing, TensorBuffers};
pub use transform::AffineTransform;

/// Model input width in pixels
pub const INPUT_WIDTH: u32 = 640;
/// Model input height in pixels
pub const INPUT_HEIGHT: u32 = 640;

/// Errors that can occur during face detection
#[derive(Error, Debug)]
pub enum FaceDetectionError {
    #[error("Model file not found: {0}")]
    ModelNotFound(String),

    #[error("Failed to load ONNX model: {0}")]
    ModelLoadError(String),

    #[error("Failed to run inference: {0}")]
    InferenceError(String),

    #[error("Failed to resize input image: {0}")]
    ImageResizeFailure(String),

    #[error("Missing expected model outputs: {}", .0.join(", "))]
    MissingModelOutputs(Vec<String>),

    #[error("Malformed {head} output for stride {stride}: expected {expected} values, got {actual}")]
    MalformedModelOutput {
        head: &'static str,
        stride: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Processing error: {0}")]
    ProcessingError(#[from] ProcessingError),
}
