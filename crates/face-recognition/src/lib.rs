//! ArcFace face recognition: alignment, templates and similarity
//!
//! Faces found by [`face_analysis_detection`] are aligned to the 112x112
//! ArcFace reference pose, turned into embedding templates by a
//! [`FaceRecognition`] backend, and compared with cosine similarity mapped
//! into `[0, 1]`.
//!
//! # Example
//! ```no_run
//! use face_analysis_common::Image;
//! use face_analysis_detection::{FaceDetection, FaceDetectionConfig, RetinaFaceDetector};
//! use face_analysis_recognition::{CloudFaceRecognition, CloudRecognitionConfig, FaceRecognition};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut detector = RetinaFaceDetector::new(&FaceDetectionConfig::default())?;
//! let recognizer = CloudFaceRecognition::new(CloudRecognitionConfig::new(
//!     "https://recognition.example.com/templates",
//!     "api-key",
//! ))?;
//!
//! let first = Image::from_dynamic(&image::open("first.jpg")?)?;
//! let second = Image::from_dynamic(&image::open("second.jpg")?)?;
//!
//! let faces = detector.detect_faces_in_image(&first, 1).await?;
//! let query = recognizer.create_templates(&faces, &first).await?;
//! let faces = detector.detect_faces_in_image(&second, 1).await?;
//! let candidates = recognizer.create_templates(&faces, &second).await?;
//!
//! let scores = recognizer.compare_templates(&candidates, &query[0]).await?;
//! println!("Similarity: {:.3}", scores[0]);
//! # Ok(())
//! # }
//! ```

pub mod alignment;
pub mod cloud;
pub mod recognizer;
pub mod refine;
pub mod similarity;
pub mod template;

use face_analysis_detection::FaceDetectionError;
use thiserror::Error;

pub use alignment::{align_face, ALIGNED_FACE_SIZE};
pub use cloud::{CloudFaceRecognition, CloudRecognitionConfig};
pub use recognizer::FaceRecognition;
pub use refine::refine_faces;
pub use similarity::{compare_one, compare_templates, normalize};
pub use template::{FaceTemplate, ARCFACE_TEMPLATE_VERSION};

/// Errors that can occur during face recognition
#[derive(Error, Debug)]
pub enum FaceRecognitionError {
    #[error("Face detection failure: expected {expected} faces, found {found}")]
    FaceDetectionFailure { expected: usize, found: usize },

    #[error("Face template extraction failed: {0}")]
    TemplateExtractionFailed(String),

    #[error("Template dimension mismatch: expected {expected}, got {actual}")]
    TemplateDimensionMismatch { expected: usize, actual: usize },

    #[error("Failed to encode face image: {0}")]
    ImageEncodingFailure(String),

    #[error("Face alignment failed: {0}")]
    AlignmentFailure(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Detection error: {0}")]
    Detection(#[from] FaceDetectionError),
}

pub type Result<T> = std::result::Result<T, FaceRecognitionError>;
