//! The face detection capability and its `RetinaFace` implementation

use crate::config::FaceDetectionConfig;
use crate::engine::{InferenceEngine, OrtInferenceEngine};
use crate::postprocess::{non_max_suppression, Postprocessing, OUTPUT_NAMES};
use crate::preprocess::{Preprocessing, TensorBuffers};
use crate::transform::AffineTransform;
use crate::{FaceDetectionError, INPUT_HEIGHT, INPUT_WIDTH};
use async_trait::async_trait;
use face_analysis_common::{Face, Image};
use tracing::{debug, info};

/// Detects faces in images
#[async_trait]
pub trait FaceDetection: Send {
    /// Detect up to `limit` faces, highest score first, in source image coordinates
    async fn detect_faces_in_image(
        &mut self,
        image: &Image<'_>,
        limit: usize,
    ) -> Result<Vec<Face>, FaceDetectionError>;
}

/// 3-stride `RetinaFace` detector
///
/// Owns the inference engine and the anchor cache. Tensor scratch space is
/// either owned by the caller ([`Self::detect_faces_with_buffers`]) or
/// allocated per call through [`FaceDetection`].
#[derive(Debug)]
pub struct RetinaFaceDetector<E = OrtInferenceEngine> {
    engine: E,
    preprocessing: Preprocessing,
    postprocessing: Postprocessing,
    iou_threshold: f32,
}

impl RetinaFaceDetector<OrtInferenceEngine> {
    /// Load the ONNX model named by `config`
    pub fn new(config: &FaceDetectionConfig) -> Result<Self, FaceDetectionError> {
        info!(
            "Loading RetinaFace model from {}",
            config.model_path.display()
        );
        let engine = OrtInferenceEngine::from_config(config)?;
        Self::with_engine(engine, config)
    }
}

impl<E: InferenceEngine> RetinaFaceDetector<E> {
    /// Detector running on an arbitrary inference backend
    pub fn with_engine(engine: E, config: &FaceDetectionConfig) -> Result<Self, FaceDetectionError> {
        config.validate()?;
        Ok(Self {
            engine,
            preprocessing: Preprocessing::new(INPUT_WIDTH, INPUT_HEIGHT),
            postprocessing: Postprocessing::new(INPUT_WIDTH, INPUT_HEIGHT),
            iou_threshold: config.iou_threshold,
        })
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Detect faces reusing caller-owned tensor buffers
    pub fn detect_faces_with_buffers(
        &mut self,
        image: &Image<'_>,
        limit: usize,
        buffers: &mut TensorBuffers,
    ) -> Result<Vec<Face>, FaceDetectionError> {
        debug!(
            "Detecting faces in {}x{} {} image",
            image.width(),
            image.height(),
            image.format()
        );

        let (tensor, scale) = self.preprocessing.prepare(image, buffers)?;
        let outputs = self.engine.run(tensor, &OUTPUT_NAMES)?;
        let candidates = self.postprocessing.decode_outputs(&outputs)?;
        debug!("Decoded {} candidates", candidates.len());

        let kept = non_max_suppression(candidates, self.iou_threshold, limit);

        let to_image = AffineTransform::scale(1.0 / scale, 1.0 / scale);
        let faces: Vec<Face> = kept
            .iter()
            .map(|detection| detection.applying_transform(&to_image).into_face())
            .collect();

        debug!("Detected {} faces", faces.len());
        Ok(faces)
    }
}

#[async_trait]
impl<E: InferenceEngine> FaceDetection for RetinaFaceDetector<E> {
    async fn detect_faces_in_image(
        &mut self,
        image: &Image<'_>,
        limit: usize,
    ) -> Result<Vec<Face>, FaceDetectionError> {
        let mut buffers = TensorBuffers::new();
        self.detect_faces_with_buffers(image, limit, &mut buffers)
    }
}
