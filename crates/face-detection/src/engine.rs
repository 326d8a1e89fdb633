//! Inference backends for the detector model

use crate::config::FaceDetectionConfig;
use crate::session::create_session;
use crate::FaceDetectionError;
use ndarray::ArrayView4;
use ort::{session::Session, value::TensorRef};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Runs the detector network on a prepared input tensor
///
/// Implementations return every requested output they produced, flattened in
/// row-major order. Outputs the model did not produce are left out of the map;
/// the decoder reports them as missing.
pub trait InferenceEngine: Send {
    fn run(
        &mut self,
        input: ArrayView4<'_, f32>,
        output_names: &[&str],
    ) -> Result<HashMap<String, Vec<f32>>, FaceDetectionError>;
}

/// [`InferenceEngine`] backed by an ONNX Runtime session
pub struct OrtInferenceEngine {
    session: Session,
    input_name: String,
}

impl OrtInferenceEngine {
    #[must_use]
    pub fn new(session: Session, input_name: impl Into<String>) -> Self {
        Self {
            session,
            input_name: input_name.into(),
        }
    }

    /// Load the model named by the configuration
    pub fn from_config(config: &FaceDetectionConfig) -> Result<Self, FaceDetectionError> {
        let session = create_session(&config.model_path, config)?;
        Ok(Self::new(session, config.input_name.clone()))
    }
}

impl std::fmt::Debug for OrtInferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInferenceEngine")
            .field("input_name", &self.input_name)
            .finish_non_exhaustive()
    }
}

impl InferenceEngine for OrtInferenceEngine {
    fn run(
        &mut self,
        input: ArrayView4<'_, f32>,
        output_names: &[&str],
    ) -> Result<HashMap<String, Vec<f32>>, FaceDetectionError> {
        let input_tensor = TensorRef::from_array_view(input)
            .map_err(|e| FaceDetectionError::InferenceError(e.to_string()))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| FaceDetectionError::InferenceError(e.to_string()))?;

        let mut extracted = HashMap::with_capacity(output_names.len());
        for &name in output_names {
            let Some(value) = outputs.get(name) else {
                warn!("Model did not produce output {}", name);
                continue;
            };
            let (shape, data) = value.try_extract_tensor::<f32>().map_err(|e| {
                FaceDetectionError::InferenceError(format!("Failed to extract {name}: {e}"))
            })?;
            debug!("Output {}: shape {:?}", name, shape);
            extracted.insert(name.to_string(), data.to_vec());
        }

        Ok(extracted)
    }
}
