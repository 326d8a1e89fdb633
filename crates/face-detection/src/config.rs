//! Detector configuration

use crate::postprocess::DEFAULT_IOU_THRESHOLD;
use crate::FaceDetectionError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable overriding the ONNX Runtime intra-op thread count
pub const THREADS_ENV_VAR: &str = "FACE_ANALYSIS_THREADS";

/// Default location of the 3-stride detector model
pub const DEFAULT_MODEL_PATH: &str = "models/face-detection/det_500m.onnx";

/// Hardware backends to request from ONNX Runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionProvider {
    /// CoreML, then CUDA, then CPU
    #[default]
    Auto,
    /// CPU only
    Cpu,
}

/// Configuration for face detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Path to the ONNX model
    pub model_path: PathBuf,
    /// Name of the model's image input
    pub input_name: String,
    /// `IoU` threshold for non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,
    /// Intra-op threads; falls back to `FACE_ANALYSIS_THREADS`, then physical cores
    pub intra_threads: Option<usize>,
    pub execution_provider: ExecutionProvider,
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            input_name: "input.1".to_string(),
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            intra_threads: None,
            execution_provider: ExecutionProvider::Auto,
        }
    }
}

impl FaceDetectionConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml(yaml_path: impl AsRef<Path>) -> Result<Self, FaceDetectionError> {
        let path = yaml_path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FaceDetectionError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML text; missing fields take their defaults
    pub fn from_yaml_str(contents: &str) -> Result<Self, FaceDetectionError> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| FaceDetectionError::ConfigError(format!("Failed to parse YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), FaceDetectionError> {
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(FaceDetectionError::ConfigError(format!(
                "iou_threshold must be within [0, 1], got {}",
                self.iou_threshold
            )));
        }
        if self.intra_threads == Some(0) {
            return Err(FaceDetectionError::ConfigError(
                "intra_threads must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Intra-op thread count for the inference session
    #[must_use]
    pub fn resolved_threads(&self) -> usize {
        self.intra_threads
            .or_else(|| {
                std::env::var(THREADS_ENV_VAR)
                    .ok()
                    .and_then(|s| s.parse::<usize>().ok())
                    .filter(|&n| n > 0)
            })
            .unwrap_or_else(num_cpus::get_physical)
    }
}
