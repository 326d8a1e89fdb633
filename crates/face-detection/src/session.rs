//! ONNX Runtime session creation with execution provider fallback

use crate::config::{ExecutionProvider, FaceDetectionConfig};
use crate::FaceDetectionError;
use ort::execution_providers::{
    CPUExecutionProvider, CUDAExecutionProvider, CoreMLExecutionProvider,
    ExecutionProviderDispatch,
};
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

fn builder_error(e: impl std::fmt::Display) -> FaceDetectionError {
    FaceDetectionError::ModelLoadError(format!("Failed to create session builder: {e}"))
}

fn session_builder(
    num_threads: usize,
    providers: Vec<ExecutionProviderDispatch>,
) -> Result<SessionBuilder, FaceDetectionError> {
    Session::builder()
        .map_err(builder_error)?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(builder_error)?
        .with_intra_threads(num_threads)
        .map_err(builder_error)?
        .with_memory_pattern(true)
        .map_err(builder_error)?
        .with_execution_providers(providers)
        .map_err(builder_error)
}

/// Create an optimized ONNX Runtime session for the detector model
///
/// With [`ExecutionProvider::Auto`] the providers are tried as CoreML, CUDA,
/// CPU. If CoreML cannot compile the model the session is rebuilt with CUDA
/// and CPU only.
pub fn create_session(
    model_path: &Path,
    config: &FaceDetectionConfig,
) -> Result<Session, FaceDetectionError> {
    if !model_path.exists() {
        return Err(FaceDetectionError::ModelNotFound(
            model_path.display().to_string(),
        ));
    }

    let num_threads = config.resolved_threads();
    let start = Instant::now();
    debug!(
        "Creating session for {} ({} threads, {:?})",
        model_path.display(),
        num_threads,
        config.execution_provider
    );

    let load_error = |e: ort::Error| {
        FaceDetectionError::ModelLoadError(format!("{}: {}", model_path.display(), e))
    };

    if config.execution_provider == ExecutionProvider::Cpu {
        let session = session_builder(num_threads, vec![CPUExecutionProvider::default().build()])?
            .commit_from_file(model_path)
            .map_err(load_error)?;
        info!(
            "Loaded {} on CPU in {:.3}s",
            model_path.display(),
            start.elapsed().as_secs_f64()
        );
        return Ok(session);
    }

    let attempt = session_builder(
        num_threads,
        vec![
            CoreMLExecutionProvider::default().with_subgraphs(true).build(),
            CUDAExecutionProvider::default().build(),
            CPUExecutionProvider::default().build(),
        ],
    )?
    .commit_from_file(model_path);

    match attempt {
        Ok(session) => {
            info!(
                "Loaded {} in {:.3}s",
                model_path.display(),
                start.elapsed().as_secs_f64()
            );
            Ok(session)
        }
        Err(e) => {
            let message = e.to_string();
            if !(message.contains("CoreML") || message.contains("MLModel")) {
                return Err(load_error(e));
            }

            warn!(
                "CoreML failed for {}: {}; retrying with CUDA/CPU only",
                model_path.display(),
                message
            );
            let session = session_builder(
                num_threads,
                vec![
                    CUDAExecutionProvider::default().build(),
                    CPUExecutionProvider::default().build(),
                ],
            )?
            .commit_from_file(model_path)
            .map_err(|e| {
                FaceDetectionError::ModelLoadError(format!(
                    "CoreML failed, CPU/CUDA also failed for {}: {}",
                    model_path.display(),
                    e
                ))
            })?;
            info!(
                "Loaded {} without CoreML in {:.3}s",
                model_path.display(),
                start.elapsed().as_secs_f64()
            );
            Ok(session)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_is_reported() {
        let config = FaceDetectionConfig::default();
        let err = create_session(Path::new("/nonexistent/det_500m.onnx"), &config).unwrap_err();
        assert!(matches!(err, FaceDetectionError::ModelNotFound(ref p) if p.contains("det_500m")));
    }
}
