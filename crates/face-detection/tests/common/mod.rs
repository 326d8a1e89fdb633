//! Shared helpers for detection integration tests
//!
//! `SyntheticEngine` stands in for the ONNX model: it returns fixed head
//! outputs so the full pipeline can run without model files.

#![allow(dead_code)]

use face_analysis_common::{Image, PixelFormat};
use face_analysis_detection::anchors::{NUM_ANCHORS, STRIDES};
use face_analysis_detection::postprocess::{BOX_OUTPUTS, LANDMARK_OUTPUTS, SCORE_OUTPUTS};
use face_analysis_detection::{FaceDetectionError, InferenceEngine, INPUT_HEIGHT, INPUT_WIDTH};
use ndarray::ArrayView4;
use std::collections::HashMap;

/// Landmark offsets (in stride units) of an upright frontal face
pub const FRONTAL_LANDMARKS: [f32; 10] = [
    -1.0, -0.5, // left eye
    1.0, -0.5, // right eye
    0.0, 0.0, // nose tip
    -0.75, 1.0, // left mouth corner
    0.75, 1.0, // right mouth corner
];

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Engine returning canned outputs for the 640x640 detector heads
#[derive(Debug, Clone)]
pub struct SyntheticEngine {
    outputs: HashMap<String, Vec<f32>>,
    pub calls: usize,
    pub last_input_shape: Option<Vec<usize>>,
}

impl SyntheticEngine {
    /// All scores zero: nothing passes the threshold
    pub fn empty() -> Self {
        let mut outputs = HashMap::new();
        for (i, stride) in STRIDES.iter().enumerate() {
            let k = anchor_count(*stride);
            outputs.insert(SCORE_OUTPUTS[i].to_string(), vec![0.0; k]);
            outputs.insert(BOX_OUTPUTS[i].to_string(), vec![0.0; k * 4]);
            outputs.insert(LANDMARK_OUTPUTS[i].to_string(), vec![0.0; k * 10]);
        }
        Self {
            outputs,
            calls: 0,
            last_input_shape: None,
        }
    }

    /// Place a detection at grid cell `(row, col)` of `stride`, first anchor
    pub fn with_face(
        mut self,
        stride: usize,
        row: usize,
        col: usize,
        score: f32,
        box_deltas: [f32; 4],
        landmark_deltas: [f32; 10],
    ) -> Self {
        let i = stride_index(stride);
        let grid_width = INPUT_WIDTH as usize / stride;
        let idx = (row * grid_width + col) * NUM_ANCHORS;

        if let Some(scores) = self.outputs.get_mut(SCORE_OUTPUTS[i]) {
            scores[idx] = score;
        }
        if let Some(boxes) = self.outputs.get_mut(BOX_OUTPUTS[i]) {
            boxes[idx * 4..idx * 4 + 4].copy_from_slice(&box_deltas);
        }
        if let Some(landmarks) = self.outputs.get_mut(LANDMARK_OUTPUTS[i]) {
            landmarks[idx * 10..idx * 10 + 10].copy_from_slice(&landmark_deltas);
        }
        self
    }

    /// Drop one named output, as a mismatched model would
    pub fn without_output(mut self, name: &str) -> Self {
        self.outputs.remove(name);
        self
    }
}

impl InferenceEngine for SyntheticEngine {
    fn run(
        &mut self,
        input: ArrayView4<'_, f32>,
        output_names: &[&str],
    ) -> Result<HashMap<String, Vec<f32>>, FaceDetectionError> {
        self.calls += 1;
        self.last_input_shape = Some(input.shape().to_vec());
        Ok(output_names
            .iter()
            .filter_map(|name| {
                self.outputs
                    .get(*name)
                    .map(|data| ((*name).to_string(), data.clone()))
            })
            .collect())
    }
}

pub fn anchor_count(stride: usize) -> usize {
    (INPUT_HEIGHT as usize / stride) * (INPUT_WIDTH as usize / stride) * NUM_ANCHORS
}

fn stride_index(stride: usize) -> usize {
    STRIDES
        .iter()
        .position(|&s| s == stride)
        .unwrap_or_else(|| panic!("unsupported stride {stride}"))
}

/// Solid-colour BGRA image
pub fn solid_image(width: u32, height: u32, bgra: [u8; 4]) -> Image<'static> {
    let data = bgra.repeat(width as usize * height as usize);
    Image::packed(data, width, height, PixelFormat::Bgra8888).unwrap()
}
