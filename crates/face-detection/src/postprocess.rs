//! Detector output decoding and non-maximum suppression
//!
//! The model emits three heads per stride:
//! - scores: `[k]` face confidence per anchor
//! - boxes: `[k, 4]` distances `(left, top, right, bottom)` from the anchor, in stride units
//! - landmarks: `[k, 10]` five `(dx, dy)` offsets from the anchor, in stride units
//!
//! where `k = (H / stride) * (W / stride) * NUM_ANCHORS`.

use crate::anchors::{AnchorCache, NUM_ANCHORS, STRIDES};
use crate::pose::face_angle_from_landmarks;
use crate::transform::AffineTransform;
use crate::FaceDetectionError;
use face_analysis_common::{EulerAngle, Face, Point, Rect};
use std::collections::HashMap;
use tracing::debug;

/// Minimum score for an anchor to produce a detection
pub const SCORE_THRESHOLD: f32 = 0.3;

/// Default IoU threshold for non-maximum suppression
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.4;

/// Score head output names for strides 8, 16, 32
pub const SCORE_OUTPUTS: [&str; 3] = ["443", "468", "493"];
/// Box head output names for strides 8, 16, 32
pub const BOX_OUTPUTS: [&str; 3] = ["446", "471", "496"];
/// Landmark head output names for strides 8, 16, 32
pub const LANDMARK_OUTPUTS: [&str; 3] = ["449", "474", "499"];

/// All nine output names requested from the inference engine
pub const OUTPUT_NAMES: [&str; 9] = [
    "443", "468", "493", "446", "471", "496", "449", "474", "499",
];

const BOX_VALUES: usize = 4;
const LANDMARK_VALUES: usize = 10;

/// Raw head outputs for a single stride
#[derive(Debug, Clone, Copy)]
pub struct StrideOutputs<'a> {
    pub scores: &'a [f32],
    pub boxes: &'a [f32],
    pub landmarks: &'a [f32],
}

/// A decoded detection in some coordinate space
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionBox {
    pub score: f32,
    pub bounds: Rect,
    pub landmarks: [Point; 5],
    pub angle: EulerAngle,
    pub quality: f32,
}

impl DetectionBox {
    /// New detection with the transform applied to bounds and landmarks
    #[must_use]
    pub fn applying_transform(&self, transform: &AffineTransform) -> DetectionBox {
        DetectionBox {
            score: self.score,
            bounds: transform.apply_rect(&self.bounds),
            landmarks: self.landmarks.map(|p| transform.apply_point(&p)),
            angle: self.angle,
            quality: self.quality,
        }
    }

    /// Convert to a [`Face`], estimating head pose from the landmarks
    #[must_use]
    pub fn into_face(self) -> Face {
        Face {
            bounds: self.bounds,
            angle: face_angle_from_landmarks(&self.landmarks),
            quality: self.quality,
            landmarks: self.landmarks,
        }
    }
}

/// Decoder for the 3-stride detector heads
#[derive(Debug)]
pub struct Postprocessing {
    input_width: usize,
    input_height: usize,
    anchors: AnchorCache,
}

impl Postprocessing {
    #[must_use]
    pub fn new(input_width: u32, input_height: u32) -> Self {
        Self {
            input_width: input_width as usize,
            input_height: input_height as usize,
            anchors: AnchorCache::new(),
        }
    }

    /// Number of anchors the given stride produces for this input size
    #[must_use]
    pub fn anchor_count(&self, stride: usize) -> usize {
        (self.input_height / stride) * (self.input_width / stride) * NUM_ANCHORS
    }

    /// Decode all anchors of one stride whose score reaches [`SCORE_THRESHOLD`]
    pub fn decode_stride(
        &mut self,
        stride: usize,
        outputs: &StrideOutputs<'_>,
    ) -> Result<Vec<DetectionBox>, FaceDetectionError> {
        let height = self.input_height / stride;
        let width = self.input_width / stride;
        let count = self.anchor_count(stride);

        check_len("scores", stride, count, outputs.scores.len())?;
        check_len("boxes", stride, count * BOX_VALUES, outputs.boxes.len())?;
        check_len(
            "landmarks",
            stride,
            count * LANDMARK_VALUES,
            outputs.landmarks.len(),
        )?;

        let input_width = self.input_width as f32;
        let input_height = self.input_height as f32;
        let s = stride as f32;
        let centers = self
            .anchors
            .get_or_generate(height, width, stride, NUM_ANCHORS);

        let mut detections = Vec::new();
        for (idx, (&score, center)) in outputs.scores.iter().zip(centers).enumerate() {
            // NaN never passes the threshold
            if score.is_nan() || score < SCORE_THRESHOLD {
                continue;
            }

            let d = &outputs.boxes[idx * BOX_VALUES..(idx + 1) * BOX_VALUES];
            let x1 = (center.x - d[0] * s).max(0.0);
            let y1 = (center.y - d[1] * s).max(0.0);
            let x2 = (center.x + d[2] * s).min(input_width);
            let y2 = (center.y + d[3] * s).min(input_height);

            let l = &outputs.landmarks[idx * LANDMARK_VALUES..(idx + 1) * LANDMARK_VALUES];
            let landmarks: [Point; 5] = std::array::from_fn(|k| {
                Point::new(l[2 * k] * s + center.x, l[2 * k + 1] * s + center.y)
            });

            detections.push(DetectionBox {
                score,
                bounds: Rect::from_corners(x1, y1, x2, y2),
                landmarks,
                angle: EulerAngle::default(),
                quality: score,
            });
        }

        Ok(detections)
    }

    /// Decode strides 8, 16 and 32 and concatenate the results
    pub fn decode(
        &mut self,
        outputs: &[StrideOutputs<'_>; 3],
    ) -> Result<Vec<DetectionBox>, FaceDetectionError> {
        let mut detections = Vec::new();
        for (stride, stride_outputs) in STRIDES.iter().zip(outputs) {
            let decoded = self.decode_stride(*stride, stride_outputs)?;
            debug!("Stride {}: {} candidates", stride, decoded.len());
            detections.extend(decoded);
        }
        Ok(detections)
    }

    /// Decode the named outputs returned by the inference engine
    pub fn decode_outputs(
        &mut self,
        outputs: &HashMap<String, Vec<f32>>,
    ) -> Result<Vec<DetectionBox>, FaceDetectionError> {
        let missing: Vec<String> = OUTPUT_NAMES
            .iter()
            .filter(|name| !outputs.contains_key(**name))
            .map(|name| (*name).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(FaceDetectionError::MissingModelOutputs(missing));
        }

        let head = |name: &str| outputs.get(name).map(Vec::as_slice).unwrap_or_default();
        let strides: [StrideOutputs<'_>; 3] = std::array::from_fn(|i| StrideOutputs {
            scores: head(SCORE_OUTPUTS[i]),
            boxes: head(BOX_OUTPUTS[i]),
            landmarks: head(LANDMARK_OUTPUTS[i]),
        });

        self.decode(&strides)
    }
}

fn check_len(
    head: &'static str,
    stride: usize,
    expected: usize,
    actual: usize,
) -> Result<(), FaceDetectionError> {
    if expected == actual {
        Ok(())
    } else {
        Err(FaceDetectionError::MalformedModelOutput {
            head,
            stride,
            expected,
            actual,
        })
    }
}

/// Greedy non-maximum suppression
///
/// Candidates are visited by descending score, ties keeping their input
/// order. A candidate is kept only if its IoU with every kept detection is
/// strictly below `iou_threshold`. At most `limit` detections are returned.
#[must_use]
pub fn non_max_suppression(
    mut detections: Vec<DetectionBox>,
    iou_threshold: f32,
    limit: usize,
) -> Vec<DetectionBox> {
    if detections.is_empty() || limit == 0 {
        return Vec::new();
    }

    debug!(
        "NMS starting with {} detections (threshold: {})",
        detections.len(),
        iou_threshold
    );

    // sort_by is stable
    detections.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<DetectionBox> = Vec::with_capacity(limit.min(detections.len()));
    for candidate in detections {
        if keep.len() >= limit {
            break;
        }
        let overlaps = keep
            .iter()
            .any(|kept| kept.bounds.iou(&candidate.bounds) >= iou_threshold);
        if !overlaps {
            keep.push(candidate);
        }
    }

    debug!("NMS complete - kept {} detections", keep.len());
    keep
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(score: f32, x: f32, y: f32, size: f32) -> DetectionBox {
        DetectionBox {
            score,
            bounds: Rect::new(x, y, size, size),
            landmarks: [Point::default(); 5],
            angle: EulerAngle::default(),
            quality: score,
        }
    }

    fn zero_outputs(post: &Postprocessing, stride: usize) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
        let k = post.anchor_count(stride);
        (vec![0.0; k], vec![0.0; k * 4], vec![0.0; k * 10])
    }

    #[test]
    fn test_output_names_cover_all_heads() {
        for name in SCORE_OUTPUTS.iter().chain(&BOX_OUTPUTS).chain(&LANDMARK_OUTPUTS) {
            assert!(OUTPUT_NAMES.contains(name));
        }
    }

    #[test]
    fn test_single_anchor_zero_delta_decodes_to_center() {
        let mut post = Postprocessing::new(640, 640);
        let (mut scores, boxes, landmarks) = zero_outputs(&post, 16);

        // Grid is 40x40 with 2 anchors per cell: row 3, column 5, second anchor
        let idx = (3 * 40 + 5) * 2 + 1;
        scores[idx] = 0.9;

        let detections = post
            .decode_stride(
                16,
                &StrideOutputs {
                    scores: &scores,
                    boxes: &boxes,
                    landmarks: &landmarks,
                },
            )
            .unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.bounds, Rect::new(80.0, 48.0, 0.0, 0.0));
        assert_eq!(det.landmarks, [Point::new(80.0, 48.0); 5]);
        assert_eq!(det.quality, det.score);
        assert_eq!(det.angle, EulerAngle::default());
    }

    #[test]
    fn test_box_and_landmark_deltas_scale_with_stride() {
        let mut post = Postprocessing::new(640, 640);
        let (mut scores, mut boxes, mut landmarks) = zero_outputs(&post, 8);

        // Cell (row 10, col 10), first anchor: center (80, 80)
        let idx = (10 * 80 + 10) * 2;
        scores[idx] = 0.5;
        boxes[idx * 4..idx * 4 + 4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        landmarks[idx * 10..idx * 10 + 2].copy_from_slice(&[-1.0, 0.5]);

        let detections = post
            .decode_stride(
                8,
                &StrideOutputs {
                    scores: &scores,
                    boxes: &boxes,
                    landmarks: &landmarks,
                },
            )
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].bounds, Rect::new(72.0, 64.0, 32.0, 48.0));
        assert_eq!(detections[0].landmarks[0], Point::new(72.0, 84.0));
        assert_eq!(detections[0].landmarks[1], Point::new(80.0, 80.0));
    }

    #[test]
    fn test_boxes_clamped_to_input() {
        let mut post = Postprocessing::new(640, 640);
        let (mut scores, mut boxes, landmarks) = zero_outputs(&post, 32);

        // First anchor at (0, 0) with large deltas in every direction
        scores[0] = 0.99;
        boxes[..4].copy_from_slice(&[10.0, 10.0, 100.0, 100.0]);

        let detections = post
            .decode_stride(
                32,
                &StrideOutputs {
                    scores: &scores,
                    boxes: &boxes,
                    landmarks: &landmarks,
                },
            )
            .unwrap();

        assert_eq!(detections[0].bounds, Rect::new(0.0, 0.0, 640.0, 640.0));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let mut post = Postprocessing::new(640, 640);
        let (mut scores, boxes, landmarks) = zero_outputs(&post, 32);
        scores[0] = SCORE_THRESHOLD;
        scores[1] = 0.299_99;

        let detections = post
            .decode_stride(
                32,
                &StrideOutputs {
                    scores: &scores,
                    boxes: &boxes,
                    landmarks: &landmarks,
                },
            )
            .unwrap();
        assert_eq!(detections.len(), 1);
    }

    #[test]
    fn test_nan_scores_are_dropped() {
        let mut post = Postprocessing::new(640, 640);
        let (mut scores, boxes, landmarks) = zero_outputs(&post, 32);
        scores[0] = f32::NAN;
        scores[10] = 0.9;

        let detections = post
            .decode_stride(
                32,
                &StrideOutputs {
                    scores: &scores,
                    boxes: &boxes,
                    landmarks: &landmarks,
                },
            )
            .unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].score, 0.9);

        let kept = non_max_suppression(detections, DEFAULT_IOU_THRESHOLD, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_malformed_output_length() {
        let mut post = Postprocessing::new(640, 640);
        let (scores, boxes, _) = zero_outputs(&post, 16);

        let err = post
            .decode_stride(
                16,
                &StrideOutputs {
                    scores: &scores,
                    boxes: &boxes,
                    landmarks: &[0.0; 10],
                },
            )
            .unwrap_err();

        assert!(matches!(
            err,
            FaceDetectionError::MalformedModelOutput {
                head: "landmarks",
                stride: 16,
                expected: 32000,
                actual: 10,
            }
        ));
    }

    #[test]
    fn test_missing_outputs_are_reported() {
        let mut post = Postprocessing::new(640, 640);
        let mut outputs = HashMap::new();
        outputs.insert("443".to_string(), vec![0.0; 12800]);

        match post.decode_outputs(&outputs) {
            Err(FaceDetectionError::MissingModelOutputs(missing)) => {
                assert_eq!(missing.len(), 8);
                assert!(!missing.contains(&"443".to_string()));
                assert_eq!(missing[0], "468");
            }
            other => panic!("expected MissingModelOutputs, got {other:?}"),
        }
    }

    #[test]
    fn test_nms_suppresses_overlapping_lower_score() {
        let detections = vec![
            detection(0.8, 0.0, 0.0, 100.0),
            detection(0.9, 10.0, 10.0, 100.0),
        ];
        let kept = non_max_suppression(detections, DEFAULT_IOU_THRESHOLD, 10);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].score, 0.9);
    }

    #[test]
    fn test_nms_keeps_disjoint_boxes() {
        let detections = vec![
            detection(0.5, 0.0, 0.0, 50.0),
            detection(0.9, 200.0, 200.0, 50.0),
            detection(0.7, 400.0, 0.0, 50.0),
        ];
        let kept = non_max_suppression(detections, DEFAULT_IOU_THRESHOLD, 10);
        let scores: Vec<f32> = kept.iter().map(|d| d.score).collect();
        assert_eq!(scores, vec![0.9, 0.7, 0.5]);
    }

    #[test]
    fn test_nms_threshold_is_strict() {
        // Two 10x10 boxes offset so IoU is exactly 1/3
        let a = detection(0.9, 0.0, 0.0, 10.0);
        let b = detection(0.8, 5.0, 0.0, 10.0);
        let iou = a.bounds.iou(&b.bounds);

        let kept = non_max_suppression(vec![a.clone(), b.clone()], iou, 10);
        assert_eq!(kept.len(), 1);

        let kept = non_max_suppression(vec![a, b], iou + 0.01, 10);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_respects_limit() {
        let detections: Vec<_> = (0..20)
            .map(|i| detection(0.5 + i as f32 * 0.01, i as f32 * 100.0, 0.0, 50.0))
            .collect();
        assert_eq!(non_max_suppression(detections.clone(), 0.4, 3).len(), 3);
        assert!(non_max_suppression(detections, 0.4, 0).is_empty());
    }

    #[test]
    fn test_nms_ties_keep_decode_order() {
        let first = detection(0.9, 0.0, 0.0, 100.0);
        let mut second = detection(0.9, 1.0, 1.0, 100.0);
        second.quality = 0.1;

        let kept = non_max_suppression(vec![first.clone(), second], 0.4, 10);
        assert_eq!(kept, vec![first]);
    }

    #[test]
    fn test_nms_empty() {
        assert!(non_max_suppression(Vec::new(), 0.4, 5).is_empty());
    }

    #[test]
    fn test_applying_transform_is_pure() {
        let mut det = detection(0.9, 10.0, 20.0, 30.0);
        det.landmarks[2] = Point::new(25.0, 35.0);

        let scaled = det.applying_transform(&AffineTransform::scale(2.0, 2.0));
        assert_eq!(scaled.bounds, Rect::new(20.0, 40.0, 60.0, 60.0));
        assert_eq!(scaled.landmarks[2], Point::new(50.0, 70.0));
        assert_eq!(det.bounds, Rect::new(10.0, 20.0, 30.0, 30.0));
        assert_eq!(scaled.score, det.score);
    }

    #[test]
    fn test_into_face_estimates_pose() {
        let mut det = detection(0.75, 30.0, 30.0, 60.0);
        det.landmarks = [
            Point::new(40.0, 40.0),
            Point::new(80.0, 40.0),
            Point::new(60.0, 60.0),
            Point::new(45.0, 80.0),
            Point::new(75.0, 80.0),
        ];
        let face = det.clone().into_face();
        assert_eq!(face.quality, 0.75);
        assert_eq!(face.landmarks, det.landmarks);
        assert!(face.angle.yaw.abs() < 1e-5);
        assert!(face.angle.roll.abs() < 1e-5);
    }
}
