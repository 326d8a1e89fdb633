//! Head pose estimation from 5-point facial landmarks

use face_analysis_common::{EulerAngle, Point};

const YAW_GAIN: f32 = 1.2;

/// Estimate yaw, pitch and roll (degrees) from the five landmarks
///
/// Degenerate geometry is not guarded: when the eye and mouth centers share a
/// y coordinate the pitch is non-finite and callers should treat it as
/// undetermined.
#[must_use]
pub fn face_angle(
    left_eye: Point,
    right_eye: Point,
    nose_tip: Point,
    left_mouth: Point,
    right_mouth: Point,
) -> EulerAngle {
    let roll = (right_eye.y - left_eye.y)
        .atan2(right_eye.x - left_eye.x)
        .to_degrees();

    let eye_center = left_eye.midpoint(&right_eye);
    let mouth_center = left_mouth.midpoint(&right_mouth);

    let interocular = right_eye.x - left_eye.x;
    let nose_offset = nose_tip.x - eye_center.x;
    let yaw = nose_offset.atan2(interocular).to_degrees() * YAW_GAIN;

    let vertical_face_length = mouth_center.y - eye_center.y;
    let vertical_nose_offset = nose_tip.y - eye_center.y;
    let pitch_ratio = vertical_nose_offset / vertical_face_length;
    let pitch = (0.5 - pitch_ratio) * 90.0;

    EulerAngle::new(yaw, -pitch, roll)
}

/// [`face_angle`] over landmarks in detector order
#[must_use]
pub fn face_angle_from_landmarks(landmarks: &[Point; 5]) -> EulerAngle {
    face_angle(
        landmarks[0],
        landmarks[1],
        landmarks[2],
        landmarks[3],
        landmarks[4],
    )
}
