//! Final face detection result

use crate::geometry::{EulerAngle, Point, Rect};
use serde::{Deserialize, Serialize};

/// Landmark order: left eye, right eye, nose tip, left mouth corner, right mouth corner
pub const LANDMARK_COUNT: usize = 5;

/// Detected face in source-image coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    /// Face bounding box
    pub bounds: Rect,
    /// Head pose estimated from the landmarks
    pub angle: EulerAngle,
    /// Detection quality (the detector's confidence score)
    pub quality: f32,
    /// 5-point facial landmarks
    pub landmarks: [Point; LANDMARK_COUNT],
}

impl Face {
    #[must_use]
    pub fn left_eye(&self) -> Point {
        self.landmarks[0]
    }

    #[must_use]
    pub fn right_eye(&self) -> Point {
        self.landmarks[1]
    }

    #[must_use]
    pub fn nose_tip(&self) -> Point {
        self.landmarks[2]
    }

    #[must_use]
    pub fn mouth_left_corner(&self) -> Point {
        self.landmarks[3]
    }

    #[must_use]
    pub fn mouth_right_corner(&self) -> Point {
        self.landmarks[4]
    }

    /// Midpoint between the two eye landmarks
    #[must_use]
    pub fn eye_center(&self) -> Point {
        self.left_eye().midpoint(&self.right_eye())
    }
}
