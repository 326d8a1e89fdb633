//! Face alignment to the ArcFace canonical pose
//!
//! A similarity transform (rotation, uniform scale, translation) maps the
//! detected eyes onto the ArcFace reference eye positions; the image is then
//! warped with bilinear interpolation into a 112x112 crop.

use crate::FaceRecognitionError;
use face_analysis_common::{Face, Image, Point};
use face_analysis_detection::preprocess::convert_to_argb;
use face_analysis_detection::AffineTransform;
use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use tracing::debug;

/// Side length of an aligned face crop
pub const ALIGNED_FACE_SIZE: u32 = 112;

/// ArcFace reference landmarks in a 112x112 crop
///
/// Only the eye pair drives [`alignment_transform`]; the remaining points
/// complete the standard five-point layout.
pub const ARCFACE_REFERENCE: [Point; 5] = [
    Point::new(38.2946, 51.6963), // left eye
    Point::new(73.5318, 51.5014), // right eye
    Point::new(56.0252, 71.7366), // nose tip
    Point::new(41.5493, 92.3655), // left mouth corner
    Point::new(70.7299, 92.2041), // right mouth corner
];

const MIN_EYE_DISTANCE: f32 = 1e-6;

/// Similarity transform taking the face's eyes onto the reference eyes
///
/// `None` when the eyes coincide.
#[must_use]
pub fn alignment_transform(face: &Face) -> Option<AffineTransform> {
    let (src_left, src_right) = (face.left_eye(), face.right_eye());
    let (dst_left, dst_right) = (ARCFACE_REFERENCE[0], ARCFACE_REFERENCE[1]);

    let (src_dx, src_dy) = (src_right.x - src_left.x, src_right.y - src_left.y);
    let (dst_dx, dst_dy) = (dst_right.x - dst_left.x, dst_right.y - dst_left.y);

    let src_distance = src_dx.hypot(src_dy);
    if !(src_distance > MIN_EYE_DISTANCE) {
        return None;
    }
    let scale = dst_dx.hypot(dst_dy) / src_distance;
    let angle = dst_dy.atan2(dst_dx) - src_dy.atan2(src_dx);
    let (cos_a, sin_a) = (angle.cos() * scale, angle.sin() * scale);

    let src_center = src_left.midpoint(&src_right);
    let dst_center = dst_left.midpoint(&dst_right);

    Some(AffineTransform {
        a: cos_a,
        b: sin_a,
        c: -sin_a,
        d: cos_a,
        tx: dst_center.x - (src_center.x * cos_a - src_center.y * sin_a),
        ty: dst_center.y - (src_center.x * sin_a + src_center.y * cos_a),
    })
}

/// Warp the face into a 112x112 RGB crop in the ArcFace reference pose
pub fn align_face(face: &Face, image: &Image<'_>) -> Result<RgbImage, FaceRecognitionError> {
    let transform = alignment_transform(face).ok_or_else(|| {
        FaceRecognitionError::AlignmentFailure("eye landmarks coincide".to_string())
    })?;

    let projection = Projection::from_matrix([
        transform.a,
        transform.c,
        transform.tx,
        transform.b,
        transform.d,
        transform.ty,
        0.0,
        0.0,
        1.0,
    ])
    .ok_or_else(|| {
        FaceRecognitionError::AlignmentFailure("alignment transform is not invertible".to_string())
    })?;

    let source = convert_to_argb(image)
        .map_err(|e| FaceRecognitionError::AlignmentFailure(e.to_string()))?
        .to_rgb_image();

    let mut aligned = RgbImage::new(ALIGNED_FACE_SIZE, ALIGNED_FACE_SIZE);
    warp_into(
        &source,
        &projection,
        Interpolation::Bilinear,
        Rgb([0, 0, 0]),
        &mut aligned,
    );

    debug!(
        "Aligned face at ({:.0}, {:.0}) {}x{} into {}x{}",
        face.bounds.x,
        face.bounds.y,
        face.bounds.width,
        face.bounds.height,
        ALIGNED_FACE_SIZE,
        ALIGNED_FACE_SIZE
    );
    Ok(aligned)
}
