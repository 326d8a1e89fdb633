//! Re-detection of externally supplied faces

use crate::FaceRecognitionError;
use face_analysis_common::{Face, Image};
use face_analysis_detection::FaceDetection;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Replace each supplied face with its freshly detected counterpart
///
/// Runs `detector` with a limit of `faces.len()` and requires exactly that many
/// detections. Each input face is paired with the detection whose eye center
/// is nearest to its own. The assignment is greedy per input face, not an
/// optimal bipartite match; if two inputs pick the same detection the call
/// fails with [`FaceRecognitionError::FaceDetectionFailure`].
pub async fn refine_faces<D>(
    detector: &mut D,
    faces: &[Face],
    image: &Image<'_>,
) -> Result<Vec<Face>, FaceRecognitionError>
where
    D: FaceDetection + ?Sized,
{
    if faces.is_empty() {
        return Ok(Vec::new());
    }

    let detected = detector.detect_faces_in_image(image, faces.len()).await?;
    if detected.len() != faces.len() {
        warn!(
            "Refinement expected {} faces, detected {}",
            faces.len(),
            detected.len()
        );
        return Err(FaceRecognitionError::FaceDetectionFailure {
            expected: faces.len(),
            found: detected.len(),
        });
    }

    let matches: Vec<usize> = faces
        .iter()
        .filter_map(|face| {
            let eye_center = face.eye_center();
            detected
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    a.eye_center()
                        .distance(&eye_center)
                        .total_cmp(&b.eye_center().distance(&eye_center))
                })
                .map(|(index, _)| index)
        })
        .collect();

    let distinct: HashSet<usize> = matches.iter().copied().collect();
    if distinct.len() != faces.len() {
        warn!(
            "Refinement matched {} of {} faces",
            distinct.len(),
            faces.len()
        );
        return Err(FaceRecognitionError::FaceDetectionFailure {
            expected: faces.len(),
            found: distinct.len(),
        });
    }

    debug!("Refined {} faces", faces.len());
    Ok(matches.into_iter().map(|i| detected[i].clone()).collect())
}
