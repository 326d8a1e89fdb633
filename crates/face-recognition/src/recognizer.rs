//! The face recognition capability

use crate::alignment::align_face;
use crate::similarity;
use crate::template::FaceTemplate;
use crate::FaceRecognitionError;
use async_trait::async_trait;
use face_analysis_common::{Face, Image};
use image::RgbImage;

/// Creates and compares face recognition templates
///
/// Backends implement [`create_templates_from_aligned_faces`]; alignment and
/// comparison are shared.
///
/// [`create_templates_from_aligned_faces`]: FaceRecognition::create_templates_from_aligned_faces
#[async_trait]
pub trait FaceRecognition: Send + Sync {
    /// One template per aligned 112x112 face crop, in input order
    async fn create_templates_from_aligned_faces(
        &self,
        aligned_faces: &[RgbImage],
    ) -> Result<Vec<FaceTemplate>, FaceRecognitionError>;

    /// Align each face in `image`, then extract its template
    async fn create_templates(
        &self,
        faces: &[Face],
        image: &Image<'_>,
    ) -> Result<Vec<FaceTemplate>, FaceRecognitionError> {
        let aligned = faces
            .iter()
            .map(|face| align_face(face, image))
            .collect::<Result<Vec<_>, _>>()?;
        self.create_templates_from_aligned_faces(&aligned).await
    }

    /// Similarity score in `[0, 1]` of `template` against each of `templates`
    async fn compare_templates(
        &self,
        templates: &[FaceTemplate],
        template: &FaceTemplate,
    ) -> Result<Vec<f32>, FaceRecognitionError> {
        similarity::compare_templates(templates, template)
    }
}
