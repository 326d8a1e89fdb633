//! Face recognition templates

use crate::similarity;
use serde::{Deserialize, Serialize};

/// Version tag of ArcFace templates produced by the recognition service
pub const ARCFACE_TEMPLATE_VERSION: u32 = 24;

fn default_version() -> u32 {
    ARCFACE_TEMPLATE_VERSION
}

/// An identity embedding tagged with the model version that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceTemplate {
    #[serde(default = "default_version")]
    pub version: u32,
    pub data: Vec<f32>,
}

impl FaceTemplate {
    /// ArcFace template with the current version tag
    #[must_use]
    pub fn new(data: Vec<f32>) -> Self {
        Self {
            version: ARCFACE_TEMPLATE_VERSION,
            data,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    /// Euclidean norm of the embedding
    #[must_use]
    pub fn norm(&self) -> f32 {
        similarity::norm(&self.data)
    }

    /// Scale the embedding to unit length (no-op for a zero vector)
    pub fn normalize(&mut self) {
        similarity::normalize(&mut self.data);
    }

    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.normalize();
        self
    }
}
