//! Remote ArcFace template extraction over HTTP
//!
//! Aligned crops are JPEG-encoded at full quality, base64-encoded and posted
//! as `{"images": [...]}`. The service answers with a JSON array holding one
//! template per image.

use crate::recognizer::FaceRecognition;
use crate::template::FaceTemplate;
use crate::FaceRecognitionError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const JPEG_QUALITY: u8 = 100;
const API_KEY_HEADER: &str = "x-api-key";

fn default_timeout_secs() -> u64 {
    30
}

/// Connection settings for the recognition service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudRecognitionConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl CloudRecognitionConfig {
    #[must_use]
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Load configuration from a YAML file
    pub fn from_yaml(yaml_path: impl AsRef<Path>) -> Result<Self, FaceRecognitionError> {
        let path = yaml_path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FaceRecognitionError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        serde_yaml::from_str(&contents)
            .map_err(|e| FaceRecognitionError::ConfigError(format!("Failed to parse YAML: {e}")))
    }
}

#[derive(Debug, Serialize)]
struct RequestBody {
    images: Vec<String>,
}

/// Encode one aligned crop as base64 JPEG
pub fn encode_face_image(image: &RgbImage) -> Result<String, FaceRecognitionError> {
    let mut jpeg = Vec::new();
    image
        .write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))
        .map_err(|e| FaceRecognitionError::ImageEncodingFailure(e.to_string()))?;
    Ok(general_purpose::STANDARD.encode(&jpeg))
}

fn request_body(aligned_faces: &[RgbImage]) -> Result<RequestBody, FaceRecognitionError> {
    let images = aligned_faces
        .iter()
        .map(encode_face_image)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(RequestBody { images })
}

/// [`FaceRecognition`] backed by the remote ArcFace service
#[derive(Debug, Clone)]
pub struct CloudFaceRecognition {
    client: HttpClient,
    url: String,
    api_key: String,
}

impl CloudFaceRecognition {
    pub fn new(config: CloudRecognitionConfig) -> Result<Self, FaceRecognitionError> {
        if !config.url.starts_with("http://") && !config.url.starts_with("https://") {
            return Err(FaceRecognitionError::ConfigError(format!(
                "Invalid URL scheme in {}. Only http:// and https:// are supported",
                config.url
            )));
        }
        let client = HttpClient::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Use an existing HTTP client
    #[must_use]
    pub fn with_client(client: HttpClient, config: CloudRecognitionConfig) -> Self {
        Self {
            client,
            url: config.url,
            api_key: config.api_key,
        }
    }
}

#[async_trait]
impl FaceRecognition for CloudFaceRecognition {
    async fn create_templates_from_aligned_faces(
        &self,
        aligned_faces: &[RgbImage],
    ) -> Result<Vec<FaceTemplate>, FaceRecognitionError> {
        if aligned_faces.is_empty() {
            return Ok(Vec::new());
        }

        let body = request_body(aligned_faces)?;
        debug!("Requesting {} templates from {}", aligned_faces.len(), self.url);

        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Template extraction failed with status {}", status);
            return Err(FaceRecognitionError::TemplateExtractionFailed(format!(
                "service returned {status}"
            )));
        }

        let bytes = response.bytes().await?;
        let templates: Vec<FaceTemplate> = serde_json::from_slice(&bytes).map_err(|e| {
            FaceRecognitionError::TemplateExtractionFailed(format!("invalid response body: {e}"))
        })?;

        if templates.len() != aligned_faces.len() {
            return Err(FaceRecognitionError::TemplateExtractionFailed(format!(
                "expected {} templates, received {}",
                aligned_faces.len(),
                templates.len()
            )));
        }

        info!("Received {} templates", templates.len());
        Ok(templates.into_iter().map(FaceTemplate::normalized).collect())
    }
}
