use serde::{Deserialize, Serialize};

/// Parameters sent with every Imagen predict request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImageOptions {
    pub sample_count: u32,
    pub aspect_ratio: String,
    /// `allow_all`, `allow_adult` or `deny_all`
    pub person_generation: String,
    /// `block_few`, `block_some` or `block_most`
    pub safety_setting: String,
    pub include_rai_reason: bool,
    pub add_watermark: bool,
    pub enhance_prompt: bool,
    pub language: String,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            sample_count: 1,
            aspect_ratio: "1:1".to_string(),
            person_generation: "allow_all".to_string(),
            safety_setting: "block_few".to_string(),
            include_rai_reason: true,
            add_watermark: false,
            enhance_prompt: false,
            language: "auto".to_string(),
        }
    }
}

/// Parameters sent with every Veo long-running request
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VideoOptions {
    pub aspect_ratio: String,
    pub sample_count: u32,
    pub person_generation: String,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            aspect_ratio: "16:9".to_string(),
            sample_count: 1,
            person_generation: "allow_all".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct PromptInstance<'a> {
    pub prompt: &'a str,
}

/// `{instances: [{prompt}], parameters: {...}}` body shared by both endpoints
#[derive(Debug, Serialize)]
pub(crate) struct PredictRequest<'a, P: Serialize> {
    pub instances: [PromptInstance<'a>; 1],
    pub parameters: &'a P,
}

impl<'a, P: Serialize> PredictRequest<'a, P> {
    pub(crate) const fn new(prompt: &'a str, parameters: &'a P) -> Self {
        Self {
            instances: [PromptInstance { prompt }],
            parameters,
        }
    }
}

/// Response of the Imagen predict endpoint
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ImagePredictions {
    #[serde(default)]
    pub predictions: Vec<ImagePrediction>,
}

/// One generated image; the payload is absent when the sample was filtered
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImagePrediction {
    pub bytes_base64_encoded: Option<String>,
    pub rai_filtered_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LongRunningResponse {
    pub name: Option<String>,
}

/// Identifier of a submitted long-running operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub operation_id: String,
}

impl OperationHandle {
    /// Extracts the id from an operation name such as `operations/abc123`.
    ///
    /// Returns `None` when the name has no usable last segment.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let id = name.rsplit('/').next()?.trim();
        if id.is_empty() {
            return None;
        }
        Some(Self {
            operation_id: id.to_string(),
        })
    }
}

/// State of a long-running operation as reported by the status endpoint
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct OperationStatus {
    #[serde(default)]
    pub done: bool,
    pub error: Option<OperationError>,
    pub response: Option<OperationResponse>,
}

/// Error payload of a finished operation
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct OperationError {
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OperationResponse {
    pub generate_video_response: Option<GenerateVideoResponse>,
}

/// Result container of a finished Veo operation
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub rai_media_filtered_count: u32,
    pub rai_media_filtered_reasons: Option<Vec<String>>,
    pub generated_samples: Option<Vec<GeneratedSample>>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct GeneratedSample {
    pub video: Option<VideoRef>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct VideoRef {
    pub uri: Option<String>,
}

/// Read-only view of one generated video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSample {
    pub uri: Option<String>,
}

impl OperationStatus {
    /// The video result container, if the operation produced one
    #[must_use]
    pub fn video_response(&self) -> Option<&GenerateVideoResponse> {
        self.response
            .as_ref()
            .and_then(|r| r.generate_video_response.as_ref())
    }
}

impl GenerateVideoResponse {
    /// Generated samples in the order the service returned them
    #[must_use]
    pub fn samples(&self) -> Vec<VideoSample> {
        self.generated_samples
            .iter()
            .flatten()
            .map(|sample| VideoSample {
                uri: sample
                    .video
                    .as_ref()
                    .and_then(|v| v.uri.clone())
                    .filter(|uri| !uri.is_empty()),
            })
            .collect()
    }
}
