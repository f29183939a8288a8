//! Client for the OpenAI Images API.
//!
//! Translates a [GenerationRequest] into a call to the images endpoint and
//! hands the parsed response back untouched. Decoding and persistence live
//! with the web layer; this module owns the wire format and error
//! translation only.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ImgenError;

/// Image dimensions accepted by the API.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum)]
pub enum ImageSize {
    /// 1024x1024
    #[default]
    #[serde(rename = "1024x1024")]
    #[value(name = "1024x1024")]
    Square,
    /// 1792x1024
    #[serde(rename = "1792x1024")]
    #[value(name = "1792x1024")]
    Landscape,
    /// 1024x1792
    #[serde(rename = "1024x1792")]
    #[value(name = "1024x1792")]
    Portrait,
}

/// Rendering quality accepted by the API.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    /// Standard quality
    #[default]
    Standard,
    /// HD quality, slower and pricier
    Hd,
}

/// File format the decoded image is written as.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// PNG
    #[default]
    Png,
    /// JPEG
    Jpeg,
    /// WebP
    Webp,
}

impl OutputFormat {
    /// File extension used for saved images.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
        }
    }
}

/// Requested background treatment.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Ask for a transparent background
    Transparent,
    /// Leave the background to the model
    #[default]
    Auto,
}

/// Parameters for one generation call, assembled from the POST body (or CLI
/// arguments) plus server configuration.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    /// Text prompt. May be empty; the API is the final arbiter.
    pub prompt: String,
    /// Image dimensions.
    pub size: ImageSize,
    /// Rendering quality.
    pub quality: ImageQuality,
    /// Model identifier, eg `dall-e-3`.
    pub model: String,
    /// Number of images requested.
    pub count: u8,
    /// File format for saved output.
    pub output_format: OutputFormat,
    /// Background treatment.
    pub background: Background,
}

/// Request body for POST /v1/images/generations
/// Docs: https://platform.openai.com/docs/api-reference/images
#[derive(Serialize, Debug)]
struct ImagesGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: ImageSize,
    quality: ImageQuality,
    response_format: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>,
}

impl<'a> ImagesGenerateRequest<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            model: &request.model,
            prompt: &request.prompt,
            n: request.count,
            size: request.size,
            quality: request.quality,
            response_format: "b64_json",
            style: style_for(request),
        }
    }
}

// dall-e-3 has no transparent-background switch; `style=natural` is what gets
// sent when one is requested for a format that could carry alpha. Unverified
// upstream, kept as a pass-through.
fn style_for(request: &GenerationRequest) -> Option<&'static str> {
    match (request.background, request.output_format) {
        (Background::Transparent, OutputFormat::Png | OutputFormat::Webp) => Some("natural"),
        _ => None,
    }
}

/// One generated image in an API response.
#[derive(Deserialize, Debug)]
pub struct ImageData {
    /// Base64-encoded image bytes. Present when `response_format` was
    /// `b64_json`.
    pub b64_json: Option<String>,
    /// Hosted URL, returned instead of `b64_json` by some models.
    pub url: Option<String>,
    /// The prompt after the model rewrote it, when it did.
    pub revised_prompt: Option<String>,
}

/// Response body from POST /v1/images/generations.
#[derive(Deserialize, Debug)]
pub struct ImagesGenerateResponse {
    /// One entry per generated image, in generation order.
    pub data: Vec<ImageData>,
}

/// Client for the images endpoint.
///
/// Holds the shared HTTP connection pool plus the credential and endpoint
/// handed over at startup; nothing is read from the environment here.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
}

impl OpenAiClient {
    /// Builds a client. `api_key` may be absent, in which case every call to
    /// [Self::generate] fails with a configuration error.
    pub fn new(api_key: Option<String>, api_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url,
        }
    }

    /// Issues a single generation call and returns the parsed response with
    /// no further normalization.
    ///
    /// Fails with [ImgenError::Configuration] before any network traffic when
    /// no API key is configured. Upstream failures, transport failures, and
    /// unparseable bodies all surface as [ImgenError::Api]; nothing is
    /// retried.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ImagesGenerateResponse, ImgenError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ImgenError::Configuration(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ));
        };

        let body = ImagesGenerateRequest::from_request(request);
        info!("Requesting {} image(s) from {}", body.n, request.model);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(ImgenError::Api {
                status: Some(status.as_u16()),
                message: format!(
                    "Images API returned {status}: {}",
                    String::from_utf8_lossy(&bytes)
                ),
            });
        }

        debug!("Images API response: {} bytes", bytes.len());
        serde_json::from_slice(&bytes).map_err(|err| ImgenError::Api {
            status: None,
            message: format!("Failed to parse images API response: {err}"),
        })
    }
}
