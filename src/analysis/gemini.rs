use super::prompt;
use super::types::EnvironmentalAnalysis;
use super::Analyzer;
use crate::capture::EncodedImage;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// No timeout unless set; a hung request keeps the session in flight
    pub timeout: Option<Duration>,
}

/// Analysis collaborator backed by the Gemini `generateContent` endpoint
pub struct GeminiAnalyzer {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiAnalyzer {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            bail!("Gemini API key is empty");
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        tracing::info!("Analysis model: {} via {}", config.model, config.base_url);

        Ok(Self { client, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait(?Send)]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(&self, image: &EncodedImage, reference_time: &str, is_live: bool) -> Result<EnvironmentalAnalysis> {
        let body = request_body(image, reference_time, is_live);

        tracing::debug!(
            "Posting {} byte {} frame to {}",
            image.bytes().len(),
            image.mime_type(),
            self.endpoint()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to reach analysis endpoint")?;

        let status = response.status();
        let text = response
            .text()
            .await
            .context("Failed to read analysis response")?;

        if !status.is_success() {
            bail!("Analysis endpoint returned {}: {}", status, api_error_message(&text));
        }

        parse_response(&text)
    }
}

pub(crate) fn request_body(image: &EncodedImage, reference_time: &str, is_live: bool) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": prompt::system_instruction(reference_time, is_live) }]
        },
        "contents": [{
            "role": "user",
            "parts": [
                {
                    "inlineData": {
                        "mimeType": image.mime_type(),
                        "data": image.to_base64(),
                    }
                },
                { "text": prompt::directive(reference_time, is_live) }
            ]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": prompt::response_schema(),
        }
    })
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Extract the JSON record from the first candidate's text parts
pub(crate) fn parse_response(body: &str) -> Result<EnvironmentalAnalysis> {
    let response: GenerateContentResponse =
        serde_json::from_str(body).context("Analysis response is not valid JSON")?;

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        bail!("Empty response from AI model.");
    }

    serde_json::from_str(&text).context("Analysis record did not match the expected schema")
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|parsed| parsed.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}
