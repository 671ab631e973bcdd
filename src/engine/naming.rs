// src/engine/naming.rs
//
// Remote name suggestion: posts an image to a generative-model endpoint and
// sanitizes the response into a file-safe slug. The sanitizer is pure and
// testable without a network; the client wraps every failure mode into a
// batch-scoped error that never touches the pixel pipeline.

use crate::error::{ConvertError, Result};
use crate::settings::OutputFormat;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const PROMPT: &str = "Describe this image with a short, descriptive, file-safe \
name in English. Use 3-5 words separated by hyphens. For example: \
'a-cute-cat-sleeping'. Do not include file extensions, quotes, or any other \
explanatory text. Only provide the name string.";

/// Reduce model output to a hyphen-separated lowercase ASCII slug.
/// Returns None when nothing survives sanitization.
pub fn sanitize_slug(text: &str) -> Option<String> {
    let lowered = text.trim().to_lowercase();
    let cleaned: String = lowered
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == ' ' || *c == '-')
        .collect();

    let slug = cleaned
        .split(|c| c == ' ' || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    if slug.is_empty() {
        None
    } else {
        Some(slug)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Contents,
}

#[derive(Serialize)]
struct Contents {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Part {
    InlineData { mime_type: String, data: String },
    Text { text: String },
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    parts: Option<Vec<ResponsePart>>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Blocking client for the remote name-suggestion endpoint.
pub struct NameSuggester {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl NameSuggester {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConvertError::remote_name_failed(format!("client init failed: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Ask the model for a descriptive slug for one image.
    ///
    /// Fails on transport errors, non-success status, or a response that
    /// sanitizes to nothing.
    pub fn suggest(&self, image: &[u8], format: OutputFormat) -> Result<String> {
        let request = GenerateRequest {
            contents: Contents {
                parts: vec![
                    Part::InlineData {
                        mime_type: format.mime_type().to_string(),
                        data: BASE64.encode(image),
                    },
                    Part::Text {
                        text: PROMPT.to_string(),
                    },
                ],
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|e| ConvertError::remote_name_failed(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ConvertError::remote_name_failed(format!(
                "endpoint returned status {status}"
            )));
        }

        let raw = response
            .text()
            .map_err(|e| ConvertError::remote_name_failed(format!("failed to read body: {e}")))?;
        let body: GenerateResponse = serde_json::from_str(&raw)
            .map_err(|e| ConvertError::remote_name_failed(format!("malformed response: {e}")))?;

        let text = body
            .candidates
            .and_then(|mut c| c.drain(..).next())
            .and_then(|c| c.content)
            .and_then(|c| c.parts)
            .and_then(|mut p| p.drain(..).next())
            .and_then(|p| p.text)
            .ok_or_else(|| ConvertError::remote_name_failed("response carried no text"))?;

        sanitize_slug(&text)
            .ok_or_else(|| ConvertError::remote_name_failed("response sanitized to empty slug"))
    }
}
