//! Vertex AI wire models

use serde::{Deserialize, Serialize};
use vertexflow_core::request::{Content, GenerateRequest, GenerationConfig};

/// generateContent request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest<'a> {
    pub contents: &'a [Content],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<&'a Content>,
    pub generation_config: &'a GenerationConfig,
}

impl<'a> From<&'a GenerateRequest> for ContentRequest<'a> {
    fn from(request: &'a GenerateRequest) -> Self {
        Self {
            contents: &request.contents,
            system_instruction: request.system_instruction.as_ref(),
            generation_config: &request.generation_config,
        }
    }
}

/// Google API error response
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ErrorDetails,
}

/// Error details
#[derive(Debug, Deserialize)]
pub struct ErrorDetails {
    #[serde(default)]
    pub code: Option<u16>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// JWT claims for the service account bearer grant
#[derive(Debug, Serialize)]
pub struct Claims<'a> {
    pub iss: &'a str,
    pub scope: &'a str,
    pub aud: &'a str,
    pub iat: i64,
    pub exp: i64,
}

/// OAuth token endpoint response
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// OAuth token endpoint error
#[derive(Debug, Deserialize)]
pub struct TokenErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}
