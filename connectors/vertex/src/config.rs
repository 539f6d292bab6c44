//! Configuration for the Vertex AI connector

use serde::{Deserialize, Serialize};

/// Default Google OAuth token endpoint
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Default OAuth scope for Vertex AI
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Vertex AI connector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VertexConfig {
    /// API version path segment
    pub api_version: String,
    /// Origin overriding `https://{endpoint host}` (local servers, proxies)
    pub api_base: Option<String>,
    /// Token endpoint overriding the one in the service account key
    pub token_uri: Option<String>,
    /// OAuth scopes requested for the access token
    pub scopes: Vec<String>,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl VertexConfig {
    /// Create a config with default settings
    pub fn new() -> Self {
        Self {
            api_version: "v1".to_string(),
            api_base: None,
            token_uri: None,
            scopes: vec![DEFAULT_SCOPE.to_string()],
            timeout_ms: 60_000,
        }
    }

    /// Set the API version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Send requests to this origin instead of the Google endpoint host
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    /// Set the OAuth token endpoint
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = Some(token_uri.into());
        self
    }

    /// Set the OAuth scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub(crate) fn scope_string(&self) -> String {
        if self.scopes.is_empty() {
            DEFAULT_SCOPE.to_string()
        } else {
            self.scopes.join(" ")
        }
    }
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self::new()
    }
}
