//! Access tokens for Vertex AI
//!
//! Service accounts authenticate with the OAuth 2.0 JWT bearer grant: a claim
//! set signed with the account's RSA key is exchanged at the token endpoint for
//! a short-lived access token. Tokens are kept per service account until
//! shortly before they expire.

use crate::config::{VertexConfig, DEFAULT_TOKEN_URI};
use crate::models::{Claims, TokenErrorResponse, TokenResponse};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;
use vertexflow_core::errors::ClientError;
use vertexflow_core::types::ServiceAccountKey;

/// Lifetime requested for signed assertions, in seconds
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh tokens this many seconds before they expire
const EXPIRY_SAFETY_WINDOW_SECS: i64 = 300;

/// Source of bearer tokens for API calls
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self, key: &ServiceAccountKey) -> Result<String, ClientError>;
}

/// Always returns the same token
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self, _key: &ServiceAccountKey) -> Result<String, ClientError> {
        Ok(self.token.clone())
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: i64,
}

/// JWT bearer grant token provider
pub struct ServiceAccountTokenProvider {
    client: Client,
    token_uri: Option<String>,
    scope: String,
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(client: Client, config: &VertexConfig) -> Self {
        Self {
            client,
            token_uri: config.token_uri.clone(),
            scope: config.scope_string(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn token_uri<'a>(&'a self, key: &'a ServiceAccountKey) -> &'a str {
        self.token_uri
            .as_deref()
            .or(key.token_uri.as_deref())
            .unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Sign the JWT assertion for a key
    fn sign_assertion(
        &self,
        key: &ServiceAccountKey,
        token_uri: &str,
        now: i64,
    ) -> Result<String, ClientError> {
        let claims = Claims {
            iss: &key.client_email,
            scope: &self.scope,
            aud: token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = key.private_key_id.clone();

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| ClientError::Auth(format!("Invalid service account private key: {}", e)))?;

        encode(&header, &claims, &encoding_key)
            .map_err(|e| ClientError::Auth(format!("Failed to sign JWT assertion: {}", e)))
    }

    async fn fetch_token(&self, key: &ServiceAccountKey) -> Result<CachedToken, ClientError> {
        let token_uri = self.token_uri(key);
        let now = Utc::now().timestamp();
        let assertion = self.sign_assertion(key, token_uri, now)?;

        debug!("Requesting access token for {} from {}", key.client_email, token_uri);

        let form = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .client
            .post(token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{}: {}", err.error, description),
                    None => err.error,
                },
                Err(_) => body,
            };
            return Err(ClientError::Auth(format!(
                "Token endpoint returned {}: {}",
                status, detail
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Auth(format!("Failed to parse token response: {}", e)))?;

        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self, key: &ServiceAccountKey) -> Result<String, ClientError> {
        // Held across the fetch so one account never refreshes twice at once
        let mut cache = self.cache.lock().await;
        let now = Utc::now().timestamp();

        if let Some(cached) = cache.get(&key.client_email) {
            if cached.expires_at - EXPIRY_SAFETY_WINDOW_SECS > now {
                return Ok(cached.token.clone());
            }
        }

        let fresh = self.fetch_token(key).await?;
        let token = fresh.token.clone();
        cache.insert(key.client_email.clone(), fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(private_key: &str) -> ServiceAccountKey {
        ServiceAccountKey::from_json(
            &serde_json::json!({
                "type": "service_account",
                "client_email": "svc@demo.iam.gserviceaccount.com",
                "private_key": private_key,
                "token_uri": "https://oauth2.example.test/token"
            })
            .to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_static_token_provider() {
        let provider = StaticTokenProvider::new("ya29.test");
        let token = tokio_test::block_on(provider.access_token(&key("pem"))).unwrap();
        assert_eq!(token, "ya29.test");
    }

    #[tokio::test]
    async fn test_invalid_private_key_is_auth_error() {
        let provider = ServiceAccountTokenProvider::new(Client::new(), &VertexConfig::default());
        let err = provider.access_token(&key("not a pem key")).await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[test]
    fn test_token_uri_precedence() {
        let provider = ServiceAccountTokenProvider::new(Client::new(), &VertexConfig::default());
        let with_uri = key("pem");
        assert_eq!(provider.token_uri(&with_uri), "https://oauth2.example.test/token");

        let mut without_uri = key("pem");
        without_uri.token_uri = None;
        assert_eq!(provider.token_uri(&without_uri), DEFAULT_TOKEN_URI);

        let config = VertexConfig::default().with_token_uri("http://127.0.0.1:8080/token");
        let provider = ServiceAccountTokenProvider::new(Client::new(), &config);
        assert_eq!(provider.token_uri(&with_uri), "http://127.0.0.1:8080/token");
    }
}
