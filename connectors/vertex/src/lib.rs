//! Vertex AI connector for VertexFlow

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use vertexflow_core::prelude::*;

mod auth;
mod config;
mod models;

pub use auth::{ServiceAccountTokenProvider, StaticTokenProvider, TokenProvider};
pub use config::{VertexConfig, DEFAULT_SCOPE, DEFAULT_TOKEN_URI};
use models::*;

/// Vertex AI implementation of GenerativeClient
pub struct VertexConnector {
    client: Client,
    config: VertexConfig,
    tokens: Arc<dyn TokenProvider>,
}

impl VertexConnector {
    /// Create a connector authenticating with the request's service account
    pub fn new(config: VertexConfig) -> Result<Self, ClientError> {
        let client = build_http_client(&config)?;
        let tokens = Arc::new(ServiceAccountTokenProvider::new(client.clone(), &config));
        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    /// Create a connector with a custom token source
    pub fn with_token_provider(
        config: VertexConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ClientError> {
        let client = build_http_client(&config)?;
        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    /// Full generateContent URL for a request
    pub fn endpoint_url(&self, request: &GenerateRequest) -> String {
        let origin = match &self.config.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}", request.endpoint.host()),
        };
        format!(
            "{}/{}/{}",
            origin,
            self.config.api_version,
            request.endpoint.model_path(&request.model)
        )
    }

    /// Turn a non-success response into a client error
    async fn api_error(response: reqwest::Response) -> ClientError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
            Ok(parsed) if !parsed.error.message.is_empty() => {
                debug!(
                    "Vertex AI error details: code {:?}, status {:?}",
                    parsed.error.code, parsed.error.status
                );
                parsed.error.message
            }
            _ if body.is_empty() => format!("Vertex AI returned {}", status),
            _ => body,
        };

        error!("Vertex AI API error {}: {}", status, message);
        ClientError::Api {
            status: status.as_u16(),
            message,
        }
    }
}

fn build_http_client(config: &VertexConfig) -> Result<Client, ClientError> {
    Client::builder()
        .timeout(std::time::Duration::from_millis(config.timeout_ms))
        .build()
        .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))
}

#[async_trait]
impl GenerativeClient for VertexConnector {
    async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateContentResponse, ClientError> {
        let start_time = Instant::now();
        let url = self.endpoint_url(request);
        debug!("POST {}", url);

        let token = self.tokens.access_token(&request.credentials).await?;
        let body = ContentRequest::from(request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ClientError::Network(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let content_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ClientError::ResponseParse(format!("Failed to parse response: {}", e)))?;

        info!(
            "Vertex AI generateContent for {} at {} finished in {}ms",
            request.model,
            request.endpoint.location,
            start_time.elapsed().as_millis()
        );

        Ok(content_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TEST_PRIVATE_KEY: &str = include_str!("../testdata/service_account_key.pem");

    const MODEL_PATH: &str =
        "/v1/projects/demo-project/locations/us-central1/publishers/google/models/gemini-2.5-flash:generateContent";

    fn credentials() -> VertexCredentials {
        VertexCredentials::new(
            "demo-project",
            "us-central1",
            r#"{"type": "service_account", "client_email": "svc@demo.iam.gserviceaccount.com", "private_key": "pem"}"#,
        )
    }

    fn request(params: &NodeParameters) -> GenerateRequest {
        request_builder(&credentials())
            .unwrap()
            .build(params, &WorkflowItem::new())
            .unwrap()
    }

    fn connector(server: &MockServer) -> VertexConnector {
        VertexConnector::with_token_provider(
            VertexConfig::new().with_api_base(server.uri()),
            Arc::new(StaticTokenProvider::new("test-token")),
        )
        .unwrap()
    }

    #[test]
    fn test_connector_creation() {
        let connector = VertexConnector::new(VertexConfig::default());
        assert!(connector.is_ok());
    }

    #[test]
    fn test_endpoint_urls() {
        let connector = VertexConnector::new(VertexConfig::default()).unwrap();

        let regional = request(&NodeParameters::generate_text("hi"));
        assert_eq!(
            connector.endpoint_url(&regional),
            format!("https://us-central1-aiplatform.googleapis.com{}", MODEL_PATH)
        );

        let preview =
            request(&NodeParameters::generate_text("hi").with_model("gemini-3-pro-preview"));
        assert_eq!(
            connector.endpoint_url(&preview),
            "https://aiplatform.googleapis.com/v1/projects/demo-project/locations/global/publishers/google/models/gemini-3-pro-preview:generateContent"
        );
    }

    #[tokio::test]
    async fn test_generate_content_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "Hello from Gemini" }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "promptTokenCount": 3, "candidatesTokenCount": 4, "totalTokenCount": 7 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let params = NodeParameters::generate_text("Say hello").with_options(GenerationOptions {
            system_instruction: Some("Be brief".to_string()),
            ..Default::default()
        });
        let response = connector(&server)
            .generate_content(&request(&params))
            .await
            .unwrap();

        assert_eq!(response.first_text(), "Hello from Gemini");
        assert_eq!(response.usage_metadata.unwrap().total_token_count, Some(7));

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Say hello" }] }],
                "systemInstruction": { "role": "system", "parts": [{ "text": "Be brief" }] },
                "generationConfig": {
                    "maxOutputTokens": 2048,
                    "temperature": 1.0,
                    "topP": 0.95,
                    "topK": 40
                }
            })
        );
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "code": 400,
                    "message": "Unable to submit request because it has an empty text parameter.",
                    "status": "INVALID_ARGUMENT"
                }
            })))
            .mount(&server)
            .await;

        let err = connector(&server)
            .generate_content(&request(&NodeParameters::generate_text("")))
            .await
            .unwrap_err();

        match err {
            ClientError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(
                    message,
                    "Unable to submit request because it has an empty text parameter."
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_api_error_with_plain_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
            .mount(&server)
            .await;

        let err = connector(&server)
            .generate_content(&request(&NodeParameters::generate_text("hi")))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ClientError::Api { status: 503, ref message } if message == "upstream unavailable"
        ));
    }

    #[tokio::test]
    async fn test_service_account_token_exchange_failure() {
        let server = MockServer::start().await;
        let connector = VertexConnector::new(
            VertexConfig::new()
                .with_api_base(server.uri())
                .with_token_uri(format!("{}/token", server.uri())),
        )
        .unwrap();

        // "pem" is not a valid RSA key, so signing fails before any HTTP call
        let err = connector
            .generate_content(&request(&NodeParameters::generate_text("hi")))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Auth(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_service_account_token_is_exchanged_once_and_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains(
                "grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer",
            ))
            .and(body_string_contains("assertion="))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "ya29.exchanged",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(header("authorization", "Bearer ya29.exchanged"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{ "content": { "role": "model", "parts": [{ "text": "ok" }] } }]
            })))
            .expect(2)
            .mount(&server)
            .await;

        let key = json!({
            "type": "service_account",
            "private_key_id": "test-key",
            "client_email": "svc@demo.iam.gserviceaccount.com",
            "private_key": TEST_PRIVATE_KEY
        });
        let credentials = VertexCredentials::new("demo-project", "us-central1", key.to_string());
        let connector = VertexConnector::new(
            VertexConfig::new()
                .with_api_base(server.uri())
                .with_token_uri(format!("{}/token", server.uri())),
        )
        .unwrap();

        let outputs = NodeExecutor::new(connector)
            .execute(
                &credentials,
                &[WorkflowItem::new(), WorkflowItem::new()],
                &NodeParameters::generate_text("hi"),
            )
            .await
            .unwrap();

        let texts: Vec<&str> = outputs
            .iter()
            .map(|o| o.output().unwrap().text.as_str())
            .collect();
        assert_eq!(texts, vec!["ok", "ok"]);
    }

    #[tokio::test]
    async fn test_executor_with_connector() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": "{\"label\": \"positive\"}" }] },
                    "finishReason": "STOP",
                    "safetyRatings": [{ "category": "HARM_CATEGORY_HARASSMENT", "probability": "NEGLIGIBLE" }]
                }]
            })))
            .mount(&server)
            .await;

        let params = NodeParameters::generate_text("Classify: great product").with_response_format(
            ResponseFormat::Json {
                schema: JsonSchemaMode::Simple {
                    properties: vec![SchemaProperty::new("label", PropertyType::String)
                        .with_enum_values("positive, negative")],
                },
            },
        );

        let executor = NodeExecutor::new(connector(&server));
        let outputs = executor
            .execute(&credentials(), &[WorkflowItem::new()], &params)
            .await
            .unwrap();

        let output = outputs[0].output().unwrap();
        assert_eq!(output.json, Some(json!({ "label": "positive" })));
        assert_eq!(output.finish_reason.as_deref(), Some("STOP"));

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["generationConfig"]["responseMimeType"], json!("application/json"));
        assert_eq!(
            body["generationConfig"]["responseSchema"],
            json!({
                "type": "OBJECT",
                "properties": { "label": { "type": "STRING", "enum": ["positive", "negative"] } },
                "required": ["label"]
            })
        );
    }
}
