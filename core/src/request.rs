//! Request construction: maps node parameters onto a Vertex AI generateContent call

use crate::errors::{ItemError, ItemResult};
use crate::types::*;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::{Arc, LazyLock};
use tracing::debug;

/// Location used for preview models
pub const GLOBAL_LOCATION: &str = "global";
/// API endpoint used for preview models
pub const GLOBAL_API_ENDPOINT: &str = "aiplatform.googleapis.com";
/// Text sent with a multimodal image when none was configured
pub const DEFAULT_IMAGE_PROMPT: &str = "Describe this image";
/// MIME type assumed for binary attachments without one and for base64 images
pub const DEFAULT_INLINE_MIME_TYPE: &str = "image/png";
/// MIME type sent with remote image references
pub const DEFAULT_URL_MIME_TYPE: &str = "image/jpeg";

static DATA_URL_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/\w+;base64,").expect("data URL prefix pattern is valid")
});

/// A single outbound generateContent call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub model: String,
    pub endpoint: Endpoint,
    #[serde(skip)]
    pub credentials: Arc<ServiceAccountKey>,
    pub generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
    pub contents: Vec<Content>,
}

/// Where a request is sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub project_id: String,
    pub location: String,
    /// Alternate API host, regional host when `None`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

impl Endpoint {
    /// API host the request goes to
    pub fn host(&self) -> String {
        match &self.api_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("{}-aiplatform.googleapis.com", self.location),
        }
    }

    /// Path of the generateContent method for a model, relative to the API version root
    pub fn model_path(&self, model: &str) -> String {
        format!(
            "projects/{}/locations/{}/publishers/google/models/{}:generateContent",
            self.project_id, self.location, model
        )
    }
}

/// One role-tagged turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            role: role.into(),
            parts,
        }
    }

    /// A user turn with a single text part
    pub fn user_text(text: impl Into<String>) -> Self {
        Self::new("user", vec![Part::Text(text.into())])
    }
}

/// A piece of content inside a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Part {
    Text(String),
    InlineData(Blob),
    FileData(FileData),
}

/// Inline base64 data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

/// Remote file reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub mime_type: String,
    pub file_uri: String,
}

/// Generation configuration sent with the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking_config: Option<ThinkingConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<Value>,
}

/// Reasoning configuration for Gemini 3 models
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThinkingConfig {
    pub thinking_level: String,
}

/// Builds requests for one node execution
pub struct RequestBuilder {
    project_id: String,
    region: String,
    credentials: Arc<ServiceAccountKey>,
}

impl RequestBuilder {
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        credentials: Arc<ServiceAccountKey>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            region: region.into(),
            credentials,
        }
    }

    /// Build the request for one input item
    pub fn build(
        &self,
        params: &NodeParameters,
        item: &WorkflowItem,
    ) -> ItemResult<GenerateRequest> {
        let endpoint = resolve_endpoint(&self.project_id, &self.region, &params.model);
        let generation_config = build_generation_config(params)?;
        let system_instruction = params
            .options
            .system_instruction()
            .map(|text| Content::new("system", vec![Part::Text(text.to_string())]));
        let contents = build_contents(&params.operation, item)?;

        debug!(
            "Built {} request for model {} at location {} ({} turns)",
            params.operation.kind(),
            params.model,
            endpoint.location,
            contents.len()
        );

        Ok(GenerateRequest {
            model: params.model.clone(),
            endpoint,
            credentials: Arc::clone(&self.credentials),
            generation_config,
            system_instruction,
            contents,
        })
    }
}

pub fn is_preview_model(model: &str) -> bool {
    model.contains("preview")
}

pub fn is_gemini3_model(model: &str) -> bool {
    model.contains("gemini-3")
}

/// Preview models are only served from the global endpoint
pub fn resolve_endpoint(project_id: &str, region: &str, model: &str) -> Endpoint {
    if is_preview_model(model) {
        Endpoint {
            project_id: project_id.to_string(),
            location: GLOBAL_LOCATION.to_string(),
            api_endpoint: Some(GLOBAL_API_ENDPOINT.to_string()),
        }
    } else {
        Endpoint {
            project_id: project_id.to_string(),
            location: region.to_string(),
            api_endpoint: None,
        }
    }
}

/// Thinking config, only for Gemini 3 models with a non-default level
pub fn thinking_config(model: &str, level: ThinkingLevel) -> Option<ThinkingConfig> {
    if !is_gemini3_model(model) {
        return None;
    }
    level.wire_value().map(|value| ThinkingConfig {
        thinking_level: value.to_string(),
    })
}

pub fn build_generation_config(params: &NodeParameters) -> ItemResult<GenerationConfig> {
    let options = &params.options;
    Ok(GenerationConfig {
        max_output_tokens: options.max_output_tokens(),
        temperature: options.temperature(),
        top_p: options.top_p(),
        top_k: options.top_k(),
        thinking_config: thinking_config(&params.model, options.thinking_level),
        response_mime_type: params.response_format.mime_type().map(str::to_string),
        response_schema: response_schema(&params.response_format)?,
    })
}

/// Schema constraining the response, if the format and inputs call for one
pub fn response_schema(format: &ResponseFormat) -> ItemResult<Option<Value>> {
    match format {
        ResponseFormat::PlainText => Ok(None),
        ResponseFormat::Enum {
            schema: EnumSchemaMode::Simple { enum_values },
        } => Ok(enum_schema(enum_values)),
        ResponseFormat::Json {
            schema: JsonSchemaMode::Simple { properties },
        } => Ok(object_schema(properties)),
        ResponseFormat::Enum {
            schema: EnumSchemaMode::Advanced { response_schema },
        }
        | ResponseFormat::Json {
            schema: JsonSchemaMode::Advanced { response_schema },
        } => parse_raw_schema(response_schema),
    }
}

/// Split a comma-separated list into trimmed, non-empty, distinct values in first-seen order
pub fn split_enum_values(raw: &str) -> Vec<String> {
    let mut values: Vec<String> = Vec::new();
    for value in raw.split(',').map(str::trim).filter(|v| !v.is_empty()) {
        if !values.iter().any(|seen| seen == value) {
            values.push(value.to_string());
        }
    }
    values
}

pub fn enum_schema(raw: &str) -> Option<Value> {
    let values = split_enum_values(raw);
    if values.is_empty() {
        return None;
    }
    Some(json!({ "type": "STRING", "enum": values }))
}

pub fn object_schema(properties: &[SchemaProperty]) -> Option<Value> {
    let mut schema_properties = Map::new();
    let mut required: Vec<String> = Vec::new();

    for property in properties.iter().filter(|p| !p.name.is_empty()) {
        schema_properties.insert(property.name.clone(), property_schema(property));
        if property.required && !required.contains(&property.name) {
            required.push(property.name.clone());
        }
    }

    if schema_properties.is_empty() {
        return None;
    }

    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("OBJECT"));
    schema.insert("properties".to_string(), Value::Object(schema_properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), json!(required));
    }
    Some(Value::Object(schema))
}

pub fn property_schema(property: &SchemaProperty) -> Value {
    let mut schema = Map::new();
    match property.property_type {
        PropertyType::ArrayString => {
            schema.insert("type".to_string(), json!("ARRAY"));
            schema.insert("items".to_string(), json!({ "type": "STRING" }));
        }
        PropertyType::ArrayNumber => {
            schema.insert("type".to_string(), json!("ARRAY"));
            schema.insert("items".to_string(), json!({ "type": "NUMBER" }));
        }
        PropertyType::String => {
            schema.insert("type".to_string(), json!("STRING"));
        }
        PropertyType::Number => {
            schema.insert("type".to_string(), json!("NUMBER"));
        }
        PropertyType::Integer => {
            schema.insert("type".to_string(), json!("INTEGER"));
        }
        PropertyType::Boolean => {
            schema.insert("type".to_string(), json!("BOOLEAN"));
        }
        PropertyType::Object => {
            schema.insert("type".to_string(), json!("OBJECT"));
        }
    }

    if let Some(description) = property.description.as_deref().filter(|d| !d.is_empty()) {
        schema.insert("description".to_string(), json!(description));
    }

    if property.nullable {
        schema.insert("nullable".to_string(), json!(true));
    }

    if property.property_type == PropertyType::String {
        if let Some(raw) = property.enum_values.as_deref() {
            let values = split_enum_values(raw);
            if !values.is_empty() {
                schema.insert("enum".to_string(), json!(values));
            }
        }
    }

    Value::Object(schema)
}

fn parse_raw_schema(raw: &str) -> ItemResult<Option<Value>> {
    if raw.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(raw)
        .map(Some)
        .map_err(ItemError::InvalidResponseSchema)
}

/// Remove a leading `data:image/<type>;base64,` prefix
pub fn strip_data_url_prefix(data: &str) -> &str {
    match DATA_URL_PREFIX.find(data) {
        Some(prefix) => &data[prefix.end()..],
        None => data,
    }
}

/// Conversation turns for an operation
pub fn build_contents(operation: &Operation, item: &WorkflowItem) -> ItemResult<Vec<Content>> {
    match operation {
        Operation::GenerateText { prompt } => Ok(vec![Content::user_text(prompt.clone())]),
        Operation::Chat { messages } => Ok(messages
            .iter()
            .map(|message| {
                Content::new(
                    message.role.clone(),
                    vec![Part::Text(message.content.clone())],
                )
            })
            .collect()),
        Operation::Multimodal { text, image } => {
            let text = text
                .as_deref()
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_IMAGE_PROMPT);
            let image_part = image_part(image, item)?;
            Ok(vec![Content::new(
                "user",
                vec![Part::Text(text.to_string()), image_part],
            )])
        }
    }
}

fn image_part(source: &ImageSource, item: &WorkflowItem) -> ItemResult<Part> {
    match source {
        ImageSource::Binary { property } => {
            let binary = item
                .binary(property)
                .ok_or_else(|| ItemError::MissingBinaryData(property.clone()))?;
            Ok(Part::InlineData(Blob {
                mime_type: binary
                    .mime_type
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INLINE_MIME_TYPE.to_string()),
                data: STANDARD.encode(&binary.data),
            }))
        }
        ImageSource::Url { url } => Ok(Part::FileData(FileData {
            mime_type: DEFAULT_URL_MIME_TYPE.to_string(),
            file_uri: url.clone(),
        })),
        ImageSource::Base64 { data } => Ok(Part::InlineData(Blob {
            mime_type: DEFAULT_INLINE_MIME_TYPE.to_string(),
            data: strip_data_url_prefix(data).to_string(),
        })),
    }
}
