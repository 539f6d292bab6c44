//! Core data types for VertexFlow

use crate::errors::NodeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Default Vertex AI region
pub const DEFAULT_REGION: &str = "us-central1";
/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default binary property holding the multimodal image
pub const DEFAULT_BINARY_PROPERTY: &str = "data";

pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
pub const DEFAULT_TEMPERATURE: f32 = 1.0;
pub const DEFAULT_TOP_P: f32 = 0.95;
pub const DEFAULT_TOP_K: u32 = 40;

/// Credential record supplied by the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VertexCredentials {
    /// Google Cloud project ID
    pub project_id: String,
    /// Vertex AI region (e.g. "us-central1")
    #[serde(default = "default_region")]
    pub region: String,
    /// Full text of the service account key file
    pub service_account_key: String,
}

impl VertexCredentials {
    /// Create a credential record
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        service_account_key: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            region: region.into(),
            service_account_key: service_account_key.into(),
        }
    }

    /// Parse the service account key blob
    pub fn parse_service_account_key(&self) -> Result<ServiceAccountKey, NodeError> {
        ServiceAccountKey::from_json(&self.service_account_key)
    }
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Google Cloud service account key
#[derive(Clone, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub auth_uri: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse a key from the JSON text of a key file
    pub fn from_json(json: &str) -> Result<Self, NodeError> {
        serde_json::from_str(json).map_err(NodeError::InvalidCredentials)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Resolved node parameters for one input item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeParameters {
    pub operation: Operation,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub options: GenerationOptions,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

impl NodeParameters {
    /// Parameters for a plain text generation with default options
    pub fn generate_text(prompt: impl Into<String>) -> Self {
        Self::new(Operation::GenerateText {
            prompt: prompt.into(),
        })
    }

    /// Parameters for the given operation with default options
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            model: default_model(),
            options: GenerationOptions::default(),
            response_format: ResponseFormat::default(),
        }
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the generation options
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Set the response format
    pub fn with_response_format(mut self, response_format: ResponseFormat) -> Self {
        self.response_format = response_format;
        self
    }
}

/// What the node asks the model to do
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Operation {
    /// Generate text from a prompt
    GenerateText { prompt: String },
    /// Multi-turn conversation
    Chat {
        #[serde(default)]
        messages: Vec<ChatMessage>,
    },
    /// Text and a single image together
    Multimodal {
        #[serde(default)]
        text: Option<String>,
        image: ImageSource,
    },
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::GenerateText { .. } => OperationKind::GenerateText,
            Operation::Chat { .. } => OperationKind::Chat,
            Operation::Multimodal { .. } => OperationKind::Multimodal,
        }
    }
}

/// Operation discriminant echoed in the output record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperationKind {
    GenerateText,
    Chat,
    Multimodal,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::GenerateText => "generateText",
            OperationKind::Chat => "chat",
            OperationKind::Multimodal => "multimodal",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured chat message
///
/// The role is sent as given; Gemini accepts `user` and `model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(default = "default_chat_role")]
    pub role: String,
    #[serde(default)]
    pub content: String,
}

fn default_chat_role() -> String {
    "user".to_string()
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new("model", content)
    }
}

/// Where the multimodal image comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "camelCase")]
pub enum ImageSource {
    /// Binary attachment on the input item
    Binary {
        #[serde(default = "default_binary_property")]
        property: String,
    },
    /// Remote image reference
    Url { url: String },
    /// Inline base64 data, optionally with a `data:image/...;base64,` prefix
    Base64 { data: String },
}

fn default_binary_property() -> String {
    DEFAULT_BINARY_PROPERTY.to_string()
}

/// Generation options collected from the node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GenerationOptions {
    /// Maximum tokens to generate (0 falls back to the default)
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature (0-2)
    pub temperature: Option<f32>,
    /// Nucleus sampling threshold
    pub top_p: Option<f32>,
    /// Top-k sampling threshold
    pub top_k: Option<u32>,
    /// System instruction guiding the model
    pub system_instruction: Option<String>,
    /// Reasoning effort for Gemini 3 models
    pub thinking_level: ThinkingLevel,
}

impl GenerationOptions {
    pub fn max_output_tokens(&self) -> u32 {
        match self.max_output_tokens {
            Some(tokens) if tokens > 0 => tokens,
            _ => DEFAULT_MAX_OUTPUT_TOKENS,
        }
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn top_p(&self) -> f32 {
        self.top_p.unwrap_or(DEFAULT_TOP_P)
    }

    pub fn top_k(&self) -> u32 {
        self.top_k.unwrap_or(DEFAULT_TOP_K)
    }

    /// System instruction, if one was given and is not empty
    pub fn system_instruction(&self) -> Option<&str> {
        self.system_instruction.as_deref().filter(|s| !s.is_empty())
    }
}

/// Reasoning effort level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkingLevel {
    #[default]
    None,
    Low,
    High,
}

impl ThinkingLevel {
    /// Upper-cased value sent to the API, `None` for the default level
    pub fn wire_value(&self) -> Option<&'static str> {
        match self {
            ThinkingLevel::None => None,
            ThinkingLevel::Low => Some("LOW"),
            ThinkingLevel::High => Some("HIGH"),
        }
    }
}

/// Requested response format
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format")]
pub enum ResponseFormat {
    #[default]
    #[serde(rename = "text/plain")]
    PlainText,
    #[serde(rename = "application/json")]
    Json {
        #[serde(default)]
        schema: JsonSchemaMode,
    },
    #[serde(rename = "text/x.enum")]
    Enum {
        #[serde(default)]
        schema: EnumSchemaMode,
    },
}

impl ResponseFormat {
    /// MIME type sent as `responseMimeType`, `None` for plain text
    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            ResponseFormat::PlainText => None,
            ResponseFormat::Json { .. } => Some("application/json"),
            ResponseFormat::Enum { .. } => Some("text/x.enum"),
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self, ResponseFormat::Json { .. })
    }
}

/// Schema input for JSON responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum JsonSchemaMode {
    /// Object schema assembled from property descriptors
    Simple {
        #[serde(default)]
        properties: Vec<SchemaProperty>,
    },
    /// Raw schema text
    Advanced {
        #[serde(rename = "responseSchema", default)]
        response_schema: String,
    },
}

impl Default for JsonSchemaMode {
    fn default() -> Self {
        JsonSchemaMode::Simple {
            properties: Vec::new(),
        }
    }
}

/// Schema input for enum responses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum EnumSchemaMode {
    /// Comma-separated list of allowed values
    Simple {
        #[serde(rename = "enumValues", default)]
        enum_values: String,
    },
    /// Raw schema text
    Advanced {
        #[serde(rename = "responseSchema", default)]
        response_schema: String,
    },
}

impl Default for EnumSchemaMode {
    fn default() -> Self {
        EnumSchemaMode::Simple {
            enum_values: String::new(),
        }
    }
}

/// One property of a simple-mode object schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaProperty {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub property_type: PropertyType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub nullable: bool,
    /// Comma-separated allowed values, only honored for string properties
    #[serde(default)]
    pub enum_values: Option<String>,
}

fn default_required() -> bool {
    true
}

impl SchemaProperty {
    /// A required property with no description or restrictions
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            property_type,
            description: None,
            required: true,
            nullable: false,
            enum_values: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_enum_values(mut self, values: impl Into<String>) -> Self {
        self.enum_values = Some(values.into());
        self
    }
}

/// Declared type of a schema property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    #[default]
    String,
    Number,
    Integer,
    Boolean,
    ArrayString,
    ArrayNumber,
    Object,
}

/// An input item handed to the node by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowItem {
    #[serde(default)]
    pub json: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary: BTreeMap<String, BinaryData>,
}

impl WorkflowItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach binary data under the given property name
    pub fn with_binary(mut self, property: impl Into<String>, data: BinaryData) -> Self {
        self.binary.insert(property.into(), data);
        self
    }

    pub fn binary(&self, property: &str) -> Option<&BinaryData> {
        self.binary.get(property)
    }
}

/// Binary attachment on an input item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    /// Raw bytes (base64 when serialized)
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl BinaryData {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            mime_type: None,
            file_name: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.trim()).map_err(serde::de::Error::custom)
    }
}
