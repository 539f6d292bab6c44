//! Error types for VertexFlow node execution

use thiserror::Error;

/// Message surfaced when the credential's service-account key is not valid JSON
pub const INVALID_CREDENTIALS_MESSAGE: &str =
    "Invalid Service Account Key JSON. Please paste the entire JSON content from your service account key file.";

/// Message surfaced when an advanced-mode response schema is not valid JSON
pub const INVALID_RESPONSE_SCHEMA_MESSAGE: &str =
    "Invalid Response Schema JSON. Please provide a valid JSON schema.";

/// Errors that abort a whole node execution
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("{}", INVALID_CREDENTIALS_MESSAGE)]
    InvalidCredentials(#[source] serde_json::Error),

    #[error("Vertex AI Error: {source}")]
    Item {
        item_index: usize,
        #[source]
        source: ItemError,
    },
}

impl NodeError {
    /// Index of the input item that caused the failure, if any
    pub fn item_index(&self) -> Option<usize> {
        match self {
            NodeError::InvalidCredentials(_) => None,
            NodeError::Item { item_index, .. } => Some(*item_index),
        }
    }
}

/// Errors scoped to a single input item
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("Could not resolve node parameters: {0}")]
    Parameters(String),

    #[error("{}", INVALID_RESPONSE_SCHEMA_MESSAGE)]
    InvalidResponseSchema(#[source] serde_json::Error),

    #[error("No binary data property \"{0}\" exists on item!")]
    MissingBinaryData(String),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Errors raised by a generative API client
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse API response: {0}")]
    ResponseParse(String),
}

/// Result type alias for node execution
pub type NodeResult<T> = Result<T, NodeError>;

/// Result type alias for single-item processing
pub type ItemResult<T> = Result<T, ItemError>;

/// Result type alias for API client operations
pub type ClientResult<T> = Result<T, ClientError>;
