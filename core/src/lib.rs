//! # VertexFlow Core
//!
//! Core types and logic of the VertexFlow Vertex AI node: turns per-item node
//! parameters into Gemini generateContent requests and flattens the responses
//! into workflow output records. The API client itself lives behind the
//! [`GenerativeClient`] trait.

pub mod catalog;
pub mod errors;
pub mod execution;
pub mod request;
pub mod response;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use errors::{ClientError, ItemError, NodeError};
pub use execution::{NodeExecutor, NodeOutputItem, OutputRecord};
pub use request::{GenerateRequest, RequestBuilder};
pub use response::{GenerateContentResponse, GenerationOutput};
pub use traits::{GenerativeClient, ParameterSource};
pub use types::{NodeParameters, VertexCredentials, WorkflowItem};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::*;
    pub use crate::execution::*;
    pub use crate::request::*;
    pub use crate::response::*;
    pub use crate::traits::*;
    pub use crate::types::*;
    pub use async_trait::async_trait;
}
