//! Core traits defining the seams between the node, its host and the API client

use crate::errors::{ClientError, ItemError};
use crate::request::GenerateRequest;
use crate::response::GenerateContentResponse;
use crate::types::{NodeParameters, WorkflowItem};
use async_trait::async_trait;
use std::sync::Arc;

/// Client for a generative model API
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Send one generateContent request and return the raw response
    async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateContentResponse, ClientError>;
}

#[async_trait]
impl<T: GenerativeClient + ?Sized> GenerativeClient for Arc<T> {
    async fn generate_content(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateContentResponse, ClientError> {
        (**self).generate_content(request).await
    }
}

/// Resolves node parameters for each input item
///
/// Hosts evaluate per-item expressions here; a fixed `NodeParameters` value
/// applies the same parameters to every item.
pub trait ParameterSource: Send + Sync {
    fn parameters(&self, item_index: usize, item: &WorkflowItem)
        -> Result<NodeParameters, ItemError>;
}

impl ParameterSource for NodeParameters {
    fn parameters(
        &self,
        _item_index: usize,
        _item: &WorkflowItem,
    ) -> Result<NodeParameters, ItemError> {
        Ok(self.clone())
    }
}

impl<F> ParameterSource for F
where
    F: Fn(usize, &WorkflowItem) -> Result<NodeParameters, ItemError> + Send + Sync,
{
    fn parameters(
        &self,
        item_index: usize,
        item: &WorkflowItem,
    ) -> Result<NodeParameters, ItemError> {
        self(item_index, item)
    }
}
