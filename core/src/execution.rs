//! Per-item execution loop of the Vertex AI node

use crate::errors::{ItemError, ItemResult, NodeError, NodeResult};
use crate::request::{GenerateRequest, RequestBuilder};
use crate::response::{normalize, GenerationOutput};
use crate::traits::{GenerativeClient, ParameterSource};
use crate::types::{VertexCredentials, WorkflowItem};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// One entry of the node's output, paired with the input item it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutputItem {
    pub json: OutputRecord,
    pub paired_item: PairedItem,
}

/// Reference back to an input item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairedItem {
    pub item: usize,
}

/// Output payload: a generation result or an item-scoped failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputRecord {
    Generated(GenerationOutput),
    Failed { error: String },
}

impl NodeOutputItem {
    pub fn success(item_index: usize, output: GenerationOutput) -> Self {
        Self {
            json: OutputRecord::Generated(output),
            paired_item: PairedItem { item: item_index },
        }
    }

    pub fn failure(item_index: usize, error: &ItemError) -> Self {
        Self {
            json: OutputRecord::Failed {
                error: error.to_string(),
            },
            paired_item: PairedItem { item: item_index },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.json, OutputRecord::Failed { .. })
    }

    pub fn output(&self) -> Option<&GenerationOutput> {
        match &self.json {
            OutputRecord::Generated(output) => Some(output),
            OutputRecord::Failed { .. } => None,
        }
    }
}

/// Dry-run result for one item
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewItem {
    pub item: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<GenerateRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Runs the node over a batch of input items
pub struct NodeExecutor<C> {
    client: C,
    continue_on_fail: bool,
}

impl<C: GenerativeClient> NodeExecutor<C> {
    /// Create an executor that aborts on the first failing item
    pub fn new(client: C) -> Self {
        Self {
            client,
            continue_on_fail: false,
        }
    }

    /// Record item failures and keep going instead of aborting
    pub fn with_continue_on_fail(mut self, continue_on_fail: bool) -> Self {
        self.continue_on_fail = continue_on_fail;
        self
    }

    pub fn continue_on_fail(&self) -> bool {
        self.continue_on_fail
    }

    /// Execute the node for every input item, in order
    pub async fn execute(
        &self,
        credentials: &VertexCredentials,
        items: &[WorkflowItem],
        parameters: &dyn ParameterSource,
    ) -> NodeResult<Vec<NodeOutputItem>> {
        let builder = request_builder(credentials)?;
        let execution_id = Uuid::new_v4();
        let start_time = Instant::now();
        debug!("Starting execution {} over {} items", execution_id, items.len());

        let mut outputs = Vec::with_capacity(items.len());
        for (item_index, item) in items.iter().enumerate() {
            match self.execute_item(&builder, item_index, item, parameters).await {
                Ok(output) => outputs.push(NodeOutputItem::success(item_index, output)),
                Err(e) if self.continue_on_fail => {
                    error!("Item {} failed, continuing: {}", item_index, e);
                    outputs.push(NodeOutputItem::failure(item_index, &e));
                }
                Err(e) => {
                    error!(
                        "Item {} failed, aborting execution {}: {}",
                        item_index, execution_id, e
                    );
                    return Err(NodeError::Item {
                        item_index,
                        source: e,
                    });
                }
            }
        }

        let failed = outputs.iter().filter(|o| o.is_error()).count();
        info!(
            "Execution {} completed in {:?}: {} items, {} failed",
            execution_id,
            start_time.elapsed(),
            outputs.len(),
            failed
        );

        Ok(outputs)
    }

    /// Build, send and normalize the request for a single item
    pub async fn execute_item(
        &self,
        builder: &RequestBuilder,
        item_index: usize,
        item: &WorkflowItem,
        parameters: &dyn ParameterSource,
    ) -> ItemResult<GenerationOutput> {
        let start_time = Instant::now();
        let params = parameters.parameters(item_index, item)?;
        let request = builder.build(&params, item)?;

        let response = self.client.generate_content(&request).await?;
        let output = normalize(
            response,
            &params.model,
            params.operation.kind(),
            &params.response_format,
        );

        info!(
            "Item {} ({} via {}) finished in {}ms, finish reason {:?}",
            item_index,
            params.operation.kind(),
            params.model,
            start_time.elapsed().as_millis(),
            output.finish_reason
        );

        Ok(output)
    }
}

/// Build every item's request without calling the API
pub fn preview(
    credentials: &VertexCredentials,
    items: &[WorkflowItem],
    parameters: &dyn ParameterSource,
) -> NodeResult<Vec<PreviewItem>> {
    let builder = request_builder(credentials)?;

    Ok(items
        .iter()
        .enumerate()
        .map(|(item_index, item)| {
            let built = parameters
                .parameters(item_index, item)
                .and_then(|params| builder.build(&params, item));
            match built {
                Ok(request) => PreviewItem {
                    item: item_index,
                    request: Some(request),
                    error: None,
                },
                Err(e) => PreviewItem {
                    item: item_index,
                    request: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect())
}

/// Parse the credential once for the whole batch
pub fn request_builder(credentials: &VertexCredentials) -> NodeResult<RequestBuilder> {
    let key = credentials.parse_service_account_key()?;
    Ok(RequestBuilder::new(
        credentials.project_id.clone(),
        credentials.region.clone(),
        Arc::new(key),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClientError;
    use crate::response::GenerateContentResponse;
    use crate::types::{NodeParameters, Operation};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const KEY_JSON: &str = r#"{"type": "service_account", "client_email": "svc@demo.iam.gserviceaccount.com", "private_key": "pem"}"#;

    /// Echoes the prompt back, failing on the configured call numbers
    struct ScriptedClient {
        calls: AtomicUsize,
        fail_on: Vec<usize>,
        seen: Mutex<Vec<GenerateRequest>>,
    }

    impl ScriptedClient {
        fn new(fail_on: Vec<usize>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_on,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerativeClient for ScriptedClient {
        async fn generate_content(
            &self,
            request: &GenerateRequest,
        ) -> Result<GenerateContentResponse, ClientError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            if self.fail_on.contains(&call) {
                return Err(ClientError::Api {
                    status: 429,
                    message: "Resource exhausted".to_string(),
                });
            }

            let prompt = match &request.contents[0].parts[0] {
                crate::request::Part::Text(text) => text.clone(),
                _ => String::new(),
            };
            Ok(serde_json::from_value(json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": format!("echo: {}", prompt) }] },
                    "finishReason": "STOP"
                }],
                "usageMetadata": { "totalTokenCount": 5 }
            }))
            .unwrap())
        }
    }

    fn credentials() -> VertexCredentials {
        VertexCredentials::new("demo-project", "us-central1", KEY_JSON)
    }

    fn items(count: usize) -> Vec<WorkflowItem> {
        (0..count)
            .map(|i| {
                let mut item = WorkflowItem::new();
                item.json.insert("prompt".to_string(), json!(format!("prompt {}", i)));
                item
            })
            .collect()
    }

    fn prompt_from_item(_index: usize, item: &WorkflowItem) -> Result<NodeParameters, ItemError> {
        let prompt = item
            .json
            .get("prompt")
            .and_then(|p| p.as_str())
            .ok_or_else(|| ItemError::Parameters("missing prompt".to_string()))?;
        Ok(NodeParameters::generate_text(prompt))
    }

    #[tokio::test]
    async fn test_execute_preserves_order() {
        let executor = NodeExecutor::new(ScriptedClient::new(vec![]));
        let outputs = executor
            .execute(&credentials(), &items(3), &prompt_from_item)
            .await
            .unwrap();

        assert_eq!(outputs.len(), 3);
        for (i, output) in outputs.iter().enumerate() {
            assert_eq!(output.paired_item.item, i);
            assert_eq!(output.output().unwrap().text, format!("echo: prompt {}", i));
        }
    }

    #[tokio::test]
    async fn test_continue_on_fail_records_item_error() {
        let executor = NodeExecutor::new(ScriptedClient::new(vec![1])).with_continue_on_fail(true);
        assert!(executor.continue_on_fail());
        let outputs = executor
            .execute(&credentials(), &items(3), &prompt_from_item)
            .await
            .unwrap();

        assert_eq!(outputs.len(), 3);
        assert_eq!(outputs[0].output().unwrap().text, "echo: prompt 0");
        assert_eq!(
            outputs[1],
            NodeOutputItem {
                json: OutputRecord::Failed {
                    error: "Resource exhausted".to_string()
                },
                paired_item: PairedItem { item: 1 },
            }
        );
        assert_eq!(outputs[2].output().unwrap().text, "echo: prompt 2");

        let record = serde_json::to_value(&outputs[1]).unwrap();
        assert_eq!(
            record,
            json!({ "json": { "error": "Resource exhausted" }, "pairedItem": { "item": 1 } })
        );
    }

    #[tokio::test]
    async fn test_failure_aborts_without_continue_on_fail() {
        let client = Arc::new(ScriptedClient::new(vec![1]));
        let executor = NodeExecutor::new(Arc::clone(&client));
        assert!(!executor.continue_on_fail());
        let err = executor
            .execute(&credentials(), &items(3), &prompt_from_item)
            .await
            .unwrap_err();

        assert_eq!(err.item_index(), Some(1));
        assert_eq!(err.to_string(), "Vertex AI Error: Resource exhausted");
        // The third item is never sent
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_invalid_credentials_abort_before_any_item() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let executor = NodeExecutor::new(Arc::clone(&client)).with_continue_on_fail(true);
        let bad = VertexCredentials::new("demo-project", "us-central1", "{ not json");

        let err = executor
            .execute(&bad, &items(2), &prompt_from_item)
            .await
            .unwrap_err();

        assert!(matches!(err, NodeError::InvalidCredentials(_)));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_parameter_errors_are_item_scoped() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let executor = NodeExecutor::new(Arc::clone(&client)).with_continue_on_fail(true);
        let mut batch = items(2);
        batch[0].json.clear();

        let outputs = executor
            .execute(&credentials(), &batch, &prompt_from_item)
            .await
            .unwrap();

        assert!(outputs[0].is_error());
        assert!(!outputs[1].is_error());
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_static_parameters_and_request_routing() {
        let client = Arc::new(ScriptedClient::new(vec![]));
        let executor = NodeExecutor::new(Arc::clone(&client));
        let params =
            NodeParameters::generate_text("same for all").with_model("gemini-3-pro-preview");

        let outputs = executor.execute(&credentials(), &items(2), &params).await.unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].output().unwrap().model, "gemini-3-pro-preview");

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|r| r.endpoint.location == "global"));
        assert_eq!(seen[0].credentials.client_email, "svc@demo.iam.gserviceaccount.com");
    }

    #[test]
    fn test_preview_reports_item_errors() {
        let params = |index: usize, _item: &WorkflowItem| -> Result<NodeParameters, ItemError> {
            if index == 1 {
                Ok(NodeParameters::new(Operation::Multimodal {
                    text: None,
                    image: crate::types::ImageSource::Binary {
                        property: "data".to_string(),
                    },
                }))
            } else {
                Ok(NodeParameters::generate_text("hello"))
            }
        };

        let previews = preview(&credentials(), &items(2), &params).unwrap();
        assert!(previews[0].request.is_some());
        assert_eq!(
            previews[1].error.as_deref(),
            Some("No binary data property \"data\" exists on item!")
        );

        let wire = serde_json::to_value(&previews[0]).unwrap();
        assert_eq!(wire["request"]["endpoint"]["location"], json!("us-central1"));
        assert!(wire["request"].get("credentials").is_none());
    }
}
