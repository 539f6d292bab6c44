//! Loading node parameters and input items from files
//!
//! String values in a parameters file may reference fields of the current
//! item with `{{ $json.field }}` (dotted paths reach into nested objects).
//! Placeholders are resolved per item before the parameters are parsed, so
//! one file drives a whole batch with item-specific prompts.

use crate::error::CliError;
use figment::{
    providers::{Format, Json, Yaml},
    Figment,
};
use regex::{Captures, Regex};
use serde_json::Value;
use std::path::Path;
use std::sync::LazyLock;
use vertexflow_core::prelude::*;
use vertexflow_core::types::DEFAULT_MODEL;

static ITEM_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*\$json\.([A-Za-z0-9_.]+)\s*\}\}").expect("placeholder pattern is valid")
});

/// Node parameters whose strings may reference item fields
#[derive(Debug, Clone)]
pub struct TemplatedParameters {
    template: Value,
}

impl TemplatedParameters {
    /// Read a YAML or JSON parameters file
    pub fn load(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Err(CliError::input(path, "file not found"));
        }

        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Figment::from(Json::file(path)),
            _ => Figment::from(Yaml::file(path)),
        };

        let template: Value = figment.extract().map_err(|e| CliError::input(path, e))?;
        Self::from_value(template).map_err(|e| CliError::input(path, e))
    }

    /// Wrap an already-parsed parameter document
    pub fn from_value(template: Value) -> Result<Self, serde_json::Error> {
        // Placeholders only live inside strings, so the shape can be checked up front
        serde_json::from_value::<NodeParameters>(template.clone())?;
        Ok(Self { template })
    }

    /// Model named in the document, before placeholder resolution
    pub fn model(&self) -> &str {
        self.template
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MODEL)
    }
}

impl ParameterSource for TemplatedParameters {
    fn parameters(
        &self,
        _item_index: usize,
        item: &WorkflowItem,
    ) -> Result<NodeParameters, ItemError> {
        serde_json::from_value(render(&self.template, item))
            .map_err(|e| ItemError::Parameters(e.to_string()))
    }
}

fn render(value: &Value, item: &WorkflowItem) -> Value {
    match value {
        Value::String(s) => Value::String(render_str(s, item)),
        Value::Array(values) => Value::Array(values.iter().map(|v| render(v, item)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, v)| (key.clone(), render(v, item)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn render_str(template: &str, item: &WorkflowItem) -> String {
    ITEM_FIELD
        .replace_all(template, |caps: &Captures| {
            match lookup(&item.json, &caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            }
        })
        .into_owned()
}

fn lookup<'a>(json: &'a serde_json::Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = json.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(values) => values.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Read input items, defaulting to one empty item
pub fn load_items(path: Option<&Path>) -> Result<Vec<WorkflowItem>, CliError> {
    let Some(path) = path else {
        return Ok(vec![WorkflowItem::new()]);
    };

    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| CliError::input(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::Builder;

    fn item(json: Value) -> WorkflowItem {
        serde_json::from_value(json!({ "json": json })).unwrap()
    }

    #[test]
    fn test_load_yaml_parameters() {
        let mut file = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "operation:").unwrap();
        writeln!(file, "  kind: generateText").unwrap();
        writeln!(file, "  prompt: Summarize {{{{ $json.title }}}}").unwrap();
        writeln!(file, "model: gemini-2.5-pro").unwrap();
        writeln!(file, "options:").unwrap();
        writeln!(file, "  temperature: 0.2").unwrap();

        let params = TemplatedParameters::load(file.path()).unwrap();
        assert_eq!(params.model(), "gemini-2.5-pro");

        let resolved = params
            .parameters(0, &item(json!({ "title": "Release notes" })))
            .unwrap();
        assert_eq!(
            resolved.operation,
            Operation::GenerateText {
                prompt: "Summarize Release notes".to_string()
            }
        );
        assert_eq!(resolved.options.temperature(), 0.2);
    }

    #[test]
    fn test_load_json_parameters() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"{{"operation": {{"kind": "chat", "messages": [{{"role": "user", "content": "Hi"}}]}}}}"#
        )
        .unwrap();

        let params = TemplatedParameters::load(file.path()).unwrap();
        assert_eq!(params.model(), DEFAULT_MODEL);
        let resolved = params.parameters(0, &WorkflowItem::new()).unwrap();
        assert_eq!(resolved.operation.kind(), OperationKind::Chat);
    }

    #[test]
    fn test_malformed_parameters_rejected_up_front() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"operation": {{"kind": "summarize"}}}}"#).unwrap();

        assert!(matches!(
            TemplatedParameters::load(file.path()),
            Err(CliError::Input { .. })
        ));
        assert!(matches!(
            TemplatedParameters::load(Path::new("/nonexistent/node.yaml")),
            Err(CliError::Input { .. })
        ));
    }

    #[test]
    fn test_placeholder_resolution() {
        let item = item(json!({
            "user": { "name": "Ada", "tags": ["admin", "ops"] },
            "count": 3,
            "missing": null
        }));

        assert_eq!(render_str("Hello {{ $json.user.name }}", &item), "Hello Ada");
        assert_eq!(render_str("{{$json.user.tags.1}}", &item), "ops");
        assert_eq!(render_str("n={{ $json.count }}", &item), "n=3");
        assert_eq!(render_str("[{{ $json.missing }}{{ $json.absent }}]", &item), "[]");
        assert_eq!(render_str("no placeholders", &item), "no placeholders");
    }

    #[test]
    fn test_placeholders_resolved_in_nested_values() {
        let params = TemplatedParameters::from_value(json!({
            "operation": {
                "kind": "multimodal",
                "text": "What is in {{ $json.file }}?",
                "image": { "source": "url", "url": "https://example.com/{{ $json.file }}" }
            }
        }))
        .unwrap();

        let resolved = params.parameters(0, &item(json!({ "file": "cat.png" }))).unwrap();
        assert_eq!(
            resolved.operation,
            Operation::Multimodal {
                text: Some("What is in cat.png?".to_string()),
                image: ImageSource::Url {
                    url: "https://example.com/cat.png".to_string()
                },
            }
        );
    }

    #[test]
    fn test_load_items() {
        let items = load_items(None).unwrap();
        assert_eq!(items, vec![WorkflowItem::new()]);

        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            file,
            r#"[{{"json": {{"title": "a"}}}}, {{"json": {{}}, "binary": {{"data": {{"data": "aGk=", "mimeType": "image/png"}}}}}}]"#
        )
        .unwrap();

        let items = load_items(Some(file.path())).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].json["title"], json!("a"));
        assert_eq!(items[1].binary("data").unwrap().data, b"hi".to_vec());

        assert!(matches!(
            load_items(Some(Path::new("/nonexistent/items.json"))),
            Err(CliError::Io { .. })
        ));
    }
}
