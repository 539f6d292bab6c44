//! Output formatting utilities for vxctl

use crate::cli::OutputFormat;
use crate::error::CliError;
use colored::*;
use serde::Serialize;
use tabled::{Table, Tabled};
use vertexflow_core::catalog::{MODELS, REGIONS};
use vertexflow_core::execution::{NodeOutputItem, OutputRecord, PreviewItem};
use vertexflow_core::types::{DEFAULT_MODEL, DEFAULT_REGION};

const EXCERPT_CHARS: usize = 60;

/// Display node outputs
pub fn display_outputs(outputs: &[NodeOutputItem], format: &OutputFormat) -> Result<(), CliError> {
    println!("{}", render_outputs(outputs, format)?);
    Ok(())
}

/// Display dry-run requests
pub fn display_previews(previews: &[PreviewItem], format: &OutputFormat) -> Result<(), CliError> {
    println!("{}", render_previews(previews, format)?);
    Ok(())
}

/// Display the model and region catalog
pub fn display_catalog(format: &OutputFormat) -> Result<(), CliError> {
    println!("{}", render_catalog(format)?);
    Ok(())
}

pub fn render_outputs(
    outputs: &[NodeOutputItem],
    format: &OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            if outputs.is_empty() {
                return Ok("No output items".to_string());
            }

            let rows: Vec<OutputTableRow> = outputs.iter().map(OutputTableRow::from).collect();
            let failed = outputs.iter().filter(|o| o.is_error()).count();
            let summary = if failed == 0 {
                format!("{} item(s) generated", outputs.len()).green().bold()
            } else {
                format!("{} item(s), {} failed", outputs.len(), failed).yellow().bold()
            };
            Ok(format!("{}\n{}", Table::new(rows), summary))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(outputs)?),
        OutputFormat::Jsonl => to_json_lines(outputs),
    }
}

pub fn render_previews(
    previews: &[PreviewItem],
    format: &OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            if previews.is_empty() {
                return Ok("No input items".to_string());
            }

            let rows: Vec<PreviewTableRow> = previews.iter().map(PreviewTableRow::from).collect();
            Ok(Table::new(rows).to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(previews)?),
        OutputFormat::Jsonl => to_json_lines(previews),
    }
}

pub fn render_catalog(format: &OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Table => {
            let models: Vec<CatalogTableRow> = MODELS
                .iter()
                .map(|m| CatalogTableRow::new(m.id, m.display_name, DEFAULT_MODEL))
                .collect();
            let regions: Vec<CatalogTableRow> = REGIONS
                .iter()
                .map(|r| CatalogTableRow::new(r.id, r.display_name, DEFAULT_REGION))
                .collect();

            Ok(format!(
                "{}\n{}\n\n{}\n{}",
                "Models:".bold().blue(),
                Table::new(models),
                "Regions:".bold().blue(),
                Table::new(regions)
            ))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&Catalog::current())?),
        OutputFormat::Jsonl => Ok(serde_json::to_string(&Catalog::current())?),
    }
}

fn to_json_lines<T: Serialize>(values: &[T]) -> Result<String, CliError> {
    let lines = values
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n"))
}

/// Single-line prefix of a text for table cells
fn excerpt(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= EXCERPT_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(EXCERPT_CHARS).collect();
        format!("{}...", cut)
    }
}

#[derive(Serialize)]
struct Catalog {
    models: &'static [vertexflow_core::catalog::ModelInfo],
    regions: &'static [vertexflow_core::catalog::RegionInfo],
}

impl Catalog {
    fn current() -> Self {
        Self {
            models: MODELS,
            regions: REGIONS,
        }
    }
}

#[derive(Tabled)]
struct OutputTableRow {
    #[tabled(rename = "Item")]
    item: usize,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Finish")]
    finish_reason: String,
    #[tabled(rename = "Tokens")]
    tokens: String,
    #[tabled(rename = "Output")]
    text: String,
}

impl From<&NodeOutputItem> for OutputTableRow {
    fn from(output: &NodeOutputItem) -> Self {
        match &output.json {
            OutputRecord::Generated(generated) => Self {
                item: output.paired_item.item,
                status: "ok".green().to_string(),
                finish_reason: generated.finish_reason.clone().unwrap_or_else(|| "-".to_string()),
                tokens: generated
                    .usage
                    .as_ref()
                    .and_then(|u| u.total_token_count)
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                text: excerpt(&generated.text),
            },
            OutputRecord::Failed { error } => Self {
                item: output.paired_item.item,
                status: "error".red().to_string(),
                finish_reason: "-".to_string(),
                tokens: "-".to_string(),
                text: excerpt(error),
            },
        }
    }
}

#[derive(Tabled)]
struct PreviewTableRow {
    #[tabled(rename = "Item")]
    item: usize,
    #[tabled(rename = "Model")]
    model: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Contents")]
    contents: String,
}

impl From<&PreviewItem> for PreviewTableRow {
    fn from(preview: &PreviewItem) -> Self {
        match (&preview.request, &preview.error) {
            (Some(request), _) => Self {
                item: preview.item,
                model: request.model.clone(),
                location: request.endpoint.location.clone(),
                host: request.endpoint.host(),
                contents: format!("{} message(s)", request.contents.len()),
            },
            (None, error) => Self {
                item: preview.item,
                model: "-".to_string(),
                location: "-".to_string(),
                host: "-".to_string(),
                contents: excerpt(error.as_deref().unwrap_or("unknown error")).red().to_string(),
            },
        }
    }
}

#[derive(Tabled)]
struct CatalogTableRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Default")]
    default: String,
}

impl CatalogTableRow {
    fn new(id: &str, name: &str, default_id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            default: if id == default_id { "*".to_string() } else { String::new() },
        }
    }
}
