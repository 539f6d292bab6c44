//! Dry-run command implementation

use crate::cli::NodeArgs;
use crate::config::VxctlConfig;
use crate::error::CliError;
use crate::input::{load_items, TemplatedParameters};
use crate::output;
use tracing::info;
use vertexflow_core::catalog;
use vertexflow_core::execution::{self, PreviewItem};

/// Handle preview command
pub async fn handle_preview_command(args: NodeArgs, config: &VxctlConfig) -> Result<(), CliError> {
    let previews = build_previews(&args, config)?;
    output::display_previews(&previews, &config.output)
}

fn build_previews(args: &NodeArgs, config: &VxctlConfig) -> Result<Vec<PreviewItem>, CliError> {
    let credentials = config.credentials()?;
    let parameters = TemplatedParameters::load(&args.node)?;
    let items = load_items(args.input.as_deref())?;

    catalog::warn_if_unknown(parameters.model(), &credentials.region);
    info!("Building requests for {} item(s)", items.len());

    Ok(execution::preview(&credentials, &items, &parameters)?)
}
