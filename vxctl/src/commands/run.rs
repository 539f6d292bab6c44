//! Batch execution command implementation

use crate::cli::RunArgs;
use crate::config::VxctlConfig;
use crate::error::CliError;
use crate::input::{load_items, TemplatedParameters};
use crate::output;
use tracing::{info, warn};
use vertexflow_connector_vertex::VertexConnector;
use vertexflow_core::catalog;
use vertexflow_core::prelude::*;

/// Handle run command
pub async fn handle_run_command(args: RunArgs, config: &VxctlConfig) -> Result<(), CliError> {
    let connector = VertexConnector::new(config.connector_config())?;
    let outputs = run_batch(connector, &args, config).await?;
    output::display_outputs(&outputs, &config.output)
}

/// Execute the node over the input items with the given client
pub(crate) async fn run_batch<C: GenerativeClient>(
    client: C,
    args: &RunArgs,
    config: &VxctlConfig,
) -> Result<Vec<NodeOutputItem>, CliError> {
    let credentials = config.credentials()?;
    let parameters = TemplatedParameters::load(&args.node.node)?;
    let items = load_items(args.node.input.as_deref())?;

    catalog::warn_if_unknown(parameters.model(), &credentials.region);

    let continue_on_fail = config.continue_on_fail || args.continue_on_fail;
    let executor = NodeExecutor::new(client).with_continue_on_fail(continue_on_fail);

    info!(
        "Running {} item(s) with {} in project {}",
        items.len(),
        parameters.model(),
        credentials.project_id
    );

    let outputs = executor.execute(&credentials, &items, &parameters).await?;

    let failed = outputs.iter().filter(|o| o.is_error()).count();
    if failed > 0 {
        warn!("{} of {} item(s) failed", failed, outputs.len());
    }

    Ok(outputs)
}
