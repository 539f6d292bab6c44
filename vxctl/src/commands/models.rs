//! Model catalog command implementation

use crate::config::VxctlConfig;
use crate::error::CliError;
use crate::output;

/// Handle models command
pub async fn handle_models_command(config: &VxctlConfig) -> Result<(), CliError> {
    output::display_catalog(&config.output)
}
