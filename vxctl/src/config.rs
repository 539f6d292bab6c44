//! Configuration management for vxctl

use crate::cli::{Cli, OutputFormat};
use crate::error::CliError;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vertexflow_connector_vertex::VertexConfig;
use vertexflow_core::types::{VertexCredentials, DEFAULT_REGION};

/// Configuration for the vxctl CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VxctlConfig {
    /// Google Cloud project ID
    pub project_id: Option<String>,
    /// Vertex AI region
    pub region: String,
    /// Inline service account key JSON
    pub service_account_key: Option<String>,
    /// Path to a service account key file
    pub service_account_key_file: Option<PathBuf>,
    /// Request timeout in seconds
    pub timeout: u64,
    /// Record failed items instead of aborting the batch
    pub continue_on_fail: bool,
    /// API origin override
    pub api_base: Option<String>,
    /// Output format
    pub output: OutputFormat,
}

impl Default for VxctlConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            region: DEFAULT_REGION.to_string(),
            service_account_key: None,
            service_account_key_file: None,
            timeout: 60,
            continue_on_fail: false,
            api_base: None,
            output: OutputFormat::Table,
        }
    }
}

impl VxctlConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: &Option<PathBuf>) -> Result<Self, CliError> {
        let mut figment = Figment::new();

        let default_config_paths = ["vxctl.yaml", "vxctl.yml", ".vxctl.yaml", ".vxctl.yml"];

        for path in &default_config_paths {
            if Path::new(path).exists() {
                figment = figment.merge(Yaml::file(path));
                break;
            }
        }

        if let Some(path) = config_path {
            if path.exists() {
                figment = figment.merge(Yaml::file(path));
            } else {
                return Err(CliError::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
        }

        // VXCTL_PROJECT_ID, VXCTL_SERVICE_ACCOUNT_KEY_FILE, ...
        figment = figment.merge(Env::prefixed("VXCTL_"));

        figment
            .extract()
            .map_err(|e| CliError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Apply CLI argument overrides to the configuration
    pub fn with_overrides(mut self, args: &Cli) -> Self {
        if let Some(ref project) = args.project {
            self.project_id = Some(project.clone());
        }

        if let Some(ref region) = args.region {
            self.region = region.clone();
        }

        if let Some(ref key_file) = args.key_file {
            self.service_account_key = None;
            self.service_account_key_file = Some(key_file.clone());
        }

        if let Some(format) = args.format {
            self.output = format;
        }

        self
    }

    /// Assemble the credential record handed to the node
    pub fn credentials(&self) -> Result<VertexCredentials, CliError> {
        let project_id = self.project_id.clone().ok_or_else(|| {
            CliError::Config(
                "No project specified. Use --project or set project_id in config".to_string(),
            )
        })?;

        let key = match (&self.service_account_key, &self.service_account_key_file) {
            (Some(inline), _) => inline.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|source| CliError::Io {
                path: path.clone(),
                source,
            })?,
            (None, None) => {
                return Err(CliError::Config(
                    "No service account key. Use --key-file or set service_account_key_file in config"
                        .to_string(),
                ))
            }
        };

        Ok(VertexCredentials::new(project_id, self.region.clone(), key))
    }

    /// Connector settings derived from this configuration
    pub fn connector_config(&self) -> VertexConfig {
        let config = VertexConfig::new().with_timeout(self.timeout.saturating_mul(1000));
        match &self.api_base {
            Some(base) => config.with_api_base(base.clone()),
            None => config,
        }
    }
}
