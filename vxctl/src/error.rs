//! Error type for vxctl

use std::path::PathBuf;
use thiserror::Error;
use vertexflow_core::errors::{ClientError, NodeError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid input file {}: {message}", path.display())]
    Input { path: PathBuf, message: String },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CliError {
    pub(crate) fn input(path: &std::path::Path, message: impl ToString) -> Self {
        CliError::Input {
            path: path.to_path_buf(),
            message: message.to_string(),
        }
    }
}
