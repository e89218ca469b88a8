use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VersyncError {
    #[error("versions registry not found at {0}")]
    RegistryNotFound(PathBuf),

    #[error("invalid registry syntax at line {line}: {reason}")]
    RegistryParse { line: usize, reason: String },

    #[error("no registry value for key '{0}'")]
    KeyNotFound(String),

    #[error("failed to install {tool}: {reason}")]
    InstallFailed { tool: String, reason: String },

    #[error("package index query failed for {package}: {reason}")]
    IndexQuery { package: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, VersyncError>;
