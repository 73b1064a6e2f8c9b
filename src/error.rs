//! Error types for Monora

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Monora operations
pub type Result<T> = std::result::Result<T, MonoraError>;

/// Main error type for Monora
#[derive(Error, Debug)]
pub enum MonoraError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task resolution errors
    #[error("Resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// Task execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MonoraError {
    /// Whether this error is a shell command exiting unsuccessfully.
    ///
    /// The command has already reported on its own stderr, so the CLI stays quiet.
    pub fn is_command_failure(&self) -> bool {
        matches!(
            self,
            MonoraError::Execution(ExecutionError::CommandFailed { .. })
        )
    }
}

/// Configuration loading and preset errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Module '{0}' could not be found")]
    NotFound(String),

    #[error("Failed to load '{identifier}': {error}")]
    Load { identifier: String, error: String },

    #[error("Failed to load manifest '{path}': {error}")]
    Manifest { path: PathBuf, error: String },

    #[error("Preset reference under '{0}' must be a single string")]
    PresetMalformed(String),

    #[error("Preset '{identifier}' could not be resolved: {error}")]
    PresetUnresolved { identifier: String, error: String },

    #[error("Working directory '{path}' is unusable: {error}")]
    WorkingDir { path: PathBuf, error: String },
}

/// Errors raised while flattening a task into commands
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Generator '{label}' failed: {source}")]
    Generator {
        label: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Task execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command `{command}` failed with exit code {code:?}")]
    CommandFailed { command: String, code: Option<i32> },

    #[error("Failed to spawn `{command}`: {error}")]
    Spawn { command: String, error: String },

    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Interrupted by {signal}")]
    Interrupted { signal: String },
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for resolution operations
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
