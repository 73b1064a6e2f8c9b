//! Monora - a package script runner
//!
//! Monora collects tasks from a package manifest, a local `scripts.config`
//! file and presets, resolves a task name into shell commands (running
//! `pre<name>` and `post<name>` hooks around it and forwarding trailing
//! arguments), and runs them one after another.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;

// Re-export commonly used types
pub use config::{CommandShape, Generator, TaskMap};
pub use error::{MonoraError, Result};
pub use runner::{resolve, resolve_task, Forwarding, Resolution};

/// Current version of Monora
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
