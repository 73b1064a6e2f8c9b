//! Configuration loading and aggregation
//!
//! This module finds task definitions in manifests, local config files and
//! presets, and merges them into a single task mapping.

pub mod aggregate;
pub mod loader;
pub mod parse;
pub mod types;

// Re-export main types
pub use aggregate::*;
pub use loader::*;
pub use parse::*;
pub use types::*;
