//! Task resolution and execution
//!
//! This module turns a task name into shell commands and runs them in order.

pub mod command;
pub mod context;
pub mod resolve;
pub mod signal;

// Re-export main types
pub use command::*;
pub use context::*;
pub use resolve::*;
