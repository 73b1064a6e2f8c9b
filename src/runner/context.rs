//! Execution context for running resolved commands
//!
//! The context carries everything the executor needs, including the
//! environment handed to every spawned command. The process environment
//! itself is never modified.

use crate::error::{ExecutionError, ExecutionResult};
use colored::Colorize;
use std::collections::BTreeMap;
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Directory holding locally installed executables, relative to a project root
const LOCAL_BIN_DIR: &str = "node_modules/.bin";

/// File with extra environment variables in the working directory
const DOTENV_FILE: &str = ".env";

/// Execution context for a run
pub struct Context {
    /// Directory commands run in
    pub working_dir: PathBuf,

    /// Interpreter commands are passed to (e.g., ["sh", "-c"])
    pub interpreter: Vec<String>,

    /// Environment given to spawned commands
    pub env: Environment,

    /// Verbosity level
    pub verbosity: Verbosity,

    /// Print commands instead of running them
    pub dry_run: bool,
}

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            interpreter: vec!["sh".to_string(), "-c".to_string()],
            env: Environment::from_process(),
            verbosity: Verbosity::Normal,
            dry_run: false,
        }
    }

    /// Set the working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Set the environment
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Set verbosity level
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Print a command about to run
    pub fn print_command(&self, command: &str) {
        if self.verbosity >= Verbosity::Normal {
            eprintln!("{} {}", "[RUN]".green().bold(), command);
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Environment variables for spawned commands.
///
/// Names and values are kept as raw OS strings so nothing is re-encoded on
/// the way to a child process.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Environment {
    vars: BTreeMap<OsString, OsString>,
}

impl Environment {
    /// Start from an explicit set of variables
    pub fn new(vars: BTreeMap<OsString, OsString>) -> Self {
        Environment { vars }
    }

    /// Snapshot the current process environment
    pub fn from_process() -> Self {
        Environment {
            vars: env::vars_os().collect(),
        }
    }

    /// Build the environment for an invocation rooted at `cwd`.
    ///
    /// Process variables, then `.env` entries not already set, then `PATH`
    /// prefixed with local binary directories.
    pub fn for_project(cwd: &Path) -> ExecutionResult<Self> {
        Environment::from_process()
            .with_dotenv(&cwd.join(DOTENV_FILE))?
            .with_local_bins(cwd)
    }

    /// Add variables from a dotenv file; existing variables win.
    ///
    /// A missing file is not an error.
    pub fn with_dotenv(mut self, path: &Path) -> ExecutionResult<Self> {
        if !path.is_file() {
            return Ok(self);
        }

        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| ExecutionError::Environment(format!("{}: {}", path.display(), e)))?;

        for item in iter {
            let (key, value) = item
                .map_err(|e| ExecutionError::Environment(format!("{}: {}", path.display(), e)))?;
            self.vars.entry(key.into()).or_insert_with(|| value.into());
        }

        tracing::debug!(path = %path.display(), "loaded dotenv file");
        Ok(self)
    }

    /// Prefix `PATH` with every local binary directory from `cwd` up
    pub fn with_local_bins(mut self, cwd: &Path) -> ExecutionResult<Self> {
        let mut dirs = local_bin_dirs(cwd);
        if dirs.is_empty() {
            return Ok(self);
        }

        if let Some(existing) = self.get("PATH") {
            dirs.extend(env::split_paths(existing));
        }

        let joined = env::join_paths(&dirs)
            .map_err(|e| ExecutionError::Environment(format!("invalid PATH entry: {}", e)))?;
        self.vars.insert(OsString::from("PATH"), joined);
        Ok(self)
    }

    /// Set a variable
    pub fn set(&mut self, key: impl Into<OsString>, value: impl Into<OsString>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Get a variable value
    pub fn get(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.vars.get(key.as_ref()).map(OsString::as_os_str)
    }

    /// Iterate over all variables
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_os_str(), v.as_os_str()))
    }
}

/// Existing `node_modules/.bin` directories from `cwd` to the root, nearest first
pub fn local_bin_dirs(cwd: &Path) -> Vec<PathBuf> {
    cwd.ancestors()
        .map(|dir| dir.join(LOCAL_BIN_DIR))
        .filter(|dir| dir.is_dir())
        .collect()
}
