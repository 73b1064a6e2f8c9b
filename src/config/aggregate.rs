//! Task aggregation
//!
//! Builds the single task mapping an invocation works with: manifest scripts,
//! the manifest `monora` field, inline tasks and the local config file are
//! overlaid in that order, then a preset is applied on top.

use crate::config::loader::ModuleLoader;
use crate::config::parse::{load_local_config, DEFAULT_MANAGER};
use crate::config::types::{CommandShape, TaskMap, PRESET_KEYS};
use crate::error::{ConfigError, ConfigResult};
use std::path::{self, Path, PathBuf};

/// Manifest file read from the working directory by default
pub const DEFAULT_MANIFEST: &str = "package.json";

/// Where and how to look for task definitions
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Working directory; config lookups and relative presets start here
    pub cwd: PathBuf,

    /// Package manager name used for `<manager>.scripts.*`
    pub manager: String,

    /// Manifest file name, relative to `cwd`
    pub manifest: PathBuf,

    /// Tasks supplied by the caller
    pub tasks: TaskMap,
}

impl LoadOptions {
    /// Options for a working directory with default manager and manifest
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        LoadOptions {
            cwd: cwd.into(),
            manager: DEFAULT_MANAGER.to_string(),
            manifest: PathBuf::from(DEFAULT_MANIFEST),
            tasks: TaskMap::new(),
        }
    }

    /// Set the package manager name
    pub fn with_manager(mut self, manager: impl Into<String>) -> Self {
        self.manager = manager.into();
        self
    }

    /// Set the manifest file name
    pub fn with_manifest(mut self, manifest: impl Into<PathBuf>) -> Self {
        self.manifest = manifest.into();
        self
    }

    /// Set the inline tasks
    pub fn with_tasks(mut self, tasks: TaskMap) -> Self {
        self.tasks = tasks;
        self
    }
}

/// Overlay mappings left to right; a later key replaces an earlier one whole
pub fn merge<I>(layers: I) -> TaskMap
where
    I: IntoIterator<Item = TaskMap>,
{
    let mut merged = TaskMap::new();
    for layer in layers {
        merged.extend(layer);
    }
    merged
}

/// Find the preset reference in a mapping.
///
/// `extends`, `preset` and `presets` are checked in that order and the first
/// non-empty one wins. A preset key holding anything but a string is an error.
pub fn preset_reference(tasks: &TaskMap) -> ConfigResult<Option<&str>> {
    for key in PRESET_KEYS {
        match tasks.get(*key) {
            Some(shape) if shape.is_present() => {
                return match shape {
                    CommandShape::Literal(reference) => Ok(Some(reference.as_str())),
                    _ => Err(ConfigError::PresetMalformed((*key).to_string())),
                };
            }
            _ => continue,
        }
    }
    Ok(None)
}

/// Turn a preset reference into a module identifier.
///
/// References starting with `.` are paths relative to `cwd`; anything else
/// is passed to the loader as a bare identifier.
pub fn preset_identifier(reference: &str, cwd: &Path) -> String {
    if reference.starts_with('.') {
        cwd.join(reference).to_string_lossy().into_owned()
    } else {
        reference.to_string()
    }
}

/// Overlay the referenced preset, if any.
///
/// Preset tasks replace tasks of the same name already in the mapping.
pub fn apply_preset(
    tasks: TaskMap,
    cwd: &Path,
    loader: &dyn ModuleLoader,
) -> ConfigResult<TaskMap> {
    let identifier = match preset_reference(&tasks)? {
        Some(reference) => preset_identifier(reference, cwd),
        None => return Ok(tasks),
    };

    tracing::debug!(preset = %identifier, "applying preset");

    let preset = loader
        .load_module(&identifier)
        .map_err(|e| ConfigError::PresetUnresolved {
            identifier: identifier.clone(),
            error: e.to_string(),
        })?;

    Ok(merge([tasks, preset]))
}

/// Build the task mapping for an invocation.
///
/// The manifest is mandatory; the local config layer is optional. A relative
/// `cwd` is taken against the process working directory first.
pub fn load_tasks(options: &LoadOptions, loader: &dyn ModuleLoader) -> ConfigResult<TaskMap> {
    let cwd = path::absolute(&options.cwd).map_err(|e| ConfigError::WorkingDir {
        path: options.cwd.clone(),
        error: e.to_string(),
    })?;

    let manifest = loader.load_manifest(&cwd.join(&options.manifest))?;
    let local = load_local_config(&cwd, &options.manager, loader);

    let merged = merge([manifest.scripts, manifest.tasks, options.tasks.clone(), local]);
    tracing::debug!(count = merged.len(), "merged task definitions");

    apply_preset(merged, &cwd, loader)
}
