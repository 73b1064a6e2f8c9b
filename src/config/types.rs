//! Core configuration types
//!
//! This module defines the command shapes a task can take and the raw
//! representation they are parsed from.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::sync::Arc;

/// Mapping from task name to its command shape
pub type TaskMap = BTreeMap<String, CommandShape>;

/// Keys that name a preset instead of a runnable task, in lookup order
pub const PRESET_KEYS: &[&str] = &["extends", "preset", "presets"];

/// Keys never shown when listing tasks
pub const RESERVED_KEYS: &[&str] = &["start", "extends", "preset", "presets"];

/// Signature of a generator function
pub type GeneratorFn =
    dyn Fn(&TaskMap, &[String]) -> anyhow::Result<Option<CommandShape>> + Send + Sync;

/// What a task resolves to
#[derive(Clone)]
pub enum CommandShape {
    /// A single shell command line
    Literal(String),

    /// Shapes flattened in order
    Sequence(Vec<CommandShape>),

    /// A function producing a shape at resolution time
    Generator(Generator),
}

impl CommandShape {
    /// Build a literal shape
    pub fn literal(cmd: impl Into<String>) -> Self {
        CommandShape::Literal(cmd.into())
    }

    /// Build a sequence of literal shapes
    pub fn sequence<I, S>(cmds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandShape::Sequence(cmds.into_iter().map(CommandShape::literal).collect())
    }

    /// Whether the shape counts as defined.
    ///
    /// Only an empty literal is considered absent; sequences and generators
    /// always count, even when they end up producing nothing.
    pub fn is_present(&self) -> bool {
        match self {
            CommandShape::Literal(cmd) => !cmd.is_empty(),
            CommandShape::Sequence(_) | CommandShape::Generator(_) => true,
        }
    }

    /// The literal text, if this shape is a literal
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            CommandShape::Literal(cmd) => Some(cmd),
            _ => None,
        }
    }
}

impl fmt::Debug for CommandShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandShape::Literal(cmd) => f.debug_tuple("Literal").field(cmd).finish(),
            CommandShape::Sequence(items) => f.debug_tuple("Sequence").field(items).finish(),
            CommandShape::Generator(generator) => {
                f.debug_tuple("Generator").field(&generator.label).finish()
            }
        }
    }
}

impl PartialEq for CommandShape {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CommandShape::Literal(a), CommandShape::Literal(b)) => a == b,
            (CommandShape::Sequence(a), CommandShape::Sequence(b)) => a == b,
            (CommandShape::Generator(a), CommandShape::Generator(b)) => {
                Arc::ptr_eq(&a.func, &b.func)
            }
            _ => false,
        }
    }
}

impl From<&str> for CommandShape {
    fn from(cmd: &str) -> Self {
        CommandShape::literal(cmd)
    }
}

impl From<String> for CommandShape {
    fn from(cmd: String) -> Self {
        CommandShape::Literal(cmd)
    }
}

impl From<Vec<CommandShape>> for CommandShape {
    fn from(items: Vec<CommandShape>) -> Self {
        CommandShape::Sequence(items)
    }
}

impl From<Generator> for CommandShape {
    fn from(generator: Generator) -> Self {
        CommandShape::Generator(generator)
    }
}

/// A lazily evaluated command shape
#[derive(Clone)]
pub struct Generator {
    /// Name used in logs and errors
    pub label: String,
    func: Arc<GeneratorFn>,
}

impl Generator {
    /// Wrap a function as a generator
    pub fn new<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&TaskMap, &[String]) -> anyhow::Result<Option<CommandShape>>
            + Send
            + Sync
            + 'static,
    {
        Generator {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    /// A generator backed by a shell script.
    ///
    /// The script runs under `sh -c` in `dir`, receives the remaining args as
    /// positional parameters and the task names in `MONORA_TASKS`. Every
    /// non-empty line it prints becomes one command.
    pub fn shell(script: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        let script = script.into();
        let dir = dir.into();
        let label = script.clone();

        Generator::new(label, move |tasks, args| {
            let names: Vec<&str> = tasks.keys().map(String::as_str).collect();
            let output = StdCommand::new("sh")
                .arg("-c")
                .arg(&script)
                .arg("monora")
                .args(args)
                .current_dir(&dir)
                .env("MONORA_TASKS", names.join(" "))
                .stdin(Stdio::null())
                .stderr(Stdio::inherit())
                .output()?;

            if !output.status.success() {
                anyhow::bail!("script exited with {:?}", output.status.code());
            }

            let stdout = String::from_utf8(output.stdout)?;
            let lines: Vec<&str> = stdout
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();

            if lines.is_empty() {
                Ok(None)
            } else {
                Ok(Some(CommandShape::sequence(lines)))
            }
        })
    }

    /// Invoke the generator
    pub fn call(
        &self,
        tasks: &TaskMap,
        args: &[String],
    ) -> anyhow::Result<Option<CommandShape>> {
        (self.func)(tasks, args)
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator").field("label", &self.label).finish()
    }
}

/// A command shape as written in a config file
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawShape {
    /// Single command line
    Literal(String),

    /// List of shapes
    Sequence(Vec<RawShape>),

    /// Shell script whose output lines are the commands
    Generator { generate: String },

    /// `null`, contributes nothing
    Nothing(()),
}

impl RawShape {
    /// Convert into a command shape, anchoring generators at `base_dir`
    pub fn into_shape(self, base_dir: &Path) -> CommandShape {
        match self {
            RawShape::Literal(cmd) => CommandShape::Literal(cmd),
            RawShape::Sequence(items) => CommandShape::Sequence(
                items.into_iter().map(|item| item.into_shape(base_dir)).collect(),
            ),
            RawShape::Generator { generate } => {
                CommandShape::Generator(Generator::shell(generate, base_dir))
            }
            RawShape::Nothing(()) => CommandShape::Sequence(Vec::new()),
        }
    }
}

/// A task mapping as written in a config file
pub type RawTaskMap = BTreeMap<String, RawShape>;

/// Convert a raw mapping into a task mapping
pub fn into_task_map(raw: RawTaskMap, base_dir: &Path) -> TaskMap {
    raw.into_iter()
        .map(|(name, shape)| (name, shape.into_shape(base_dir)))
        .collect()
}

/// The fields of a package manifest that declare tasks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    /// The `scripts` field
    pub scripts: TaskMap,

    /// The `monora` field
    pub tasks: TaskMap,
}

/// Manifest as parsed from disk; every other field is ignored
#[derive(Debug, Default, Deserialize)]
pub struct RawManifest {
    #[serde(default)]
    pub scripts: RawTaskMap,

    #[serde(default, rename = "monora")]
    pub tasks: RawTaskMap,
}

impl RawManifest {
    pub fn into_manifest(self, base_dir: &Path) -> Manifest {
        Manifest {
            scripts: into_task_map(self.scripts, base_dir),
            tasks: into_task_map(self.tasks, base_dir),
        }
    }
}
