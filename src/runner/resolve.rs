//! Task resolution
//!
//! Turns a task name and the trailing command-line arguments into the ordered
//! list of shell commands to run: `pre<name>` hook, the task itself (or the
//! name as a command when undeclared), `post<name>` hook, each flattened and
//! with the arguments forwarded according to [`Forwarding`].

use crate::config::{CommandShape, TaskMap, RESERVED_KEYS};
use crate::error::{ResolveError, ResolveResult};

/// Which resolved commands receive the trailing arguments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Forwarding {
    /// Every command of a declared task gets the arguments
    #[default]
    Broadcast,

    /// Only the last command gets the arguments
    Last,

    /// Declared tasks never get the arguments
    Off,
}

/// Result of resolving a command line
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// No task was named; the full mapping for listing
    Listing(TaskMap),

    /// Commands to run, in order
    Commands(Vec<String>),
}

/// Split the task name from the arguments that follow it
pub fn split_first(argv: &[String]) -> Option<(&str, &[String])> {
    argv.split_first().map(|(name, rest)| (name.as_str(), rest))
}

/// Resolve a command line against a task mapping.
///
/// An empty `argv` yields [`Resolution::Listing`].
pub fn resolve(
    tasks: &TaskMap,
    argv: &[String],
    forwarding: Forwarding,
) -> ResolveResult<Resolution> {
    match split_first(argv) {
        Some((name, args)) => {
            resolve_task(tasks, name, args, forwarding).map(Resolution::Commands)
        }
        None => Ok(Resolution::Listing(tasks.clone())),
    }
}

/// Resolve a single task with its hooks into shell commands
pub fn resolve_task(
    tasks: &TaskMap,
    name: &str,
    args: &[String],
    forwarding: Forwarding,
) -> ResolveResult<Vec<String>> {
    let pre = declared(tasks, &format!("pre{}", name));
    let cmd = declared(tasks, name);
    let post = declared(tasks, &format!("post{}", name));

    let fallback = cmd
        .is_none()
        .then(|| CommandShape::Literal(append_args(name, args)));
    let main = cmd.or(fallback.as_ref());

    let mut commands = Vec::new();
    for shape in [pre, main, post].into_iter().flatten() {
        flatten(shape, tasks, args, &mut commands)?;
    }
    commands.retain(|command| !command.is_empty());

    tracing::debug!(task = name, declared = cmd.is_some(), ?commands, "resolved task");

    let last = commands.len().saturating_sub(1);
    let is_declared = cmd.is_some();
    Ok(commands
        .into_iter()
        .enumerate()
        .map(|(i, command)| {
            let forward = match forwarding {
                Forwarding::Broadcast => is_declared,
                Forwarding::Last => i == last,
                Forwarding::Off => false,
            };
            if forward {
                append_args(&command, args)
            } else {
                command
            }
        })
        .collect())
}

/// A task counts as declared when present and not an empty literal
fn declared<'a>(tasks: &'a TaskMap, key: &str) -> Option<&'a CommandShape> {
    tasks.get(key).filter(|shape| shape.is_present())
}

/// Flatten a shape into `acc`, left to right.
///
/// Generators are called with the mapping and the trailing arguments; their
/// result is flattened too unless it is another generator, which is ignored.
pub fn flatten(
    shape: &CommandShape,
    tasks: &TaskMap,
    args: &[String],
    acc: &mut Vec<String>,
) -> ResolveResult<()> {
    match shape {
        CommandShape::Literal(command) => {
            if !command.is_empty() {
                acc.push(command.clone());
            }
        }
        CommandShape::Sequence(items) => {
            for item in items {
                flatten(item, tasks, args, acc)?;
            }
        }
        CommandShape::Generator(generator) => {
            tracing::trace!(generator = %generator.label, "calling generator");
            let produced = generator
                .call(tasks, args)
                .map_err(|source| ResolveError::Generator {
                    label: generator.label.clone(),
                    source,
                })?;

            match produced {
                Some(shape @ (CommandShape::Literal(_) | CommandShape::Sequence(_))) => {
                    flatten(&shape, tasks, args, acc)?;
                }
                Some(CommandShape::Generator(_)) | None => {}
            }
        }
    }
    Ok(())
}

/// Join a command with arguments, leaving it untouched when there are none
pub fn append_args(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        command.to_string()
    } else {
        format!("{} {}", command, args.join(" "))
    }
}

/// Task names worth showing to a user, sorted
pub fn listable_names(tasks: &TaskMap) -> Vec<&str> {
    tasks
        .keys()
        .map(String::as_str)
        .filter(|name| !RESERVED_KEYS.contains(name))
        .collect()
}
