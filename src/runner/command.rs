//! Command execution
//!
//! This module runs resolved shell commands, one after another.

use crate::error::{ExecutionError, ExecutionResult};
use crate::runner::{signal, Context};
use std::process::{Command as StdCommand, Stdio};

/// Run commands in order, stopping at the first failure
pub fn execute_commands(commands: &[String], ctx: &Context) -> ExecutionResult<()> {
    for command in commands {
        execute_command(command, ctx)?;
    }
    Ok(())
}

/// Execute a single command in the given context.
///
/// Nothing is launched once a forwarded signal has been received.
pub fn execute_command(command: &str, ctx: &Context) -> ExecutionResult<()> {
    if ctx.dry_run {
        println!("{}", command);
        return Ok(());
    }

    if let Some(signal) = signal::received() {
        return Err(ExecutionError::Interrupted { signal });
    }

    ctx.print_command(command);

    let (program, interpreter_args) = ctx
        .interpreter
        .split_first()
        .ok_or_else(|| ExecutionError::Environment("interpreter is empty".to_string()))?;

    let mut child = StdCommand::new(program);
    child
        .args(interpreter_args)
        .arg(command)
        .current_dir(&ctx.working_dir)
        .env_clear()
        .envs(ctx.env.iter())
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let spawn_error = |e: std::io::Error| ExecutionError::Spawn {
        command: command.to_string(),
        error: e.to_string(),
    };
    let status = signal::spawn(&mut child)
        .and_then(|running| running.wait())
        .map_err(spawn_error)?;

    if let Some(signal) = signal::received() {
        tracing::debug!(command, %signal, "command interrupted");
        return Err(ExecutionError::Interrupted { signal });
    }

    if !status.success() {
        tracing::debug!(command, code = ?status.code(), "command failed");
        return Err(ExecutionError::CommandFailed {
            command: command.to_string(),
            code: status.code(),
        });
    }

    Ok(())
}
