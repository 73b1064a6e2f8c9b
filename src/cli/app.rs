//! Main CLI application

use crate::cli::completion::print_completions;
use crate::config::{
    load_tasks, FsLoader, LoadOptions, ModuleLoader, TaskMap, DEFAULT_MANAGER, DEFAULT_MANIFEST,
};
use crate::error::{ExecutionError, MonoraError};
use crate::runner::{
    execute_commands, listable_names, resolve, signal, Context, Environment, Forwarding,
    Resolution, Verbosity,
};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use clap_complete::Shell;
use colored::Colorize;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Banner printed above the task listing
const LISTING_BANNER: &str = "Available scripts, choose one:";

/// Settings parsed from the command line
#[derive(Debug, Clone)]
pub struct Settings {
    /// Absolute working directory
    pub cwd: PathBuf,

    /// Package manager name
    pub manager: String,

    /// Manifest file name
    pub manifest: PathBuf,

    /// Which commands receive trailing arguments
    pub forwarding: Forwarding,

    /// Print commands instead of running them
    pub dry_run: bool,

    /// Output level
    pub verbosity: Verbosity,

    /// Task name followed by its arguments
    pub argv: Vec<String>,

    /// Print a completion script for this shell and exit
    pub completions: Option<Shell>,
}

/// CLI application
pub struct App {
    settings: Settings,
    loader: Box<dyn ModuleLoader>,
}

impl App {
    /// Create the app from the process arguments
    pub fn new() -> Result<Self, MonoraError> {
        Self::from_args(env::args_os())
    }

    /// Create the app from explicit arguments (the first one is the binary name)
    pub fn from_args<I, T>(args: I) -> Result<Self, MonoraError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = build_command().get_matches_from(args);
        let settings = parse_settings(&matches)?;

        let loader = Box::new(FsLoader::for_project(&settings.cwd));
        Ok(App { settings, loader })
    }

    /// Replace the module loader
    pub fn with_loader(mut self, loader: Box<dyn ModuleLoader>) -> Self {
        self.loader = loader;
        self
    }

    /// Parsed settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Run the application
    pub fn run(self) -> Result<(), MonoraError> {
        let settings = &self.settings;

        if let Some(shell) = settings.completions {
            print_completions(shell, &mut build_command());
            return Ok(());
        }

        init_logging(settings.verbosity);

        let options = LoadOptions::new(settings.cwd.clone())
            .with_manager(settings.manager.clone())
            .with_manifest(settings.manifest.clone());
        let tasks = load_tasks(&options, self.loader.as_ref())?;

        match resolve(&tasks, &settings.argv, settings.forwarding)? {
            Resolution::Listing(tasks) => {
                print_listing(&tasks);
                Ok(())
            }
            Resolution::Commands(commands) => {
                let ctx = Context::new()
                    .with_working_dir(settings.cwd.clone())
                    .with_env(Environment::for_project(&settings.cwd)?)
                    .with_verbosity(settings.verbosity)
                    .with_dry_run(settings.dry_run);

                if !settings.dry_run {
                    signal::install()
                        .map_err(|e| ExecutionError::Environment(e.to_string()))?;
                }
                execute_commands(&commands, &ctx)?;
                Ok(())
            }
        }
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("monora")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Run package scripts with pre/post hooks, presets and argument forwarding")
        .arg(
            Arg::new("cwd")
                .short('C')
                .long("cwd")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))
                .help("Directory to load tasks from and run them in"),
        )
        .arg(
            Arg::new("manager")
                .short('m')
                .long("manager")
                .value_name("NAME")
                .env("MONORA_MANAGER")
                .default_value(DEFAULT_MANAGER)
                .help("Package manager name used for <NAME>.scripts config files"),
        )
        .arg(
            Arg::new("manifest")
                .long("manifest")
                .value_name("FILE")
                .value_parser(value_parser!(PathBuf))
                .default_value(DEFAULT_MANIFEST)
                .help("Manifest file holding `scripts` and `monora` fields"),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Forward arguments to the last resolved command only")
                .action(ArgAction::SetTrue)
                .conflicts_with("no-forward"),
        )
        .arg(
            Arg::new("no-forward")
                .long("no-forward")
                .help("Never forward arguments to declared tasks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dry-run")
                .short('n')
                .long("dry-run")
                .help("Print the resolved commands without running them")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print command output and errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("completions")
                .long("completions")
                .value_name("SHELL")
                .value_parser(value_parser!(Shell))
                .help("Print a shell completion script"),
        )
        .arg(
            Arg::new("argv")
                .value_name("TASK")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .help("Task to run, followed by arguments forwarded to it"),
        )
}

/// Turn matches into settings
pub fn parse_settings(matches: &ArgMatches) -> Result<Settings, MonoraError> {
    let current = env::current_dir()?;
    let cwd = match matches.get_one::<PathBuf>("cwd") {
        Some(dir) => fs::canonicalize(current.join(dir))?,
        None => current,
    };

    Ok(Settings {
        cwd,
        manager: matches
            .get_one::<String>("manager")
            .cloned()
            .unwrap_or_else(|| DEFAULT_MANAGER.to_string()),
        manifest: matches
            .get_one::<PathBuf>("manifest")
            .cloned()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST)),
        forwarding: get_forwarding(matches),
        dry_run: matches.get_flag("dry-run"),
        verbosity: get_verbosity(matches),
        argv: matches
            .get_many::<String>("argv")
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        completions: matches.get_one::<Shell>("completions").copied(),
    })
}

/// Get forwarding mode from matches
fn get_forwarding(matches: &ArgMatches) -> Forwarding {
    if matches.get_flag("strict") {
        Forwarding::Last
    } else if matches.get_flag("no-forward") {
        Forwarding::Off
    } else {
        Forwarding::Broadcast
    }
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Set up diagnostics on stderr; `RUST_LOG` overrides the verbosity default
pub fn init_logging(verbosity: Verbosity) {
    let level = match verbosity {
        Verbosity::Silent => "off",
        Verbosity::Quiet | Verbosity::Normal => "warn",
        Verbosity::Verbose => "debug",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Already initialised when the app runs more than once in a process
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .try_init();
}

/// Print the tasks a user can run
pub fn print_listing(tasks: &TaskMap) {
    println!("{}", LISTING_BANNER.bold());
    for name in listable_names(tasks) {
        println!("- {}", name);
    }
}

/// Report a failure on stderr.
///
/// Failed commands have already spoken for themselves, and nothing is printed
/// below quiet verbosity.
pub fn report_error(err: &MonoraError, verbosity: Verbosity) {
    if verbosity >= Verbosity::Quiet && !err.is_command_failure() {
        eprintln!("Error: {}", err);
    }
}

/// Run the CLI application with the process arguments, reporting any failure
pub fn run() -> Result<(), MonoraError> {
    let app = App::new().inspect_err(|e| report_error(e, Verbosity::Normal))?;
    let verbosity = app.settings().verbosity;
    app.run().inspect_err(|e| report_error(e, verbosity))
}
