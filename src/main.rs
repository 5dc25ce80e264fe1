//! Binary entry point for the phpshift CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Rename a class everywhere under src/
//! phpshift --mode conservative rename-class Foo Bar src/
//!
//! # Rename Foo::bar to Foo::baz, applying low-confidence edits too
//! phpshift --mode aggressive rename-method Foo bar baz src/
//!
//! # Move a file and rewrite the includes that name it
//! phpshift rename-file lib/stuff.php lib/things.php .
//! ```

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use phpshift::config::Config;
use phpshift::run::{run, RunOptions};
use phpshift_core::edit::EditMode;
use phpshift_core::error::{OutputErrorCode, ShiftError};
use phpshift_core::output::{emit_response, ErrorResponse};
use phpshift_php::Refactoring;

// ============================================================================
// CLI Structure
// ============================================================================

/// Type-aware class, method and file renaming for PHP codebases.
#[derive(Parser, Debug)]
#[command(name = "phpshift", version, about = "Type-aware renaming for PHP codebases")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Which edits to apply (default: from config, else conservative).
    #[arg(long, global = true, value_enum)]
    mode: Option<ModeArg>,

    /// Output format for the run report.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Configuration file (default: phpshift.toml in the current directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

/// Edit mode as accepted on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    /// Apply nothing; report every possible change.
    Timid,
    /// Apply high-confidence changes; report the rest.
    Conservative,
    /// Apply every change.
    Aggressive,
}

impl From<ModeArg> for EditMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Timid => EditMode::Timid,
            ModeArg::Conservative => EditMode::Conservative,
            ModeArg::Aggressive => EditMode::Aggressive,
        }
    }
}

/// Output format for the run report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary (default).
    #[default]
    Text,
    /// Full JSON response.
    Json,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rename a class, interface or trait.
    #[command(name = "rename-class")]
    RenameClass {
        /// Current class name.
        old: String,
        /// New class name.
        new: String,
        /// Files and directories to scan.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Rename a method of a class and its subclasses.
    #[command(name = "rename-method")]
    RenameMethod {
        /// Class declaring the method.
        class: String,
        /// Current method name.
        old: String,
        /// New method name.
        new: String,
        /// Files and directories to scan.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Move a file and rewrite include statements that name it.
    #[command(name = "rename-file")]
    RenameFile {
        /// Current path of the file.
        old: PathBuf,
        /// New path of the file.
        new: PathBuf,
        /// Files and directories to scan.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

impl Command {
    fn into_parts(self) -> (Refactoring, Vec<PathBuf>) {
        match self {
            Command::RenameClass { old, new, paths } => (Refactoring::RenameClass { old, new }, paths),
            Command::RenameMethod {
                class,
                old,
                new,
                paths,
            } => (Refactoring::RenameMethod { class, old, new }, paths),
            Command::RenameFile { old, new, paths } => (Refactoring::RenameFile { old, new }, paths),
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    let format = cli.global.format;
    match execute(cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            match format {
                OutputFormat::Json => {
                    let _ = emit_response(&ErrorResponse::new(&err), &mut io::stdout());
                    let _ = io::stdout().flush();
                }
                OutputFormat::Text => eprintln!("phpshift: {}", err),
            }
            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Resolve options, run the refactoring and print the report.
fn execute(cli: Cli) -> Result<u8, ShiftError> {
    let config = match &cli.global.config {
        Some(path) => Config::load(path)?,
        None => {
            let cwd = std::env::current_dir().map_err(|e| ShiftError::internal(e.to_string()))?;
            Config::load_from_dir(&cwd)?
        }
    };
    let (refactoring, paths) = cli.command.into_parts();
    let options = resolve_options(&cli.global, config, paths);

    let response = run(&refactoring, &options)?;
    let mut stdout = io::stdout();
    let written = match cli.global.format {
        OutputFormat::Json => emit_response(&response, &mut stdout),
        OutputFormat::Text => response.report.write_text(&mut stdout),
    };
    written.map_err(|e| ShiftError::internal(format!("failed to write report: {}", e)))?;
    Ok(response.report.exit_code())
}

/// Merge flags over configuration: flag, then config file, then default.
fn resolve_options(global: &GlobalArgs, config: Config, paths: Vec<PathBuf>) -> RunOptions {
    let mode = global
        .mode
        .map(EditMode::from)
        .or(config.phpshift.mode)
        .unwrap_or_default();
    RunOptions {
        edit_mode: Some(mode),
        paths,
        extensions: config.phpshift.extensions,
        exclude: config.phpshift.exclude,
    }
}

// ============================================================================
// Tests
// ============================================================================
