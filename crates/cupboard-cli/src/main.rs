// crates/cupboard-cli/src/main.rs
// ============================================================================
// Module: Cupboard CLI Entry Point
// Description: Command-line access to a cupboard store.
// Purpose: Inspect and edit cupboard files from a shell.
// Dependencies: clap, cupboard, serde_json, thiserror, tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `cupboard` binary opens one store, runs a single mapping operation, and
//! closes it. The store is chosen by `--db`, then `--config`, then the
//! `CUPBOARD_CONFIG` environment variable. Values are read and printed as
//! compact JSON. Diagnostics go to stderr; set `CUPBOARD_LOG` to raise the
//! log level.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Parser;
use clap::Subcommand;
use cupboard::Cupboard;
use cupboard::CupboardConfig;
use cupboard::MappingStore;
use cupboard::Value;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming a TOML config file.
const CONFIG_ENV: &str = "CUPBOARD_CONFIG";
/// Environment variable holding the log filter.
const LOG_ENV: &str = "CUPBOARD_LOG";
/// Log filter used when `CUPBOARD_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "cupboard", version, disable_help_subcommand = true)]
struct Cli {
    /// TOML config file describing the store (overrides `CUPBOARD_CONFIG`).
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Store file to open directly (overrides `--config`).
    #[arg(long, value_name = "PATH")]
    db: Option<PathBuf>,
    /// Open the store in writeback mode.
    #[arg(long, action = ArgAction::SetTrue)]
    writeback: bool,
    /// Operation to run.
    #[command(subcommand)]
    command: Command,
}

/// Supported operations.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Command {
    /// Print the value stored under a key.
    Get {
        /// Key to read.
        key: String,
    },
    /// Store a JSON value under a key.
    Set {
        /// Key to write.
        key: String,
        /// Value as JSON text, e.g. `'{"a": 1}'`.
        value: String,
    },
    /// Remove a key.
    Delete {
        /// Key to remove.
        key: String,
    },
    /// Print whether a key is present.
    Contains {
        /// Key to check.
        key: String,
    },
    /// Print every key, one per line.
    Keys,
    /// Print the number of entries.
    Len,
    /// Print every entry as a `[key, value]` JSON line.
    Dump,
}

impl Command {
    /// Returns the subcommand name for logging.
    const fn name(&self) -> &'static str {
        match self {
            Self::Get {
                ..
            } => "get",
            Self::Set {
                ..
            } => "set",
            Self::Delete {
                ..
            } => "delete",
            Self::Contains {
                ..
            } => "contains",
            Self::Keys => "keys",
            Self::Len => "len",
            Self::Dump => "dump",
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<cupboard::CupboardError> for CliError {
    fn from(err: cupboard::CupboardError) -> Self {
        Self::new(err.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Opens the selected store, runs the command, and closes the store.
fn run(cli: Cli) -> CliResult<()> {
    let config = resolve_config(
        cli.db,
        cli.config,
        std::env::var_os(CONFIG_ENV),
        cli.writeback,
    )?;
    debug!(
        path = %config.path.display(),
        command = cli.command.name(),
        "running cupboard command"
    );
    let mut db = Cupboard::open(config)?;
    let outcome = execute(&mut db, &cli.command);
    let closed = db.close().map_err(CliError::from);
    outcome.and(closed)
}

/// Runs a single command against an open store.
fn execute(db: &mut Cupboard, command: &Command) -> CliResult<()> {
    match command {
        Command::Get {
            key,
        } => {
            let value = db.get(key)?;
            let rendered = value
                .try_borrow()
                .map_err(|_| CliError::new(format!("value for {key} is in use")))?
                .to_string();
            write_line(&rendered)
        }
        Command::Set {
            key,
            value,
        } => db.set(key, parse_value(value)?).map_err(CliError::from),
        Command::Delete {
            key,
        } => db.delete(key).map_err(CliError::from),
        Command::Contains {
            key,
        } => write_line(&db.contains(key)?.to_string()),
        Command::Keys => {
            for key in db.keys()? {
                write_line(&key?)?;
            }
            Ok(())
        }
        Command::Len => write_line(&db.size()?.to_string()),
        Command::Dump => {
            for item in db.items()? {
                write_line(&render_entry(item?))?;
            }
            Ok(())
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Picks the store configuration: explicit path, config file, then env.
fn resolve_config(
    db: Option<PathBuf>,
    config: Option<PathBuf>,
    env_config: Option<OsString>,
    writeback: bool,
) -> CliResult<CupboardConfig> {
    let resolved = if let Some(path) = db {
        CupboardConfig::new(path)
    } else if let Some(path) = config.or_else(|| env_config.map(PathBuf::from)) {
        CupboardConfig::load(&path).map_err(|err| {
            CliError::new(format!("failed to load config {}: {err}", path.display()))
        })?
    } else {
        return Err(CliError::new(format!(
            "no store selected: pass --db or --config, or set {CONFIG_ENV}"
        )));
    };
    let writeback = resolved.writeback || writeback;
    Ok(resolved.with_writeback(writeback))
}

/// Parses a JSON command-line argument into a storable value.
fn parse_value(text: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| CliError::new(format!("invalid JSON value: {err}")))?;
    value.validate()?;
    Ok(value)
}

/// Renders one entry as a `[key, value]` JSON line.
fn render_entry((key, value): (String, Value)) -> String {
    Value::Sequence(vec![Value::Text(key), value]).to_string()
}

/// Installs the stderr log subscriber.
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
        .map_err(|err| CliError::new(format!("failed to write to stdout: {err}")))
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
