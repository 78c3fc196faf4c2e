use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use action_expr::{Context, DynamicValue, EvalError, Evaluator};
use clap::{Parser, Subcommand};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Check and expand `${{ ... }}` expressions in text.
#[derive(Parser, Debug)]
#[command(name = "axpr", author, version, about)]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report syntax errors in every span, without evaluating.
    Validate {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
    },
    /// Evaluate every span and print the result.
    Interpolate {
        /// Input file; stdin when omitted.
        file: Option<PathBuf>,
        /// JSON file whose top-level keys are the scopes (git, job, ...).
        #[arg(long)]
        context: Option<PathBuf>,
        /// Inline JSON context, merged over --context.
        #[arg(long)]
        context_json: Option<String>,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("reading stdin: {0}")]
    Stdin(io::Error),
    #[error("invalid context JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(cli.command) {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(command: Command) -> Result<String, CliError> {
    match command {
        Command::Validate { file } => {
            let text = read_input(file.as_deref())?;
            action_expr::validate(&text)?;
            Ok("ok".to_string())
        }
        Command::Interpolate { file, context, context_json } => {
            let text = read_input(file.as_deref())?;
            let ctx = load_context(context.as_deref(), context_json.as_deref())?;
            debug!(scopes = ?ctx.scope_names().collect::<Vec<_>>(), "context loaded");
            let value = Evaluator::with_builtins(ctx).interpolate(&text)?;
            Ok(match value {
                DynamicValue::String(s) => s,
                other => other.to_json_pretty(),
            })
        }
    }
}

fn read_input(file: Option<&Path>) -> Result<String, CliError> {
    match file {
        Some(path) => fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        }),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).map_err(CliError::Stdin)?;
            Ok(buf)
        }
    }
}

/// `--context` file first, then `--context-json` scopes on top.
fn load_context(file: Option<&Path>, inline: Option<&str>) -> Result<Context, CliError> {
    let mut scopes = serde_json::Map::new();
    if let Some(path) = file {
        let text = fs::read_to_string(path).map_err(|source| CliError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        merge_object(&mut scopes, serde_json::from_str(&text)?)?;
    }
    if let Some(inline) = inline {
        merge_object(&mut scopes, serde_json::from_str(inline)?)?;
    }
    Ok(Context::from_json(Value::Object(scopes))?)
}

fn merge_object(into: &mut serde_json::Map<String, Value>, value: Value) -> Result<(), CliError> {
    match value {
        Value::Object(map) => {
            into.extend(map);
            Ok(())
        }
        // let Context::from_json report the shape error
        other => Context::from_json(other).map(|_| ()).map_err(CliError::from),
    }
}
