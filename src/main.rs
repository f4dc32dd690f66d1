//! Purpose: `taskdeck` CLI entry point.
//! Role: Binary crate root; parses args, runs commands, reports errors.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::net::SocketAddr;

use clap::{Args, CommandFactory, Parser, Subcommand, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;

mod command_dispatch;
mod serve;

use taskdeck::api::{DEFAULT_MAX_PAGE_SIZE, Error, ErrorKind, StoreOptions, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint("Try `taskdeck --help`."));
            }
        },
    };

    command_dispatch::dispatch_command(cli.command)
}

#[derive(Parser)]
#[command(
    name = "taskdeck",
    version,
    about = "In-memory task records with single-use page tokens",
    long_about = None,
    after_help = r#"EXAMPLES
  $ taskdeck serve
  $ curl -s localhost:9800/v1/tasks -d '{"title": "write docs"}' -H 'content-type: application/json'
  $ curl -s 'localhost:9800/v1/tasks?page_size=10'"#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(
        about = "Serve an empty store over HTTP (loopback by default)",
        long_about = r#"Serve an in-memory task/project/label store over HTTP/JSON.

State lives only in process memory and is gone when the server exits."#,
        after_help = r#"EXAMPLES
  $ taskdeck serve
  $ taskdeck serve --bind 127.0.0.1:9801 --max-page-size 100
  $ taskdeck serve --enable-reset                  # allow POST /v1/admin/reset for test fixtures"#
    )]
    Serve(ServeArgs),
    #[command(about = "Print version info")]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ taskdeck completion bash > ~/.local/share/bash-completion/completions/taskdeck
  $ taskdeck completion zsh > ~/.zfunc/_taskdeck"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:9800", help = "Bind address")]
    bind: String,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_PAGE_SIZE,
        help = "Largest page a list call returns; bigger requests are truncated"
    )]
    max_page_size: u32,
    #[arg(
        long,
        help = "Page size used when a list call omits one (default: --max-page-size)"
    )]
    default_page_size: Option<u32>,
    #[arg(long, help = "Allow binding to a non-loopback address")]
    allow_non_loopback: bool,
    #[arg(
        long = "cors-origin",
        value_name = "ORIGIN",
        help = "Allowed browser origin (repeatable)"
    )]
    cors_origins: Vec<String>,
    #[arg(long, help = "Expose POST /v1/admin/reset to wipe all state")]
    enable_reset: bool,
    #[arg(long, default_value_t = 1024 * 1024, help = "Maximum request body size")]
    max_body_bytes: u64,
}

fn serve_config_from_args(args: ServeArgs) -> Result<serve::ServeConfig, Error> {
    let bind: SocketAddr = args.bind.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid bind address")
            .with_hint("Use a host:port value like 127.0.0.1:9800.")
    })?;
    let store = StoreOptions::new()
        .with_max_page_size(args.max_page_size)
        .with_default_page_size(args.default_page_size.unwrap_or(args.max_page_size));
    Ok(serve::ServeConfig {
        bind,
        store,
        allow_non_loopback: args.allow_non_loopback,
        cors_allowed_origins: args.cors_origins,
        enable_reset: args.enable_reset,
        max_body_bytes: args.max_body_bytes,
    })
}

fn emit_json(value: Value) {
    match serde_json::to_string_pretty(&value) {
        Ok(json) => println!("{json}"),
        Err(_) => println!("{value}"),
    }
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("taskdeck {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "taskdeck",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::InvalidArgument => "invalid argument".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::AlreadyExists => "already exists".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(name) = err.name() {
        inner.insert("name".to_string(), json!(name));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(name) = err.name() {
        lines.push(format!("name: {name}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
