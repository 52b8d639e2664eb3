//! `sqlkw`: connect and run a single keyword from the command line.
//!
//! ```text
//! sqlkw --url sqlite:///tmp/demo.db "Execute Sql Script" schema.sql
//! sqlkw --profile pg.json Query "SELECT {0} FROM users" name
//! sqlkw "Connect To Db" 127.0.0.1 5432 app user secret postgresql
//! ```
//!
//! Arguments of the form `name=value` are passed as named arguments, everything else
//! positionally. The keyword's result is printed to stdout as JSON.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::{Parser, ValueEnum};
use sql_keywords::SqlKeywordError;
use sql_keywords::config::ConnectParams;
use sql_keywords::keywords::{KeywordArgs, KeywordLibrary};
use tracing::{Level, debug};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a database keyword from the command line")]
struct Args {
    /// Connection URL to open before running the keyword
    #[arg(long, conflicts_with = "profile")]
    url: Option<String>,
    /// JSON connection profile to open before running the keyword
    #[arg(long)]
    profile: Option<PathBuf>,
    /// Alias for the connection opened by --url or --profile
    #[arg(long)]
    alias: Option<String>,
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
    /// Also write logs to this file
    #[arg(long)]
    log: Option<PathBuf>,
    /// Print the available keywords and exit
    #[arg(long)]
    list: bool,
    /// Keyword name, e.g. "Query" or query
    #[arg(required_unless_present = "list")]
    keyword: Option<String>,
    /// Keyword arguments; `name=value` is passed by name
    #[arg(allow_hyphen_values = true)]
    args: Vec<String>,
}

/// Logs always go to stderr; `--log` tees them into a file as well.
fn log_writer(path: Option<&Path>) -> io::Result<BoxMakeWriter> {
    Ok(match path {
        Some(path) => BoxMakeWriter::new(io::stderr.and(Mutex::new(File::create(path)?))),
        None => BoxMakeWriter::new(io::stderr),
    })
}

fn split_args(raw: Vec<String>) -> KeywordArgs {
    let mut args = KeywordArgs::new();
    for arg in raw {
        match arg.split_once('=') {
            Some((name, value))
                if !name.is_empty()
                    && name.chars().all(|c| c.is_alphanumeric() || c == '_') =>
            {
                args.named.insert(name.to_string(), value.to_string());
            }
            _ => args.positional.push(arg),
        }
    }
    args
}

fn run(args: Args) -> Result<(), SqlKeywordError> {
    let mut library = KeywordLibrary::new()?;
    if args.list {
        for name in library.keyword_names() {
            println!("{name}");
        }
        return Ok(());
    }

    let params = match (args.url, args.profile) {
        (Some(url), _) => Some(ConnectParams::new(url)),
        (None, Some(path)) => Some(ConnectParams::from_json_file(path)?),
        (None, None) => None,
    };
    if let Some(mut params) = params {
        if args.alias.is_some() {
            params.alias = args.alias;
        }
        let index = library.connect_to_db(&params)?;
        debug!("Opened connection {index}");
    }

    let keyword = args.keyword.ok_or_else(|| {
        SqlKeywordError::ParameterError("a keyword name is required".to_string())
    })?;
    let value = library.run_keyword(&keyword, split_args(args.args))?;
    let rendered = serde_json::to_string_pretty(&value.to_json())
        .map_err(|e| SqlKeywordError::Other(format!("failed to render result: {e}")))?;
    println!("{rendered}");

    library.close_all_connections()
}

fn main() -> ExitCode {
    let args = Args::parse();
    let writer = match log_writer(args.log.as_deref()) {
        Ok(writer) => writer,
        Err(err) => {
            eprintln!("failed to open log file: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_max_level(Level::from(args.log_level))
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
