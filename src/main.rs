//! Job Log Viewer CLI
//!
//! Entry point for the `joblog` command-line tool.

use clap::{Parser, Subcommand};
use joblog::config::LoadedConfig;
use joblog::replay::{parse_recording, replay};
use joblog::{
    ConsoleView, FetchOutcome, HttpEventSource, JobLogSession, JobOutput, JobResult, RenderConfig, TranscriptView,
};
use serde_json::{json, Map, Value};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const EXIT_PASSED: i32 = 0;
const EXIT_FAILED: i32 = 1;
const EXIT_FETCH_FAILED: i32 = 2;
const EXIT_USAGE: i32 = 3;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser)]
#[command(name = "joblog")]
#[command(about = "Follow and replay CI job logs", version)]
struct Cli {
    /// Log library diagnostics at debug level (overridden by RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a running job's log to the console
    Follow {
        /// Events endpoint (overrides events_url from the config file)
        #[arg(long)]
        url: Option<String>,

        /// Bearer token for the events endpoint
        #[arg(long, env = "JOBLOG_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Path to viewer config file (TOML)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Give up after this many consecutive failed requests
        #[arg(long)]
        max_consecutive_errors: Option<u32>,

        /// Prefix output lines with their line number
        #[arg(long, short = 'n')]
        line_numbers: bool,

        /// Print the effective configuration (token redacted) and exit
        #[arg(long)]
        print_config: bool,
    },

    /// Fold a recorded event file and print the transcript
    Replay {
        /// Events as a JSON array, an events page, or one JSON event per line
        file: PathBuf,

        /// Print plain output without line numbers or fold headers
        #[arg(long)]
        raw: bool,

        /// Open every fold, including passed commands
        #[arg(long)]
        expand: bool,

        /// Maximum events folded per render tick
        #[arg(long)]
        batch_limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let code = match cli.command {
        Commands::Follow {
            url,
            token,
            config,
            max_consecutive_errors,
            line_numbers,
            print_config,
        } => {
            let overrides = cli_overrides(url, token, max_consecutive_errors);
            run_follow(config, overrides, line_numbers, print_config).await
        }
        Commands::Replay {
            file,
            raw,
            expand,
            batch_limit,
        } => run_replay(file, raw, expand, batch_limit).await,
    };

    process::exit(code);
}

fn init_logging(verbose: bool) {
    let default_directive = if verbose { "joblog=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

/// CLI flags as the top configuration layer. Only flags that were given are
/// present so they don't mask the file.
fn cli_overrides(url: Option<String>, token: Option<String>, max_consecutive_errors: Option<u32>) -> Option<Value> {
    let mut root = Map::new();
    if let Some(url) = url {
        root.insert("events_url".to_string(), json!(url));
    }
    if let Some(token) = token {
        root.insert("token".to_string(), json!(token));
    }
    if let Some(max) = max_consecutive_errors {
        root.insert("fetch".to_string(), json!({ "max_consecutive_errors": max }));
    }

    if root.is_empty() {
        None
    } else {
        Some(Value::Object(root))
    }
}

async fn run_follow(
    config_path: Option<PathBuf>,
    overrides: Option<Value>,
    line_numbers: bool,
    print_config: bool,
) -> i32 {
    let loaded = match LoadedConfig::load(config_path.as_deref(), overrides) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            return EXIT_USAGE;
        }
    };

    if print_config {
        let report = json!({
            "config": loaded.config.redacted(),
            "sources": loaded.sources,
        });
        match serde_json::to_string_pretty(&report) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error serializing config: {}", e);
                return EXIT_USAGE;
            }
        }
        return EXIT_PASSED;
    }

    let source = match loaded
        .config
        .http_source_config()
        .map_err(|e| e.to_string())
        .and_then(|http| HttpEventSource::new(&http).map_err(|e| e.to_string()))
    {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error: {} (pass --url or set events_url)", e);
            return EXIT_USAGE;
        }
    };

    let view = ConsoleView::new(io::stdout()).with_line_numbers(line_numbers);
    let session = JobLogSession::start(
        Arc::new(source),
        view,
        loaded.config.fetcher_config(),
        loaded.config.render_config(),
    );

    let queue = session.queue().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, finishing with what was fetched");
            queue.stop();
        }
    });

    let (outcome, report) = match session.wait().await {
        Ok(done) => done,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_FETCH_FAILED;
        }
    };

    if let Some(e) = report.view.write_error() {
        eprintln!("Error writing output: {}", e);
        return EXIT_USAGE;
    }
    warn_rejected(report.stats.errors.len());

    match outcome {
        Some(FetchOutcome::Finished) => exit_code_for(&report.output),
        Some(FetchOutcome::Failed { message }) => {
            eprintln!("{}", message);
            EXIT_FETCH_FAILED
        }
        Some(FetchOutcome::Cancelled) | None => EXIT_INTERRUPTED,
    }
}

async fn run_replay(file: PathBuf, raw: bool, expand: bool, batch_limit: Option<usize>) -> i32 {
    if batch_limit == Some(0) {
        eprintln!("Error: --batch-limit must be positive");
        return EXIT_USAGE;
    }

    let contents = match fs::read_to_string(&file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error reading {}: {}", file.display(), e);
            return EXIT_USAGE;
        }
    };

    let events = match parse_recording(&contents) {
        Ok(events) => events,
        Err(e) => {
            eprintln!("Error parsing {}: {}", file.display(), e);
            return EXIT_USAGE;
        }
    };

    let mut report = replay(events, TranscriptView::new(), RenderConfig { batch_limit }).await;
    warn_rejected(report.stats.errors.len());

    if raw {
        print!("{}", report.output.to_raw_text());
    } else {
        if expand {
            let closed: Vec<_> = report
                .view
                .folds()
                .iter()
                .filter(|fold| !fold.open)
                .map(|fold| fold.command_id)
                .collect();
            for id in closed {
                report.view.toggle(id);
            }
        }
        print!("{}", report.view.to_text());
    }

    exit_code_for(&report.output)
}

fn warn_rejected(count: usize) {
    if count > 0 {
        eprintln!("Warning: {} event(s) were rejected while folding the log", count);
    }
}

fn exit_code_for(output: &JobOutput) -> i32 {
    match output.result() {
        Some(JobResult::Passed) => EXIT_PASSED,
        _ => EXIT_FAILED,
    }
}
