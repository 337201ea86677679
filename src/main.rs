use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use devconsole_logs::{Console, LoadOutcome};

mod config;
mod loader;
mod script;

use config::FileConfig;
use loader::FsLoader;
use script::Line;

/// Devconsole - A line-driven developer console with grouped, deduplicated log output
#[derive(Parser, Debug)]
#[command(name = "devconsole")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Script to run instead of reading standard input
    #[arg(value_name = "SCRIPT")]
    script: Option<PathBuf>,

    /// Maximum retained entries, 0 for unbounded
    #[arg(long)]
    max_entries: Option<usize>,

    /// Show a header line above each entry
    #[arg(long)]
    header: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Settings file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Html,
}

impl OutputFormat {
    fn render(self, console: &Console) -> String {
        match self {
            OutputFormat::Text => console.text(),
            OutputFormat::Html => console.markup(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run(args: Args) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let settings = file_config.resolve(args.max_entries, args.header);
    debug!(?settings, "resolved settings");

    let (load_tx, mut load_rx) = mpsc::unbounded_channel::<LoadOutcome>();
    let cancel = CancellationToken::new();

    let loader = FsLoader::new(settings.libraries, load_tx, cancel.clone());
    let in_flight = loader.in_flight();
    let mut console = Console::new(settings.console).with_loader(loader);

    let input: Box<dyn AsyncRead + Unpin> = match &args.script {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open script {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(input).lines();
    let mut input_done = false;
    let mut last_output = String::new();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                break;
            }

            Some(outcome) = load_rx.recv() => {
                in_flight.fetch_sub(1, Ordering::SeqCst);
                console.finish_load(outcome);
            }

            line = lines.next_line(), if !input_done => {
                match line.context("Failed to read input")? {
                    Some(line) => handle_line(&mut console, &line),
                    None => input_done = true,
                }
            }
        }

        let output = args.format.render(&console);
        if output != last_output {
            println!("{}\n", output);
            last_output = output;
        }

        if input_done && in_flight.load(Ordering::SeqCst) == 0 {
            break;
        }
    }

    cancel.cancel();
    Ok(())
}

fn handle_line(console: &mut Console, raw: &str) {
    if raw.trim().is_empty() {
        return;
    }

    match Line::parse(raw) {
        Ok(Line::Console(input)) => {
            console.input(&input);
        }
        Ok(Line::Directive(directive)) => {
            if let Err(e) = directive.apply(console) {
                eprintln!("Error: {:#}", e);
            }
        }
        Err(e) => eprintln!("Error: {:#}", e),
    }
}
