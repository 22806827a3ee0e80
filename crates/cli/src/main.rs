mod config;
mod error;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chat::{OpenAiBackend, Orchestrator, Outcome, Session, TraceEvent};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use config::Config;
use error::{Error, Result};

const CONFIG_FILE: &str = "skiff.toml";
const EXIT_WORDS: [&str; 4] = ["quit", "exit", "q", "salir"];
const PREVIEW_CHARS: usize = 200;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "A CLI chat client bridging an LLM to MCP tool servers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file (defaults to ./skiff.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// Connect to the tool server and list its tools
    Tools,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // .env first; values already in the process environment win.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(config).await,
        Some(Commands::Tools) => cmd_tools(config).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::load(path)?),
        None if Path::new(CONFIG_FILE).exists() => Ok(Config::load(CONFIG_FILE)?),
        None => Ok(Config::default()),
    }
}

fn build_backend(config: &Config) -> Result<OpenAiBackend> {
    let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| Error::MissingApiKey)?;

    let mut builder = OpenAiBackend::builder(api_key, &config.backend.model)
        .max_tokens(config.backend.max_tokens);
    if let Some(base_url) = &config.backend.base_url {
        builder = builder.base_url(base_url);
    }
    Ok(builder.build())
}

async fn cmd_chat(config: Config) -> Result<()> {
    println!("skiff v{}", env!("CARGO_PKG_VERSION"));

    let backend = build_backend(&config)?;
    backend.probe().await.map_err(Error::Probe)?;

    let session = Session::connect(&config.server).await?;
    println!(
        "Connected to '{}' with {} tools:",
        session.server().name,
        session.catalog().len()
    );
    for name in session.catalog().names() {
        println!("  - {name}");
    }
    println!("Model: {}", backend.model());
    println!("Type 'quit' or Ctrl+D to exit.\n");

    let orchestrator = Orchestrator::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(line) = line else {
            break; // EOF
        };

        let input = line.trim();
        if input.is_empty() {
            println!("Please enter a query.");
            continue;
        }
        if is_exit_word(input) {
            break;
        }

        let mut trace = |event: TraceEvent| print_trace(&event);
        let query = orchestrator.run(&backend, &session, session.catalog(), input, &mut trace);

        // Ctrl+C drops the in-flight query and returns to the prompt.
        tokio::select! {
            result = query => match result {
                Ok(Outcome::Answer(text)) => println!("\n{text}\n"),
                Ok(Outcome::NoContent) => println!("\n(no response from the assistant)\n"),
                Ok(Outcome::Exhausted) => println!(),
                Err(e) => eprintln!("Error: {e}\n"),
            },
            _ = tokio::signal::ctrl_c() => println!("\nInterrupted.\n"),
        }
    }

    session.close().await?;
    println!("\nSession ended.");
    Ok(())
}

async fn cmd_tools(config: Config) -> Result<()> {
    let session = Session::connect(&config.server).await?;

    println!(
        "{} tools from '{}':",
        session.catalog().len(),
        session.server().name
    );
    for spec in session.catalog().specs() {
        println!("  {}: {}", spec.name, spec.description);
    }

    session.close().await?;
    Ok(())
}

fn is_exit_word(input: &str) -> bool {
    EXIT_WORDS.contains(&input.to_lowercase().as_str())
}

fn print_trace(event: &TraceEvent) {
    match event {
        TraceEvent::ModelTurn { .. } => {}
        TraceEvent::AssistantText { text } => println!("\n{text}"),
        TraceEvent::ToolCall { name, arguments, .. } => {
            println!("  calling {name} with {}", preview(arguments));
        }
        TraceEvent::ToolResult { content, failed, .. } => {
            let marker = if *failed { "failed" } else { "result" };
            println!("  {marker}: {}", preview(content));
        }
    }
}

/// Truncate long payloads for display, like the tool-result previews.
fn preview(s: &str) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}
