//! Streamchat Entry Point
//!
//! Launches the terminal chat client, or sends a single message headlessly.
//!
//! # Usage
//!
//! ```bash
//! # Interactive
//! GROQ_API_KEY=... streamchat
//!
//! # Different model, separate conversation
//! streamchat --model llama-3.1-8b-instant --session scratch
//!
//! # One message, reply on stdout
//! streamchat --once "Explain SSE in one sentence"
//!
//! # Verbose logging (written to <data dir>/streamchat.log)
//! RUST_LOG=debug streamchat
//! ```

use std::fs::OpenOptions;
use std::io::{self, IsTerminal, Write};
use std::panic;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;

use streamchat_conductor::{
    load_config_from_path, ChatSettings, ConductorMessage, ConfigOverrides, SurfaceType,
};
use streamchat_tui::{App, ConductorClient};

/// Streamchat - streaming terminal chat for OpenAI-compatible endpoints
#[derive(Parser, Debug)]
#[command(name = "streamchat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "STREAMCHAT_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Chat completions endpoint
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Model to request
    #[arg(short = 'm', long)]
    model: Option<String>,

    /// Maximum tokens per response
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(short = 't', long)]
    temperature: Option<f32>,

    /// Session key (one saved conversation per key)
    #[arg(short = 's', long, value_name = "KEY")]
    session: Option<String>,

    /// Directory for the saved conversation and the log file
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Send one message, print the reply, and exit
    #[arg(long, value_name = "TEXT")]
    once: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "STREAMCHAT_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            session_key: self.session.clone(),
            data_dir: self.data_dir.clone(),
        }
    }
}

/// Resolve configuration: defaults, file, environment, then flags
fn resolve_settings(args: &Args) -> Result<ChatSettings> {
    let path = args
        .config
        .clone()
        .or_else(streamchat_conductor::default_config_path);
    let mut settings = load_config_from_path(path).context("Failed to load configuration")?;
    args.overrides().apply(&mut settings);
    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

fn env_filter(level: &str) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!(
            "streamchat={level},streamchat_tui={level},streamchat_conductor={level}"
        ))
    })
}

/// Log to a file so output never lands on the alternate screen
fn init_file_logging(level: &str, settings: &ChatSettings) -> Result<PathBuf> {
    std::fs::create_dir_all(&settings.data_dir).with_context(|| {
        format!("Failed to create data directory: {}", settings.data_dir.display())
    })?;
    let path = settings.data_dir.join("streamchat.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .init();

    Ok(path)
}

fn init_stderr_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = resolve_settings(&args)?;

    if let Some(ref text) = args.once {
        init_stderr_logging(&args.log_level);
        return run_once(&settings, text).await;
    }

    // Check if we have a TTY before attempting initialization
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: streamchat requires a terminal (TTY)");
        eprintln!();
        eprintln!("Use --once \"<message>\" for non-interactive use.");
        std::process::exit(1);
    }

    let log_path = init_file_logging(&args.log_level, &settings)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?settings,
        log = %log_path.display(),
        "Streamchat starting"
    );

    let client = ConductorClient::from_settings(&settings)?;
    let mut app = App::new(client, settings.input_limit);

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!("Streamchat exiting");
    result
}

/// Send one message against the saved session and stream the reply to stdout
async fn run_once(settings: &ChatSettings, text: &str) -> Result<()> {
    let mut client = ConductorClient::from_settings(settings)?;
    client.connect(SurfaceType::Headless).await?;
    client.send_message(text.to_string()).await?;

    if !client.is_busy() {
        bail!("Nothing to send: message is empty");
    }

    let mut stdout = io::stdout();
    let mut failure = None;
    let mut cancelled = false;

    while client.is_busy() {
        tokio::select! {
            event = client.recv_turn_event() => {
                client.apply_turn_event(event).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling");
                client.cancel().await?;
            }
        }

        for msg in client.recv_all() {
            match msg {
                ConductorMessage::Token { text, .. } => {
                    write!(stdout, "{text}")?;
                    stdout.flush()?;
                }
                ConductorMessage::StreamEnd { .. } => writeln!(stdout)?,
                ConductorMessage::StreamCancelled { .. } => {
                    writeln!(stdout)?;
                    cancelled = true;
                }
                ConductorMessage::StreamError { error, .. } => failure = Some(error),
                ConductorMessage::Notify { message, .. } => eprintln!("{message}"),
                _ => {}
            }
        }
    }

    if let Some(error) = failure {
        bail!(error);
    }
    if cancelled {
        bail!("Cancelled");
    }
    Ok(())
}
