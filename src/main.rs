use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app;
mod config;
mod handler;
mod identity;
mod message;
mod session;
mod storage;
mod tui;
mod ui;

use app::App;
use config::Config;
use session::{Session, SessionEvent};
use storage::LocalStorage;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "ws-chat")]
#[command(about = "Chat over a JSON WebSocket server from the terminal")]
#[command(version)]
struct Cli {
    /// WebSocket endpoint of the chat server
    #[arg(short, long, env = "CHAT_WS_SERVER")]
    server: Option<String>,

    /// File holding the stored display name
    #[arg(long, value_name = "PATH")]
    storage: Option<PathBuf>,

    /// Log destination (the terminal belongs to the UI)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A .env file may provide CHAT_WS_SERVER, so load it before parsing
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_logging(&cli)?;

    let config = Config::load().unwrap_or_else(|e| {
        warn!("ignoring unreadable config file: {}", e);
        Config::default()
    });

    let storage_path = match cli.storage {
        Some(path) => path,
        None => LocalStorage::default_location()?,
    };
    let mut app = App::new(LocalStorage::open_or_empty(storage_path));

    // The sender stays alive for the whole run so the receiver never reports closed.
    let (session_tx, mut session_rx) = mpsc::unbounded_channel();
    match config.server_url(cli.server) {
        Some(url) => app.activate(Session::open(&url, session_tx.clone())),
        None => error!("WebSocket URL is not configured; pass --server or set CHAT_WS_SERVER"),
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app, &mut session_rx).await;

    app.deactivate().await;
    tui::restore()?;
    info!("chat view closed");

    result
}

async fn run(
    terminal: &mut Tui,
    app: &mut App,
    session_rx: &mut mpsc::UnboundedReceiver<SessionEvent>,
) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event),
            Some(event) = session_rx.recv() => app.apply_session_event(event),
            else => break,
        }
    }

    Ok(())
}

fn init_logging(cli: &Cli) -> Result<()> {
    let path = match &cli.log_file {
        Some(path) => path.clone(),
        None => dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?
            .join("ws-chat")
            .join("ws-chat.log"),
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
