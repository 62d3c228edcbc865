mod app;
mod cli;
mod client;
mod config;
mod error;
mod event;
mod issues;
mod logging;
mod model;
mod reconciler;
mod server;
mod service;
mod store;
mod ui;
mod util;

use std::io;
use std::panic;
use std::sync::Arc;

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use app::{Action, App};
use cli::Command;
use client::HttpBoardApi;
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = cli::parse_args(&args)?;

    let config = config::load_config()?;

    match command {
        Command::Serve { port } => {
            logging::init_stderr();
            server::serve(&config, port).await
        }
        Command::Refresh => {
            logging::init_stderr();
            cli::handle_refresh(&config).await
        }
        Command::Seed { file } => {
            logging::init_stderr();
            cli::handle_seed(&config, &file).await
        }
        Command::Help => {
            cli::print_help();
            Ok(())
        }
        Command::Board => run_board(&config).await,
    }
}

async fn run_board(config: &AppConfig) -> Result<()> {
    let _log_guard = logging::init_file(&config::log_dir())?;
    tracing::info!(api = %config.client.api_url, "opening board");

    // Set up action channel
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    let api = Arc::new(HttpBoardApi::new(&config.client.api_url));
    let seed = config.seed.iter().map(|s| s.to_record()).collect();
    let mut app = App::new(config.objectives(), seed, api, action_tx.clone());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    // Spawn event reader
    let event_tx = action_tx.clone();
    tokio::spawn(async move {
        event::run_event_loop(event_tx).await;
    });

    // Initial fetch (seeds an empty board)
    app.start();

    // Main loop
    loop {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(action) = action_rx.recv().await {
            app.update(action);
            if app.should_quit {
                break;
            }
        } else {
            break;
        }
    }

    // Restore terminal
    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    tracing::info!(pending = app.saving, "board closed");
    Ok(())
}
