//! flitify-tui: Terminal panel for Flitify
//!
//! Sign in, manage registered computers and work with online clients:
//! - live status dashboard
//! - remote file browser with download/upload
//! - pseudo-interactive shell

mod app;
mod input;
mod ui;

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use flitify_core::{ApiClient, Config, MemoryTokenStore, RedirectSlot, Route, Session, TokenStore};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::app::{App, AppResult};
use crate::input::handle_key;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to file; stdout belongs to the terminal UI
    let log_file = dirs::cache_dir()
        .map(|d| d.join("flitify").join("tui.log"))
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp/flitify-tui.log"));

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        log_file.parent().unwrap_or(std::path::Path::new("/tmp")),
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("flitify-tui.log")),
    );

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flitify_tui=debug,flitify_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(file_appender))
        .init();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Using default config: {}", e);
        Config::default()
    });

    let store: Arc<dyn TokenStore> = match config.token_store() {
        Ok(store) => {
            tracing::debug!("Token file: {}", store.path().display());
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!("No token file available, session will not persist: {}", e);
            Arc::new(MemoryTokenStore::new())
        }
    };

    let redirects = Arc::new(RedirectSlot::new());
    let api = ApiClient::from_config(&config.backend, Session::new(store), redirects.clone())?;
    tracing::info!("Backend: {}", api.base_url());

    let mouse = config.tui.mouse;
    let mut app = App::new(config, api, redirects);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    if mouse {
        execute!(stdout, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    if mouse {
        execute!(terminal.backend_mut(), DisableMouseCapture)?;
    }
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return Err(e);
    }

    Ok(())
}

/// Main application loop
async fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> anyhow::Result<()> {
    // Resume a stored session or land on the login view
    app.navigate(Route::Root).await;
    app.sync_redirect().await;

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(());
            }

            let result = handle_key(app, key).await;

            // A backend call may have ended the session
            app.sync_redirect().await;

            if let AppResult::Quit = result {
                return Ok(());
            }
        }
    }
}
