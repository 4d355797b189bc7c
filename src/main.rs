use std::fs::File;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use tui_tracker::app::{App, Message};
use tui_tracker::basemap::load_basemap;
use tui_tracker::config::Config;
use tui_tracker::model::{Metric, RegionSelection};
use tui_tracker::{ui, HttpGateway};

fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config)?;

    // Network fetches run on the runtime; the UI loop stays on this thread
    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let _guard = runtime.enter();

    let gateway = HttpGateway::new(config.base_url.clone(), config.timeout())
        .context("building HTTP client")?;
    let map_renderer = load_basemap(&config.data_dir);
    let (mut app, mut rx) = App::new(Arc::new(gateway), map_renderer, config.history_days);
    info!(base_url = %config.base_url, "starting dashboard");
    app.start();

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app, &mut rx);
    ratatui::restore();

    result
}

/// Log to a file when requested; the terminal belongs to the UI
fn init_logging(config: &Config) -> Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("tracing init failed: {e}"))
}

fn run(
    terminal: &mut DefaultTerminal,
    app: &mut App,
    rx: &mut UnboundedReceiver<Message>,
) -> Result<()> {
    terminal.clear()?;

    loop {
        // Apply finished fetches one at a time, in arrival order
        while let Ok(message) = rx.try_recv() {
            app.handle_message(message);
        }
        app.tick(Instant::now());

        terminal.draw(|frame| ui::render(frame, app))?;

        if event::poll(Duration::from_millis(50))? {
            // Resize needs no handling: the next draw picks up the new size
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.quit();
        return;
    }

    if app.picker.is_some() {
        match key.code {
            KeyCode::Esc => app.close_picker(),
            KeyCode::Enter => app.picker_confirm(),
            KeyCode::Up => app.picker_move(-1),
            KeyCode::Down => app.picker_move(1),
            KeyCode::PageUp => app.picker_move(-10),
            KeyCode::PageDown => app.picker_move(10),
            KeyCode::Backspace => app.picker_backspace(),
            KeyCode::Char(ch) => app.picker_input(ch),
            _ => {}
        }
        return;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.quit(),

        // Metric
        KeyCode::Char('1') => app.select_metric(Metric::Cases),
        KeyCode::Char('2') => app.select_metric(Metric::Recovered),
        KeyCode::Char('3') => app.select_metric(Metric::Deaths),
        KeyCode::Tab => app.cycle_metric(),

        // Region
        KeyCode::Char('/') | KeyCode::Enter => app.open_picker(),
        KeyCode::Char('w') => app.select_region(RegionSelection::Worldwide),

        KeyCode::Char('r') => app.retry(),

        _ => {}
    }
}
