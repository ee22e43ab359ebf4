use clap::Parser;
use crossterm::event::{Event as CEvent, EventStream, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures_util::StreamExt;
use hypenax::app::App;
use hypenax::config::{Cli, SourceEnv};
use hypenax::error::AppError;
use hypenax::market::coingecko::build_market_sources;
use hypenax::market::poller;
use hypenax::state::AppState;
use hypenax::{logging, mining, ui};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const RENDER_INTERVAL: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = cli.normalize(SourceEnv::from_process_env())?;

    if let Some(log_path) = &config.log_file {
        logging::init(log_path, config.debug)?;
    }
    log::info!(
        "hypenax starting (mock: {}, refresh: {:?})",
        config.mock_mode,
        config.refresh_interval
    );

    let state = Arc::new(AppState::new());
    let shutdown = CancellationToken::new();
    let (market_tx, market_rx) = mpsc::channel(poller::COMMAND_BUFFER);

    let poller_handle = if config.mock_mode {
        tokio::spawn(poller::run_mock_market(
            Arc::clone(&state),
            config.refresh_interval,
            market_rx,
            shutdown.child_token(),
        ))
    } else {
        let sources = build_market_sources(&config)?;
        tokio::spawn(poller::run_market_poller(
            Arc::clone(&state),
            sources,
            config.refresh_interval,
            market_rx,
            shutdown.child_token(),
        ))
    };

    let mut app = App::new(Arc::clone(&state), market_tx, config.mock_mode);
    let mut terminal = setup_terminal()?;
    let run_result = run_app(&mut terminal, &mut app).await;
    restore_terminal(&mut terminal)?;

    shutdown.cancel();
    mining::stop_mining(&state).await;
    let _ = poller_handle.await;
    log::info!("hypenax stopped");

    run_result
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>, AppError> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<(), AppError> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
) -> Result<(), AppError> {
    let mut events = EventStream::new();
    let mut render = tokio::time::interval(RENDER_INTERVAL);
    render.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        terminal.draw(|f| ui::draw(f, app))?;

        tokio::select! {
            _ = render.tick() => app.on_tick(),
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(CEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                        app.on_key(key).await;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        log::warn!("terminal event error: {error}");
                    }
                    None => break,
                }
            }
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}
