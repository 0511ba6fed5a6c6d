//! preview-tui - A TUI music preview player backed by a catalog search gateway.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui_image::picker::Picker;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

mod action;
mod app;
mod client;
mod config;
mod gateway;
mod input;
mod player;
mod tui;
mod ui;

use action::Action;
use app::App;
use config::Config;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "preview-tui")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Gateway URL (overrides config; starts no embedded gateway)
    #[arg(short, long)]
    gateway: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the catalog search gateway in the foreground
    Serve {
        /// Listen address (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Upstream catalog API base URL (overrides config)
        #[arg(short, long)]
        upstream: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Some(Command::Serve { bind, upstream }) => {
            color_eyre::install()?;
            init_logging(None)?;

            let mut config = load_config(args.config.as_deref());
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(upstream) = upstream {
                config.server.upstream = upstream;
            }

            gateway::run(&config.server, config.timeout()).await
        }
        None => {
            let log_file = dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("preview-tui")
                .join("preview-tui.log");
            tui::install_hooks(&log_file)?;
            init_logging(Some(&log_file))?;

            let mut config = load_config(args.config.as_deref());
            if let Some(gateway) = args.gateway {
                config.gateway.url = Some(gateway);
            }

            run_tui(config).await
        }
    }
}

/// Log to `log_file`, or to stderr when there is none.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::File::create(path)?;

            // Never write to stdout in TUI mode.
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .try_init()
                .ok();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .ok();
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Config {
    Config::load(path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    })
}

async fn run_tui(mut config: Config) -> Result<()> {
    if config.gateway.url.is_none() {
        let addr = gateway::spawn_embedded(&config.server.upstream, config.timeout()).await?;
        config.gateway.url = Some(format!("http://{addr}"));
    }

    // Create action channel
    let (action_tx, mut action_rx) = mpsc::unbounded_channel::<Action>();

    // Initialize terminal
    let mut terminal = tui::init()?;

    // Graphics support is queried once the terminal is in raw mode.
    let picker = if config.ui.show_cover {
        Picker::from_query_stdio().ok()
    } else {
        None
    };

    let mut app = App::new(config, action_tx.clone(), picker);
    app.init()?;

    // Main event loop
    let tick_rate = Duration::from_millis(100);

    loop {
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        if event::poll(tick_rate)? {
            let action = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    input::handle_key_event(key.code, key.modifiers, app.focus, app.show_help)
                }
                Event::Mouse(mouse) => input::handle_mouse_event(mouse),
                Event::Resize(width, height) => Action::Resize(width, height),
                _ => Action::None,
            };
            if action != Action::None {
                action_tx.send(action)?;
            }
        }

        action_tx.send(Action::Tick)?;

        // Process all pending actions
        while let Ok(action) = action_rx.try_recv() {
            app.handle_action(action)?;
        }

        if app.should_quit {
            break;
        }
    }

    tui::restore()?;

    Ok(())
}
