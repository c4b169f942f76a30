use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use homedash::{
    app::App,
    config::Config,
    theme::{PreferenceStore, Theme},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "homedash")]
#[command(about = "Personal dashboard for the terminal: clocks, weather, rates, crypto and news")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Start in dark mode and remember it
    #[arg(long, conflicts_with = "light")]
    dark: bool,

    /// Start in light mode and remember it
    #[arg(long)]
    light: bool,

    /// Write the default config file and exit
    #[arg(long)]
    init_config: bool,
}

fn default_log_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("homedash")
        .join("homedash.log")
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    // The terminal belongs to the UI, so logs go to a file
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("homedash=info")),
        )
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::default_path);

    if cli.init_config {
        Config::write_default(&config_path)?;
        println!("Wrote default config to {}", config_path.display());
        return Ok(());
    }

    init_logging(&cli.log_file.unwrap_or_else(default_log_path))?;

    let config = Config::load(&config_path)?;
    tracing::info!("Loaded config from {}", config_path.display());

    let preference_path = config
        .theme
        .preference_file
        .clone()
        .unwrap_or_else(PreferenceStore::default_path);
    let mut theme = Theme::load(
        &config.theme.dark_colors,
        PreferenceStore::new(preference_path),
    );
    if cli.dark {
        theme.set_dark(true);
    } else if cli.light {
        theme.set_dark(false);
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, theme);
    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        tracing::error!("homedash exited with error: {:#}", e);
    }
    result
}
