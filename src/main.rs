mod app;
mod ui;

use anyhow::{Context, Result};
use app::App;
use crossterm::event::{self, Event};
use ratatui::DefaultTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use urbmind_map::config::Config;
use urbmind_map::search::{self, GeocodeResponse};
use urbmind_map::telemetry;

/// Command-line options: `--config <file>`, `--results <geocode.json>`, `--data <dir>`
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    results: Option<PathBuf>,
    data_dir: Option<PathBuf>,
}

impl Args {
    fn parse() -> Result<Self> {
        let mut args = Args::default();
        let mut iter = std::env::args().skip(1);
        while let Some(flag) = iter.next() {
            let mut value = || iter.next().with_context(|| format!("{flag} needs a value"));
            match flag.as_str() {
                "--config" => args.config = Some(PathBuf::from(value()?)),
                "--results" => args.results = Some(PathBuf::from(value()?)),
                "--data" => args.data_dir = Some(PathBuf::from(value()?)),
                other => anyhow::bail!("unknown argument: {other}"),
            }
        }
        Ok(args)
    }
}

fn main() -> Result<()> {
    let args = Args::parse()?;
    let config = Config::discover(args.config.as_deref()).context("loading configuration")?;
    telemetry::init_tracing(&config.logging).context("initializing logging")?;

    let results = match &args.results {
        Some(path) => search::load_response(path).with_context(|| format!("reading {}", path.display()))?,
        None => GeocodeResponse::default(),
    };
    tracing::info!(results = results.features.len(), "starting");

    let mut terminal = ratatui::init();
    terminal.clear()?;

    let data_dir = args.data_dir.unwrap_or_else(|| PathBuf::from("data"));
    let result = run(&mut terminal, &config, &data_dir, results);

    ratatui::restore();
    result
}

fn run(terminal: &mut DefaultTerminal, config: &Config, data_dir: &Path, results: GeocodeResponse) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, size.width, size.height, data_dir, results);

    loop {
        app.tick();
        terminal.draw(|frame| ui::render(frame, &app))?;

        // ~60fps
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => app.handle_key(key),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.session.unobserve_viewport();
    tracing::info!("exiting");
    Ok(())
}
