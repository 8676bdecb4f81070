//! mdedit-tui - form-based editor for ISO 19115 metadata
//!
//! Generates an editable form from an annotated XML template, binds
//! it to a loaded metadata document, and renders the edited values
//! back through the same template on save.

mod app;
mod config;
mod editor;
mod error;
mod metadata;
mod template;
mod ui;

use anyhow::Result;
use app::App;
use clap::Parser;
use config::EditorConfig;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use editor::EditorSession;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "mdedit-tui", version, about = "ISO metadata template editor")]
struct Args {
    /// Annotated metadata template
    template: PathBuf,
    /// XML document to load into the form (empty form without it)
    #[arg(long)]
    xml: Option<PathBuf>,
    /// Produce a reusable template instead of a resolved document.
    /// When given, overrides the persisted setting either way.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    template_editor: Option<bool>,
    /// Output directory, defaults to the template's directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Output file name, gets an .xml suffix appended when missing
    #[arg(long)]
    output_name: Option<String>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mdedit_tui=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let mut config = EditorConfig::load().unwrap_or_default();
    config.last_template = Some(args.template.display().to_string());
    if let Err(err) = config.save() {
        tracing::warn!("cannot save config: {err}");
    }

    let template_mode = args
        .template_editor
        .or(config.template_editor)
        .unwrap_or(false);
    let session = EditorSession::open(&args.template, args.xml.as_deref(), template_mode)?;
    let mut app = App::new(session, config, args.output_dir, args.output_name);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key)?;
                }
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}
