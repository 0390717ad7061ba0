mod app;
mod config;
mod diff;
mod git;
mod render;
mod ui;
mod watch;

use anyhow::{Context, Result};
use app::{App, DiffSource};
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use diff::EdgeContext;
use ratatui::prelude::*;
use std::fs::File;
use std::io::{self, Stdout, Write};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use watch::{FileWatcher, WatchEvent};

/// Diff viewer that folds unchanged context between changes
#[derive(Parser)]
#[command(name = "foldiff", version, about)]
struct Cli {
    /// Diff file in `{"files": [{"path", "chunks"}]}` JSON form.
    /// Without it, the git working tree is compared against a base revision.
    #[arg(conflicts_with_all = ["old", "new"])]
    input: Option<PathBuf>,

    /// Old side of a two-file comparison
    #[arg(long, requires = "new")]
    old: Option<PathBuf>,

    /// New side of a two-file comparison
    #[arg(long, requires = "old")]
    new: Option<PathBuf>,

    /// Repository to diff (defaults to the current directory)
    #[arg(long, default_value = ".")]
    repo: String,

    /// Base revision (defaults to upstream, then main/master/develop)
    #[arg(long)]
    base: Option<String>,

    /// Context lines kept next to each change
    #[arg(short = 'C', long)]
    context: Option<usize>,

    /// How to treat unchanged runs at the start and end of a file
    #[arg(long, value_enum)]
    edge: Option<EdgeContext>,

    /// File filter expression (e.g. '+*.rs,-*.lock,>10')
    #[arg(long)]
    filter: Option<String>,

    /// Print folded diffs as text instead of opening the UI
    #[arg(long)]
    print: bool,

    /// Print folded diffs as JSON instead of opening the UI
    #[arg(long, conflicts_with = "print")]
    json: bool,

    /// Don't watch the source for changes
    #[arg(long)]
    no_watch: bool,
}

/// Lines moved by Ctrl+d / Ctrl+u
const HALF_PAGE: usize = 10;

/// Quiet period after the last watch event before reloading
const REFRESH_DELAY: Duration = Duration::from_millis(200);

fn main() -> Result<()> {
    let cli = Cli::parse();
    let interactive = !cli.print && !cli.json;
    init_logging(interactive);

    let source = build_source(&cli)?;
    let config_dir = match &source {
        DiffSource::Git { repo, .. } => PathBuf::from(repo),
        _ => PathBuf::from("."),
    };
    let config = config::load_config(&config_dir);

    let mut options = config.section_options();
    if let Some(radius) = cli.context {
        options.context_radius = radius;
    }
    if let Some(edge) = cli.edge {
        options.edge_context = edge;
    }
    log::debug!("source: {:?}, options: {:?}", source, options);

    let mut app = App::new(source, config, options)?;
    if let Some(ref filter_expr) = cli.filter {
        app.apply_filter_expr(filter_expr);
    }

    if !interactive {
        return print_report(&app, cli.json);
    }

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let watch = app.config.watch.enabled && !cli.no_watch;
    let result = run_app(&mut terminal, &mut app, watch);

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {:?}", err);
    }

    Ok(())
}

/// Log to stderr in print modes. The UI owns the terminal, so there logs go
/// to the file named by `FOLDIFF_LOG`, or nowhere.
fn init_logging(interactive: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if interactive {
        let Some(path) = std::env::var_os("FOLDIFF_LOG") else {
            return;
        };
        match File::options().create(true).append(true).open(&path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(_) => return,
        }
    }
    let _ = builder.try_init();
}

fn build_source(cli: &Cli) -> Result<DiffSource> {
    if let (Some(old), Some(new)) = (&cli.old, &cli.new) {
        return Ok(DiffSource::Texts {
            old: old.clone(),
            new: new.clone(),
        });
    }
    if let Some(input) = &cli.input {
        return Ok(DiffSource::Json(input.clone()));
    }

    let repo = git::get_repo_root_in(&cli.repo)
        .with_context(|| format!("'{}' is not inside a git repository", cli.repo))?;
    let base = match &cli.base {
        Some(base) => base.clone(),
        None => git::detect_base_branch_in(&repo)?,
    };
    Ok(DiffSource::Git { repo, base })
}

/// Write every visible file, folded with the default expansion state
fn print_report(app: &App, json: bool) -> Result<()> {
    let visible = app.visible_files();
    let mut out = io::stdout().lock();

    if json {
        let sections: Vec<(usize, Vec<diff::Section<'_>>)> =
            visible.iter().map(|&i| (i, app.sections_for(i))).collect();
        let reports: Vec<render::FileReport<'_>> = sections
            .iter()
            .map(|(i, s)| render::file_report(&app.files[*i].path, s))
            .collect();
        writeln!(out, "{}", render::render_json(&reports)?)?;
    } else {
        for &i in &visible {
            let text = render::render_text(
                &app.files[i].path,
                &app.sections_for(i),
                app.config.display.line_numbers,
            );
            writeln!(out, "{}", text)?;
        }
    }
    Ok(())
}

/// One watcher per source path; none at all if any of them fails
fn start_watchers(app: &mut App, tx: &mpsc::Sender<WatchEvent>) -> Vec<FileWatcher> {
    let started: Result<Vec<FileWatcher>> = app
        .source
        .watch_paths()
        .iter()
        .map(|path| FileWatcher::new(path, app.config.watch.debounce_ms, tx.clone()))
        .collect();
    match started {
        Ok(watchers) => {
            app.watching = true;
            watchers
        }
        Err(e) => {
            log::warn!("watch failed: {:#}", e);
            app.notify(&format!("Watch error: {}", e));
            Vec::new()
        }
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    watch: bool,
) -> Result<()> {
    // Channel for file watch events
    let (watch_tx, watch_rx) = mpsc::channel::<WatchEvent>();

    // Debounce state for file watcher refreshes
    let mut pending_refresh = false;
    let mut refresh_deadline = Instant::now();
    let mut pending_file_count = 0usize;

    let mut watchers = if watch {
        start_watchers(app, &watch_tx)
    } else {
        Vec::new()
    };

    loop {
        let size = terminal.size()?;
        let page = ui::diff_viewport_height(app, size.width, size.height).max(1);

        terminal.draw(|f| ui::draw(f, app))?;

        // Poll for events with a timeout (lets us process watch events too)
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if app.filter_input.is_some() {
                        handle_filter_input(app, key);
                    } else {
                        handle_normal_input(app, key, page, &watch_tx, &mut watchers);
                    }
                }
            }
        }

        while let Ok(event) = watch_rx.try_recv() {
            match event {
                WatchEvent::FilesChanged(paths) => {
                    pending_file_count += paths.len();
                    pending_refresh = true;
                    refresh_deadline = Instant::now() + REFRESH_DELAY;
                }
                WatchEvent::Error(msg) => {
                    log::warn!("watcher error: {}", msg);
                    app.notify(&format!("Watch error: {}", msg));
                }
            }
        }

        // Execute debounced refresh when deadline passes
        if pending_refresh && Instant::now() >= refresh_deadline {
            pending_refresh = false;
            let count = pending_file_count;
            pending_file_count = 0;
            match app.refresh() {
                Ok(()) => app.notify(&format!(
                    "{} file{} changed",
                    count,
                    if count == 1 { "" } else { "s" }
                )),
                Err(e) => {
                    log::warn!("refresh failed: {:#}", e);
                    app.notify(&format!("Refresh failed: {}", e));
                }
            }
        }

        // Tick — used for auto-clearing notifications
        app.tick();

        if app.should_quit {
            return Ok(());
        }
    }
}

fn handle_normal_input(
    app: &mut App,
    key: KeyEvent,
    page: usize,
    watch_tx: &mpsc::Sender<WatchEvent>,
    watchers: &mut Vec<FileWatcher>,
) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }

        // Scroll
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(HALF_PAGE);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(HALF_PAGE);
        }
        KeyCode::PageDown => app.scroll_down(page),
        KeyCode::PageUp => app.scroll_up(page),
        KeyCode::Char('g') | KeyCode::Home => app.scroll_up(usize::MAX),
        KeyCode::Char('G') | KeyCode::End => app.scroll_down(usize::MAX),

        // File navigation
        KeyCode::Char('J') | KeyCode::Tab => app.select_next_file(),
        KeyCode::Char('K') | KeyCode::BackTab => app.select_prev_file(),

        // Folds
        KeyCode::Char('n') => app.next_fold(),
        KeyCode::Char('p') | KeyCode::Char('N') => app.prev_fold(),
        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_focused_fold(),
        KeyCode::Char('e') => app.expand_all_in_file(),
        KeyCode::Char('c') => app.collapse_all_in_file(),

        // Filter
        KeyCode::Char('f') => app.begin_filter_input(),

        KeyCode::Char('r') => match app.refresh() {
            Ok(()) => app.notify("Refreshed"),
            Err(e) => {
                log::warn!("refresh failed: {:#}", e);
                app.notify(&format!("Refresh failed: {}", e));
            }
        },

        // Toggle watch mode
        KeyCode::Char('w') => {
            if app.watching {
                watchers.clear();
                app.watching = false;
                app.notify("Watch stopped");
            } else {
                *watchers = start_watchers(app, watch_tx);
                if app.watching {
                    app.notify("Watching for changes...");
                }
            }
        }

        _ => {}
    }
}

fn handle_filter_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.commit_filter_input(),
        KeyCode::Esc => app.cancel_filter_input(),
        KeyCode::Backspace => app.pop_filter_char(),
        KeyCode::Char(c) => app.push_filter_char(c),
        _ => {}
    }
}
