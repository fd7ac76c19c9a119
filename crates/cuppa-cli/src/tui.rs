use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use cuppa_core::{Error, Gallery, Item, Probe, Theme, ViewItem};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::{Duration, Instant};
use time::OffsetDateTime;

use crate::copy_helpers;
use crate::theme::{self, Palette};

type Brewing = Option<Receiver<Result<Vec<Item>, Error>>>;
type Term = Terminal<CrosstermBackend<io::Stdout>>;

pub struct Options {
    /// Headless runs (tests) skip the terminal.
    pub draw: bool,
    /// Fetch batches on a worker thread so the UI keeps drawing; off brews inline.
    pub background: bool,
    pub alt_screen: bool,
    pub default_count: usize,
    pub refresh: Duration,
    pub palette_file: PathBuf,
}

pub trait EventSource {
    fn poll(&mut self, timeout: Duration) -> Result<Option<Event>>;
}

pub struct RealEventSource;

impl EventSource for RealEventSource {
    fn poll(&mut self, timeout: Duration) -> Result<Option<Event>> {
        if crossterm::event::poll(timeout)? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }
}

pub fn run_gallery_default<P: Probe + 'static>(gallery: &mut Gallery<P>, opts: &Options) -> Result<()> {
    let mut es = RealEventSource;
    run_gallery_with(gallery, &mut es, opts)?;
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Search,
    Count,
    Note,
}

struct Toast {
    msg: String,
    until: Instant,
    error: bool,
}

struct Ui {
    mode: Mode,
    input: String,
    selected: usize,
    toast: Option<Toast>,
    note_target: Option<String>,
    pending_clear_until: Option<Instant>,
    palette: (Theme, Palette),
}

impl Ui {
    fn say(&mut self, msg: impl Into<String>) {
        self.toast = Some(Toast {
            msg: msg.into(),
            until: Instant::now() + Duration::from_millis(1500),
            error: false,
        });
    }

    fn warn(&mut self, msg: impl Into<String>) {
        self.toast = Some(Toast {
            msg: msg.into(),
            until: Instant::now() + Duration::from_millis(3000),
            error: true,
        });
    }
}

fn new_ui(theme: Theme, opts: &Options) -> Ui {
    Ui {
        mode: Mode::Normal,
        input: String::new(),
        selected: 0,
        toast: None,
        note_target: None,
        pending_clear_until: None,
        palette: (theme, theme::load_palette(theme, &opts.palette_file)),
    }
}

/// Runs the interactive gallery. Returns the ids of the view as it was on exit.
pub fn run_gallery_with<P: Probe + 'static>(
    gallery: &mut Gallery<P>,
    es: &mut dyn EventSource,
    opts: &Options,
) -> Result<Vec<String>> {
    let mut ui = new_ui(gallery.theme(), opts);

    let mut terminal = if opts.draw {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if opts.alt_screen {
            crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen)?;
        }
        Some(Terminal::new(CrosstermBackend::new(stdout))?)
    } else {
        None
    };

    let outcome = event_loop(gallery, es, opts, &mut ui, terminal.as_mut());

    if opts.draw {
        disable_raw_mode()?;
        if opts.alt_screen {
            crossterm::execute!(io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
        }
    }
    outcome
}

fn event_loop<P: Probe + 'static>(
    gallery: &mut Gallery<P>,
    es: &mut dyn EventSource,
    opts: &Options,
    ui: &mut Ui,
    mut terminal: Option<&mut Term>,
) -> Result<Vec<String>> {
    let mut brewing: Brewing = None;
    // Marks and theme live in the store; reread them only after something may have changed.
    let mut view = gallery.view();
    let mut stale = false;
    loop {
        stale |= poll_brew(gallery, ui, &mut brewing);
        if stale {
            view = gallery.view();
            let current = gallery.theme();
            if ui.palette.0 != current {
                ui.palette = (current, theme::load_palette(current, &opts.palette_file));
            }
            stale = false;
        }
        if ui.selected >= view.len() {
            ui.selected = view.len().saturating_sub(1);
        }

        if let Some(term) = terminal.as_mut() {
            term.draw(|f| render(f, &*gallery, &view, &*ui))?;
        }

        let Some(ev) = es.poll(opts.refresh)? else {
            // headless runs end when input runs out
            if !opts.draw && brewing.is_none() {
                break;
            }
            continue;
        };
        if let Event::Key(k) = ev {
            if k.kind == KeyEventKind::Press {
                if on_key(gallery, ui, &view, k, opts, &mut brewing) {
                    break;
                }
                stale = true;
            }
        }
    }
    Ok(gallery.view().into_iter().map(|v| v.item.id).collect())
}

/// Hands a finished background batch to the gallery. True when one was collected.
fn poll_brew<P: Probe>(gallery: &mut Gallery<P>, ui: &mut Ui, brewing: &mut Brewing) -> bool {
    let polled = brewing.as_ref().map(|rx| rx.try_recv());
    let fetched = match polled {
        Some(Ok(fetched)) => fetched,
        Some(Err(TryRecvError::Disconnected)) => Err(Error::Interrupted("worker stopped".into())),
        Some(Err(TryRecvError::Empty)) | None => return false,
    };
    *brewing = None;
    let outcome = gallery.finish_brew(fetched);
    report_brew(ui, outcome);
    true
}

fn report_brew(ui: &mut Ui, outcome: Result<usize, Error>) {
    match outcome {
        Ok(n) => {
            ui.selected = 0;
            ui.say(format!("Added {} image{}", n, if n == 1 { "" } else { "s" }));
        }
        Err(e) => ui.warn(e.to_string()),
    }
}

fn start_brew<P: Probe + 'static>(
    gallery: &mut Gallery<P>,
    ui: &mut Ui,
    opts: &Options,
    brewing: &mut Brewing,
) {
    let n = match gallery.begin_brew(&ui.input) {
        Ok(n) => n,
        Err(e) => {
            ui.warn(e.to_string());
            return;
        }
    };
    ui.mode = Mode::Normal;
    if opts.background {
        let source = gallery.source().clone();
        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let _ = tx.send(source.fetch_batch(n));
        });
        *brewing = Some(rx);
        ui.say(format!("Brewing {}…", n));
    } else {
        let fetched = gallery.source().fetch_batch(n);
        let outcome = gallery.finish_brew(fetched);
        report_brew(ui, outcome);
    }
}

fn apply_query<P: Probe>(gallery: &mut Gallery<P>, ui: &mut Ui) {
    match gallery.set_query(&ui.input) {
        Ok(()) => ui.selected = 0,
        Err(e) => ui.warn(e.to_string()),
    }
}

// Returns true when the gallery should close.
fn on_key<P: Probe + 'static>(
    gallery: &mut Gallery<P>,
    ui: &mut Ui,
    view: &[ViewItem],
    k: KeyEvent,
    opts: &Options,
    brewing: &mut Brewing,
) -> bool {
    if k.code == KeyCode::Char('c') && k.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }
    match ui.mode {
        Mode::Search => match k.code {
            KeyCode::Esc | KeyCode::Enter => ui.mode = Mode::Normal,
            KeyCode::Backspace => {
                ui.input.pop();
                apply_query(gallery, ui);
            }
            KeyCode::Char(ch) => {
                ui.input.push(ch);
                if let Err(e) = gallery.set_query(&ui.input) {
                    ui.input.pop();
                    ui.warn(e.to_string());
                } else {
                    ui.selected = 0;
                }
            }
            _ => {}
        },
        Mode::Count => match k.code {
            KeyCode::Esc => ui.mode = Mode::Normal,
            KeyCode::Enter => start_brew(gallery, ui, opts, brewing),
            KeyCode::Backspace => {
                ui.input.pop();
            }
            KeyCode::Char(ch) => ui.input.push(ch),
            _ => {}
        },
        Mode::Note => match k.code {
            KeyCode::Esc => {
                ui.mode = Mode::Normal;
                ui.note_target = None;
            }
            KeyCode::Enter => {
                ui.mode = Mode::Normal;
                if let Some(id) = ui.note_target.take() {
                    match gallery.save_note(&id, &ui.input) {
                        Ok(()) if ui.input.trim().is_empty() => ui.say("Note removed"),
                        Ok(()) => ui.say("Note saved"),
                        Err(e) => ui.warn(e.to_string()),
                    }
                }
            }
            KeyCode::Backspace => {
                ui.input.pop();
            }
            KeyCode::Char(ch) => ui.input.push(ch),
            _ => {}
        },
        Mode::Normal => return on_normal_key(gallery, ui, view, k, opts),
    }
    false
}

fn on_normal_key<P: Probe>(
    gallery: &mut Gallery<P>,
    ui: &mut Ui,
    view: &[ViewItem],
    k: KeyEvent,
    opts: &Options,
) -> bool {
    let current = view.get(ui.selected);
    match k.code {
        KeyCode::Esc | KeyCode::Char('q') => return true,
        KeyCode::Char('/') => {
            ui.mode = Mode::Search;
            ui.input = gallery.query().to_string();
        }
        KeyCode::Char('b') => {
            if gallery.is_busy() {
                ui.warn("Still brewing… wait for the current batch");
            } else {
                ui.mode = Mode::Count;
                ui.input = opts.default_count.to_string();
            }
        }
        KeyCode::Char('s') => {
            let mode = gallery.cycle_sort();
            ui.say(format!("Sort: {}", mode.label()));
        }
        KeyCode::Char('p') => {
            if let Some(v) = current {
                match gallery.toggle_favorite(&v.item.id) {
                    Ok(true) => ui.say("Favorited"),
                    Ok(false) => ui.say("Unfavorited"),
                    Err(e) => ui.warn(e.to_string()),
                }
            }
        }
        KeyCode::Char('n') => {
            if let Some(v) = current {
                ui.mode = Mode::Note;
                ui.input = v.note.clone().unwrap_or_default();
                ui.note_target = Some(v.item.id.clone());
            }
        }
        KeyCode::Char('y') => {
            if let Some(v) = current {
                match copy_helpers::copy_text(&v.item.display_url) {
                    Ok(()) => ui.say("Copied image address"),
                    Err(e) => ui.warn(format!("Copy failed: {}", e)),
                }
            }
        }
        KeyCode::Char('v') => {
            if let Some(v) = current {
                match gallery.check_display(&v.item.id) {
                    Ok(None) => ui.say(format!("{} loads fine", v.item.filename)),
                    Ok(Some(msg)) => ui.warn(msg),
                    Err(e) => ui.warn(e.to_string()),
                }
            }
        }
        KeyCode::Char('t') => match gallery.toggle_theme() {
            Ok(t) => ui.say(format!("Theme: {}", t)),
            Err(e) => ui.warn(e.to_string()),
        },
        KeyCode::Char('X') => {
            let now = Instant::now();
            let confirmed = ui.pending_clear_until.map(|t| now <= t).unwrap_or(false);
            if confirmed {
                gallery.clear();
                ui.pending_clear_until = None;
                ui.selected = 0;
                ui.say("Gallery cleared");
            } else if gallery.collection().is_empty() {
                ui.say("Nothing to clear");
            } else {
                ui.pending_clear_until = Some(now + Duration::from_millis(1500));
                ui.warn("Press X again to clear every image");
            }
        }
        KeyCode::Up => ui.selected = ui.selected.saturating_sub(1),
        KeyCode::Down => {
            if ui.selected + 1 < view.len() {
                ui.selected += 1;
            }
        }
        KeyCode::PageUp => ui.selected = ui.selected.saturating_sub(10),
        KeyCode::PageDown => ui.selected = (ui.selected + 10).min(view.len().saturating_sub(1)),
        KeyCode::Home => ui.selected = 0,
        KeyCode::End => ui.selected = view.len().saturating_sub(1),
        _ => {}
    }
    false
}

fn render<P: Probe>(f: &mut Frame, gallery: &Gallery<P>, view: &[ViewItem], ui: &Ui) {
    let pal = ui.palette.1;
    let base = Style::default().fg(pal.fg).bg(pal.bg);
    let border = Style::default().fg(pal.border_fg);
    let prompt = ui.mode != Mode::Normal;

    let mut constraints = vec![Constraint::Length(1)];
    if prompt {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Min(5));
    constraints.push(Constraint::Length(4));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());
    f.render_widget(Block::default().style(base), f.area());

    let sort = gallery.sort().map(|m| m.label()).unwrap_or("Brew order");
    let mut header = format!(
        "Cuppa: {} of {} | sort: {} | theme: {}",
        view.len(),
        gallery.collection().len(),
        sort,
        ui.palette.0
    );
    if !gallery.query().is_empty() {
        header.push_str(&format!(" | search: {}", gallery.query()));
    }
    if gallery.is_busy() {
        header.push_str(" | brewing…");
    }
    f.render_widget(
        Paragraph::new(header).style(base.fg(pal.accent).add_modifier(Modifier::BOLD)),
        chunks[0],
    );

    let mut area = 1;
    if prompt {
        let title = match ui.mode {
            Mode::Search => "Search: letters, digits, space, - _ #",
            Mode::Count => "Brew how many? Enter starts",
            Mode::Note => "Note: leave empty to remove",
            Mode::Normal => "",
        };
        let input = Paragraph::new(ui.input.as_str())
            .style(base)
            .block(Block::default().borders(Borders::ALL).title(title).border_style(border));
        f.render_widget(input, chunks[area]);
        area += 1;
    }

    let dim = Style::default().add_modifier(Modifier::DIM);
    let rows: Vec<ListItem> = view
        .iter()
        .map(|v| {
            let star = if v.favorite { "★" } else { " " };
            let line1 = Line::from(vec![
                Span::styled(star, Style::default().fg(pal.accent)),
                Span::raw(" "),
                Span::raw(v.item.filename.clone()),
                Span::styled(format!("  {}", rel_time(v.item.added_at)), dim),
            ]);
            let detail = match &v.note {
                Some(n) => format!("  ✎ {}", n),
                None => format!("  {}", v.item.display_url),
            };
            ListItem::new(vec![line1, Line::from(detail).style(dim)])
        })
        .collect();
    let title = if gallery.collection().is_empty() {
        "Gallery: press b to brew"
    } else {
        "Gallery"
    };
    let list = List::new(rows)
        .style(base)
        .block(Block::default().borders(Borders::ALL).title(title).border_style(border))
        .highlight_style(Style::default().fg(pal.highlight_fg).bg(pal.highlight_bg));
    let mut state = ListState::default().with_selected(if view.is_empty() {
        None
    } else {
        Some(ui.selected)
    });
    f.render_stateful_widget(list, chunks[area], &mut state);
    area += 1;

    let mut lines = vec![Line::raw(
        "b brew | / search | s sort | p favorite | n note | y copy | v check | t theme | X clear | q quit",
    )];
    if let Some(t) = &ui.toast {
        if Instant::now() <= t.until {
            let fg = if t.error { pal.error_fg } else { pal.help_fg };
            lines.push(Line::styled(t.msg.clone(), Style::default().fg(fg)));
        }
    }
    let footer = Paragraph::new(lines)
        .style(base.fg(pal.help_fg))
        .block(Block::default().borders(Borders::ALL).title("Shortcuts").border_style(border))
        .wrap(Wrap { trim: true });
    f.render_widget(footer, chunks[area]);
}

pub fn rel_time(at: OffsetDateTime) -> String {
    let delta = (OffsetDateTime::now_utc() - at).whole_seconds();
    if delta < 60 {
        return "just now".into();
    }
    let minutes = delta / 60;
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    let days = hours / 24;
    if days < 7 {
        return format!("{}d ago", days);
    }
    let date = at.date();
    format!("{}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day())
}
