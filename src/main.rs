//! mailscope - keyword search TUI for email CSV exports
//!
//! Features:
//! - Keyword bar at top (comma-separated terms)
//! - Scatter chart of the top 50 scoring emails, one series per sender
//! - Detail panel showing the selected email's fields
//! - Keyboard-driven point selection and a file chooser for loading

use std::io::{self, stdout};
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

mod picker;
mod search;
mod store;
mod ui;

use picker::FilePicker;
use search::{parse_keywords, Selection};
use store::{load_csv, Email, RecordStore};

// ============================================================================
// App State
// ============================================================================

/// Where the application is in its load/search lifecycle. The chart is a
/// pure function of the `Rendered` variant, so replacing the variant
/// replaces the chart and exactly one can exist at a time.
pub enum Phase {
    /// No table loaded; search and refresh are rejected.
    Idle,
    /// A table is loaded but nothing has been plotted yet.
    Loaded { store: RecordStore },
    /// A table is loaded and one selection is plotted.
    Rendered {
        store: RecordStore,
        selection: Selection,
        cursor: Cursor,
    },
}

/// A chart selection event: which sender series, and which point within it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub group: usize,
    pub row: usize,
}

pub struct Notice {
    pub text: String,
    pub is_error: bool,
}

impl Notice {
    fn info(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: false }
    }

    fn error(text: impl Into<String>) -> Self {
        Self { text: text.into(), is_error: true }
    }
}

pub struct App {
    pub query: String,
    pub phase: Phase,
    pub notice: Option<Notice>,
    pub picker: Option<FilePicker>,
    pub detail_scroll: usize,
    pub should_quit: bool,
}

impl App {
    fn new() -> Self {
        Self {
            query: String::new(),
            phase: Phase::Idle,
            notice: None,
            picker: None,
            detail_scroll: 0,
            should_quit: false,
        }
    }

    pub fn store(&self) -> Option<&RecordStore> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Loaded { store } | Phase::Rendered { store, .. } => Some(store),
        }
    }

    pub fn rendered(&self) -> Option<(&RecordStore, &Selection, Cursor)> {
        match &self.phase {
            Phase::Rendered { store, selection, cursor } => Some((store, selection, *cursor)),
            _ => None,
        }
    }

    pub fn selected_email(&self) -> Option<&Email> {
        let (store, selection, cursor) = self.rendered()?;
        selection.resolve(store, cursor.group, cursor.row)
    }

    /// Replace the store with a freshly loaded table. On failure the phase
    /// (and therefore the store) keeps its previous state.
    fn load_from(&mut self, path: &Path) {
        match load_csv(path) {
            Ok(store) => {
                self.notice = Some(Notice::info(format!(
                    "Loaded {} emails from {}",
                    store.len(),
                    path.display()
                )));
                self.detail_scroll = 0;
                self.phase = Phase::Loaded { store };
            }
            Err(err) => {
                self.notice = Some(Notice::error(format!("load failed: {err:#}")));
            }
        }
    }

    /// The search action: score, select, group, and plot. Rejected with a
    /// status-line error when no table is loaded.
    fn run_search(&mut self) {
        self.notice = None;
        self.detail_scroll = 0;
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {
                self.notice = Some(Notice::error(
                    "no table loaded — press Ctrl-L to load a CSV export first",
                ));
            }
            Phase::Loaded { store } | Phase::Rendered { store, .. } => {
                if store.is_empty() {
                    self.notice = Some(Notice::error(
                        "loaded table has no emails — load a different CSV export",
                    ));
                    self.phase = Phase::Loaded { store };
                    return;
                }
                let keywords = parse_keywords(&self.query);
                let selection = search::search(&store, &keywords);
                self.phase = Phase::Rendered {
                    store,
                    selection,
                    cursor: Cursor::default(),
                };
            }
        }
    }

    /// The refresh action: clear the keyword entry and search again.
    fn refresh(&mut self) {
        self.query.clear();
        self.run_search();
    }

    fn open_picker(&mut self) {
        self.notice = None;
        match FilePicker::open() {
            Ok(picker) => self.picker = Some(picker),
            Err(err) => self.notice = Some(Notice::error(format!("{err:#}"))),
        }
    }

    /// Move the point cursor across sender series, clamping the in-group
    /// row to the new series length.
    fn move_group(&mut self, delta: isize) {
        if let Phase::Rendered { selection, cursor, .. } = &mut self.phase {
            if selection.groups.is_empty() {
                return;
            }
            cursor.group = step(cursor.group, delta, selection.groups.len() - 1);
            let row_max = selection.groups[cursor.group].rows.len() - 1;
            cursor.row = cursor.row.min(row_max);
            self.detail_scroll = 0;
        }
    }

    /// Move the point cursor within the current sender series.
    fn move_row(&mut self, delta: isize) {
        if let Phase::Rendered { selection, cursor, .. } = &mut self.phase {
            let Some(group) = selection.groups.get(cursor.group) else {
                return;
            };
            cursor.row = step(cursor.row, delta, group.rows.len() - 1);
            self.detail_scroll = 0;
        }
    }

    fn scroll_detail(&mut self, delta: isize) {
        if delta < 0 {
            self.detail_scroll = self.detail_scroll.saturating_sub(delta.unsigned_abs());
        } else {
            self.detail_scroll = self.detail_scroll.saturating_add(delta as usize);
        }
    }

    fn on_escape(&mut self) {
        if self.query.is_empty() {
            self.should_quit = true;
        } else {
            self.query.clear();
        }
    }
}

fn step(value: usize, delta: isize, max: usize) -> usize {
    if delta < 0 {
        value.saturating_sub(delta.unsigned_abs())
    } else {
        value.saturating_add(delta as usize).min(max)
    }
}

// ============================================================================
// Key Handling
// ============================================================================

fn handle_key(app: &mut App, key: KeyEvent) {
    if app.picker.is_some() {
        handle_picker_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.open_picker();
        }
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.refresh();
        }
        KeyCode::Enter => app.run_search(),
        KeyCode::Esc => app.on_escape(),
        KeyCode::Backspace => {
            app.query.pop();
        }
        KeyCode::Up => app.move_group(-1),
        KeyCode::Down => app.move_group(1),
        KeyCode::Left => app.move_row(-1),
        KeyCode::Right => app.move_row(1),
        KeyCode::PageUp => app.scroll_detail(-5),
        KeyCode::PageDown => app.scroll_detail(5),
        KeyCode::Char(c) => app.query.push(c),
        _ => {}
    }
}

fn handle_picker_key(app: &mut App, key: KeyEvent) {
    enum Outcome {
        Stay,
        Close,
        Load(std::path::PathBuf),
        Fail(anyhow::Error),
    }

    let outcome = {
        let Some(picker) = app.picker.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => Outcome::Close,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.should_quit = true;
                Outcome::Close
            }
            KeyCode::Up | KeyCode::Char('k') => {
                picker.move_up();
                Outcome::Stay
            }
            KeyCode::Down | KeyCode::Char('j') => {
                picker.move_down();
                Outcome::Stay
            }
            KeyCode::Backspace | KeyCode::Left => match picker.ascend() {
                Ok(()) => Outcome::Stay,
                Err(err) => Outcome::Fail(err),
            },
            KeyCode::Enter => match picker.enter() {
                Ok(Some(path)) => Outcome::Load(path),
                Ok(None) => Outcome::Stay,
                Err(err) => Outcome::Fail(err),
            },
            _ => Outcome::Stay,
        }
    };

    match outcome {
        Outcome::Stay => {}
        Outcome::Close => app.picker = None,
        Outcome::Load(path) => {
            app.picker = None;
            app.load_from(&path);
        }
        Outcome::Fail(err) => {
            app.notice = Some(Notice::error(format!("{err:#}")));
        }
    }
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();

    loop {
        terminal.draw(|f| ui::render(f, &mut app))?;

        if app.should_quit {
            break;
        }

        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(&mut app, key);
                }
            }
        }

        std::thread::sleep(Duration::from_millis(16));
    }

    disable_raw_mode()?;
    execute!(io::stdout(), LeaveAlternateScreen)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write csv");
        file
    }

    fn sample_csv() -> tempfile::NamedTempFile {
        write_csv(
            "From (display),To (display),Subject,Date Sent,Cleaned_Body\n\
             Alice,Bob,First,1999-05-10 08:00:00,the refund is approved\n\
             Alice,Bob,Second,1999-05-11 08:00:00,refund sent yesterday\n\
             Carol,Alice,Third,1999-05-12 08:00:00,lunch plans\n",
        )
    }

    fn is_error(app: &App) -> bool {
        app.notice.as_ref().is_some_and(|n| n.is_error)
    }

    #[test]
    fn search_before_load_is_rejected_visibly() {
        let mut app = App::new();
        app.run_search();
        assert!(is_error(&app));
        assert!(matches!(app.phase, Phase::Idle));
    }

    #[test]
    fn refresh_before_load_is_rejected_visibly() {
        let mut app = App::new();
        app.query = "refund".to_string();
        app.refresh();
        assert!(is_error(&app));
        assert!(app.query.is_empty(), "refresh still clears the entry");
        assert!(matches!(app.phase, Phase::Idle));
    }

    #[test]
    fn load_then_search_renders_a_selection() {
        let csv = sample_csv();
        let mut app = App::new();
        app.load_from(csv.path());
        assert!(!is_error(&app));
        assert!(matches!(app.phase, Phase::Loaded { .. }));

        app.query = "refund".to_string();
        app.run_search();
        let (_, selection, cursor) = app.rendered().expect("rendered");
        assert_eq!(selection.picks.len(), 3);
        assert_eq!(cursor, Cursor::default());
    }

    #[test]
    fn search_is_idempotent_for_fixed_table_and_keywords() {
        let csv = sample_csv();
        let mut app = App::new();
        app.load_from(csv.path());
        app.query = "refund".to_string();
        app.run_search();
        let first = app.rendered().expect("rendered").1.picks.clone();
        app.run_search();
        let second = app.rendered().expect("rendered").1.picks.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn failed_load_keeps_the_previous_store() {
        let csv = sample_csv();
        let mut app = App::new();
        app.load_from(csv.path());
        app.query = "refund".to_string();
        app.run_search();

        // Missing required columns.
        let bad = write_csv("a,b\n1,2\n");
        app.load_from(bad.path());
        assert!(is_error(&app));
        let (store, _, _) = app.rendered().expect("still rendered");
        assert_eq!(store.len(), 3);

        // Unreadable path.
        app.load_from(Path::new("/nonexistent/mail.csv"));
        assert!(is_error(&app));
        assert_eq!(app.store().expect("store kept").len(), 3);
    }

    #[test]
    fn search_on_an_empty_table_is_rejected_visibly() {
        let csv = write_csv("From (display),To (display),Subject,Date Sent,Cleaned_Body\n");
        let mut app = App::new();
        app.load_from(csv.path());
        assert!(matches!(app.phase, Phase::Loaded { .. }));

        app.run_search();
        assert!(is_error(&app));
        assert!(app.rendered().is_none());
    }

    #[test]
    fn loading_a_new_table_discards_the_rendering() {
        let csv = sample_csv();
        let mut app = App::new();
        app.load_from(csv.path());
        app.run_search();
        assert!(app.rendered().is_some());

        app.load_from(csv.path());
        assert!(matches!(app.phase, Phase::Loaded { .. }));
        assert!(app.rendered().is_none());
    }

    #[test]
    fn refresh_clears_keywords_and_rerenders() {
        let csv = sample_csv();
        let mut app = App::new();
        app.load_from(csv.path());
        app.query = "refund".to_string();
        app.run_search();

        app.refresh();
        assert!(app.query.is_empty());
        let (_, selection, _) = app.rendered().expect("rendered");
        // Everything scores 0, so the stable tie-break keeps row order and
        // the date sort then orders chronologically (same thing here).
        assert_eq!(selection.picks, vec![0, 1, 2]);
    }

    #[test]
    fn cursor_navigation_clamps_and_resolves_records() {
        let csv = sample_csv();
        let mut app = App::new();
        app.load_from(csv.path());
        app.query = "refund".to_string();
        app.run_search();

        // Groups: Alice (2 rows), Carol (1 row).
        app.move_row(1);
        let hit = app.selected_email().expect("second point of group 0");
        assert_eq!(hit.subject.as_deref(), Some("Second"));

        app.move_row(5);
        assert_eq!(app.rendered().expect("rendered").2.row, 1, "row clamps");

        app.move_group(1);
        let cursor = app.rendered().expect("rendered").2;
        assert_eq!(cursor.group, 1);
        assert_eq!(cursor.row, 0, "row clamps to the smaller series");
        assert_eq!(
            app.selected_email().and_then(|e| e.sender.as_deref()),
            Some("Carol")
        );

        app.move_group(-9);
        assert_eq!(app.rendered().expect("rendered").2.group, 0);
    }

    #[test]
    fn escape_clears_the_query_then_quits() {
        let mut app = App::new();
        app.query = "refund".to_string();
        app.on_escape();
        assert!(app.query.is_empty());
        assert!(!app.should_quit);
        app.on_escape();
        assert!(app.should_quit);
    }

    #[test]
    fn typed_characters_edit_the_keyword_entry() {
        let mut app = App::new();
        for c in "re, fund".chars() {
            handle_key(&mut app, KeyEvent::from(KeyCode::Char(c)));
        }
        handle_key(&mut app, KeyEvent::from(KeyCode::Backspace));
        assert_eq!(app.query, "re, fun");
    }
}
