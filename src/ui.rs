//! All rendering: search bar, scatter chart, detail panel, status bar, and
//! the file chooser modal.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, Borders, Chart, Clear, Dataset, GraphType, List, ListItem, ListState,
        Paragraph, Wrap,
    },
    Frame,
};

use crate::search::Selection;
use crate::store::{Email, RecordStore};
use crate::App;

// ============================================================================
// Theme
// ============================================================================

pub struct Theme {
    pub search_bg: Color,
    pub placeholder_fg: Color,
    pub accent: Color,
    pub dim_fg: Color,
    pub keycap_bg: Color,
    pub separator_fg: Color,
    pub selection_bg: Color,
    pub label_fg: Color,
    pub error_fg: Color,
    pub info_fg: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            search_bg: Color::Rgb(30, 30, 35),
            placeholder_fg: Color::Rgb(100, 100, 100),
            accent: Color::Cyan,
            dim_fg: Color::Rgb(100, 100, 100),
            keycap_bg: Color::Rgb(60, 60, 65),
            separator_fg: Color::Rgb(60, 60, 65),
            selection_bg: Color::Rgb(50, 50, 55),
            label_fg: Color::Rgb(80, 180, 220),
            error_fg: Color::Rgb(240, 100, 100),
            info_fg: Color::Rgb(80, 200, 120),
        }
    }
}

/// One color per sender series, cycled when there are more senders.
pub const SERIES_PALETTE: [Color; 8] = [
    Color::Cyan,
    Color::Yellow,
    Color::Green,
    Color::Magenta,
    Color::LightBlue,
    Color::LightRed,
    Color::LightGreen,
    Color::LightMagenta,
];

// ============================================================================
// Top-level layout
// ============================================================================

pub fn render(frame: &mut Frame, app: &mut App) {
    let t = Theme::dark();
    let area = frame.area();

    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Keyword bar
            Constraint::Min(8),     // Chart
            Constraint::Length(13), // Detail panel
            Constraint::Length(1),  // Status bar
        ])
        .split(area);

    render_keyword_bar(frame, app, &t, main_layout[0]);
    render_chart(frame, app, &t, main_layout[1]);
    render_detail(frame, app, &t, main_layout[2]);
    render_status_bar(frame, app, &t, main_layout[3]);

    if app.picker.is_some() {
        render_picker_modal(frame, app, &t, area);
    }
}

// ============================================================================
// Keyword bar
// ============================================================================

fn render_keyword_bar(frame: &mut Frame, app: &App, t: &Theme, area: Rect) {
    let count_label = match app.store() {
        Some(store) => format!("{} emails", store.len()),
        None => "no table".to_string(),
    };

    let middle = if app.query.is_empty() {
        Line::from(vec![
            Span::styled(
                " Keywords (comma separated)...",
                Style::default().fg(t.placeholder_fg),
            ),
            Span::styled(" │ ", Style::default().fg(t.separator_fg)),
            Span::styled(count_label, Style::default().fg(t.dim_fg)),
        ])
    } else {
        Line::from(vec![
            Span::raw(" "),
            Span::raw(app.query.clone()),
            Span::styled("█", Style::default().fg(t.accent)),
            Span::styled(" │ ", Style::default().fg(t.separator_fg)),
            Span::styled(count_label, Style::default().fg(t.dim_fg)),
        ])
    };

    let lines = vec![Line::from(""), middle, Line::from("")];
    let paragraph = Paragraph::new(lines).style(Style::default().bg(t.search_bg));
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Scatter chart
// ============================================================================

/// Point geometry for one rendered selection, kept separate from the
/// widget so the placement rules are testable.
pub struct ScatterLayout {
    /// One point series per sender group, parallel to `Selection::groups`.
    pub series: Vec<Vec<(f64, f64)>>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_labels: Vec<String>,
    pub y_labels: Vec<String>,
    /// X position given to records with the sentinel invalid date, pinned
    /// past the right edge of the valid range. `None` when every pick has
    /// a parseable date, or when none does (ordinal fallback).
    pub sentinel_x: Option<f64>,
}

pub fn scatter_layout(store: &RecordStore, selection: &Selection) -> ScatterLayout {
    const DAY: f64 = 86_400.0;

    let stamp = |index: usize| -> Option<f64> {
        store.emails[index]
            .date_sent
            .map(|dt| dt.and_utc().timestamp() as f64)
    };

    let valid: Vec<f64> = selection.picks.iter().filter_map(|&i| stamp(i)).collect();
    let has_invalid = valid.len() < selection.picks.len();

    let (x_bounds, sentinel_x, x_labels) = if valid.is_empty() {
        // Nothing parseable: fall back to selection order on the x axis.
        let hi = selection.picks.len().max(1) as f64;
        ([-1.0, hi], None, Vec::new())
    } else {
        let min = valid.iter().copied().fold(f64::INFINITY, f64::min);
        let max = valid.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let pad = ((max - min).max(DAY)) * 0.05;
        let sentinel = has_invalid.then_some(max + pad);
        let hi = sentinel.unwrap_or(max) + pad;
        let mid = (min + max) / 2.0;
        let mut labels = vec![date_label(min), date_label(mid)];
        labels.push(if has_invalid {
            "no date".to_string()
        } else {
            date_label(max)
        });
        ([min - pad, hi], sentinel, labels)
    };

    let series: Vec<Vec<(f64, f64)>> = selection
        .groups
        .iter()
        .enumerate()
        .map(|(group_idx, group)| {
            group
                .rows
                .iter()
                .map(|&index| {
                    let x = stamp(index).or(sentinel_x).unwrap_or_else(|| {
                        selection.picks.iter().position(|&p| p == index).unwrap_or(0) as f64
                    });
                    (x, group_idx as f64)
                })
                .collect()
        })
        .collect();

    // Labels at -1, 0, 1, .., n are evenly spaced over [-1, n], so the
    // blank end labels keep each sender name aligned with its row.
    let mut y_labels = vec![String::new()];
    y_labels.extend(selection.groups.iter().map(|g| truncate(&g.sender, 16)));
    y_labels.push(String::new());

    ScatterLayout {
        series,
        x_bounds,
        y_bounds: [-1.0, selection.groups.len() as f64],
        x_labels,
        y_labels,
        sentinel_x,
    }
}

fn date_label(stamp: f64) -> String {
    chrono::DateTime::from_timestamp(stamp as i64, 0)
        .map(|dt| dt.format("%m/%d/%y").to_string())
        .unwrap_or_default()
}

fn render_chart(frame: &mut Frame, app: &App, t: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Sender × Date ")
        .border_style(Style::default().fg(t.separator_fg));

    let Some((store, selection, cursor)) = app.rendered() else {
        let hint = match app.store() {
            None => "No table loaded. Press Ctrl-L to choose a CSV export.",
            Some(_) => "Type keywords (comma separated) and press Enter to search.",
        };
        let paragraph = Paragraph::new(Span::styled(hint, Style::default().fg(t.dim_fg)))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    if selection.picks.is_empty() {
        let paragraph = Paragraph::new(Span::styled(
            "No emails to plot.",
            Style::default().fg(t.dim_fg),
        ))
        .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let layout = scatter_layout(store, selection);

    let mut datasets: Vec<Dataset> = selection
        .groups
        .iter()
        .zip(&layout.series)
        .enumerate()
        .map(|(i, (group, points))| {
            Dataset::default()
                .name(truncate(&group.sender, 18))
                .marker(symbols::Marker::Dot)
                .graph_type(GraphType::Scatter)
                .style(Style::default().fg(SERIES_PALETTE[i % SERIES_PALETTE.len()]))
                .data(points)
        })
        .collect();

    // The point cursor, drawn on top of its series.
    let cursor_point: Vec<(f64, f64)> = layout
        .series
        .get(cursor.group)
        .and_then(|points| points.get(cursor.row))
        .map(|&p| vec![p])
        .unwrap_or_default();
    datasets.push(
        Dataset::default()
            .marker(symbols::Marker::Block)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(Color::White).add_modifier(Modifier::BOLD))
            .data(&cursor_point),
    );

    let title = format!(" Top {} emails — Sender × Date ", selection.picks.len());
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(t.separator_fg)),
        )
        .x_axis(
            Axis::default()
                .title("Date")
                .style(Style::default().fg(t.dim_fg))
                .bounds(layout.x_bounds)
                .labels(layout.x_labels),
        )
        .y_axis(
            Axis::default()
                .title("Sender")
                .style(Style::default().fg(t.dim_fg))
                .bounds(layout.y_bounds)
                .labels(layout.y_labels),
        );
    frame.render_widget(chart, area);
}

// ============================================================================
// Detail panel
// ============================================================================

/// The five displayed fields, with "N/A" substituted for absent values.
pub fn detail_fields(email: &Email) -> [(&'static str, String); 5] {
    let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| "N/A".to_string());
    [
        ("Date Sent", email.date_display()),
        ("Subject", or_na(&email.subject)),
        ("From", or_na(&email.sender)),
        ("To", or_na(&email.recipient)),
        ("Cleaned Body", or_na(&email.body)),
    ]
}

fn render_detail(frame: &mut Frame, app: &mut App, t: &Theme, area: Rect) {
    let inner_width = area.width.saturating_sub(4) as usize;

    let lines: Vec<Line<'static>> = match app.selected_email() {
        Some(email) => {
            let fields = detail_fields(email);
            let mut lines = Vec::new();
            for (label, value) in &fields[..4] {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("{label:>10}: "),
                        Style::default().fg(t.label_fg),
                    ),
                    Span::raw(value.clone()),
                ]));
            }
            let (label, body) = &fields[4];
            lines.push(Line::from(Span::styled(
                format!("{label}:"),
                Style::default().fg(t.label_fg),
            )));
            for wrapped in wrap_text(body, inner_width.max(1)) {
                lines.push(Line::from(Span::raw(wrapped)));
            }
            lines
        }
        None => vec![Line::from(Span::styled(
            "Select a point on the chart with ↑↓←→ to inspect an email.",
            Style::default().fg(t.dim_fg),
        ))],
    };

    let visible = area.height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(visible.min(lines.len()));
    app.detail_scroll = app.detail_scroll.min(max_scroll);

    let visible_lines: Vec<Line> = lines.into_iter().skip(app.detail_scroll).collect();
    let paragraph = Paragraph::new(visible_lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Email ")
                .border_style(Style::default().fg(t.separator_fg)),
        );
    frame.render_widget(paragraph, area);
}

// ============================================================================
// Status bar
// ============================================================================

fn render_status_bar(frame: &mut Frame, app: &App, t: &Theme, area: Rect) {
    if let Some(notice) = &app.notice {
        let fg = if notice.is_error { t.error_fg } else { t.info_fg };
        let line = Line::from(Span::styled(
            format!(" {}", notice.text),
            Style::default().fg(fg),
        ));
        frame.render_widget(Paragraph::new(line), area);
        return;
    }

    let keycap = Style::default().bg(t.keycap_bg);
    let label = Style::default();
    let dim = Style::default().fg(t.dim_fg);

    let spans = vec![
        Span::styled(" C-l ", keycap),
        Span::styled(" load ", label),
        Span::styled(" │ ", dim),
        Span::styled(" Enter ", keycap),
        Span::styled(" search ", label),
        Span::styled(" │ ", dim),
        Span::styled(" C-r ", keycap),
        Span::styled(" refresh ", label),
        Span::styled(" │ ", dim),
        Span::styled(" ↑↓←→ ", keycap),
        Span::styled(" pick point ", label),
        Span::styled(" │ ", dim),
        Span::styled(" PgUp/Dn ", keycap),
        Span::styled(" body ", label),
        Span::styled(" │ ", dim),
        Span::styled(" Esc ", keycap),
        Span::styled(" clear/quit", label),
    ];
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ============================================================================
// File chooser modal
// ============================================================================

fn render_picker_modal(frame: &mut Frame, app: &mut App, t: &Theme, area: Rect) {
    let Some(picker) = app.picker.as_mut() else {
        return;
    };

    let modal_width = 64u16.min(area.width.saturating_sub(4));
    let modal_height = 18u16.min(area.height.saturating_sub(2));
    let x = (area.width.saturating_sub(modal_width)) / 2;
    let y = (area.height.saturating_sub(modal_height)) / 2;
    let modal_area = Rect::new(x, y, modal_width, modal_height);

    frame.render_widget(Clear, modal_area);
    let block = Block::default()
        .title(" Load CSV ")
        .borders(Borders::ALL)
        .style(Style::default().bg(t.search_bg));
    frame.render_widget(block, modal_area);

    let inner = Rect::new(
        x + 2,
        y + 1,
        modal_width.saturating_sub(4),
        modal_height.saturating_sub(2),
    );
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Current directory
            Constraint::Min(1),    // Entries
            Constraint::Length(1), // Hints
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            truncate(&picker.dir_display(), inner.width as usize),
            Style::default().fg(t.accent),
        )),
        chunks[0],
    );

    if picker.entries.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "No CSV files here.",
                Style::default().fg(t.dim_fg),
            )),
            chunks[1],
        );
    } else {
        let items: Vec<ListItem> = picker
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let prefix = if i == picker.selected { "▶ " } else { "  " };
                let name = if entry.is_dir {
                    format!("{prefix}{}/", entry.name)
                } else {
                    format!("{prefix}{}", entry.name)
                };
                let style = if i == picker.selected {
                    Style::default().bg(t.selection_bg).fg(t.accent)
                } else if entry.is_dir {
                    Style::default().fg(t.dim_fg)
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(name, style)))
            })
            .collect();

        let visible = chunks[1].height as usize;
        if picker.selected < picker.scroll {
            picker.scroll = picker.selected;
        } else if visible > 0 && picker.selected >= picker.scroll + visible {
            picker.scroll = picker.selected - visible + 1;
        }

        let mut state = ListState::default();
        state.select(Some(picker.selected));
        *state.offset_mut() = picker.scroll;
        frame.render_stateful_widget(List::new(items), chunks[1], &mut state);
    }

    let keycap = Style::default().bg(t.keycap_bg);
    let dim = Style::default().fg(t.dim_fg);
    let hints = Line::from(vec![
        Span::styled(" Enter ", keycap),
        Span::styled(" open ", dim),
        Span::styled(" Bksp ", keycap),
        Span::styled(" up ", dim),
        Span::styled(" Esc ", keycap),
        Span::styled(" cancel", dim),
    ]);
    frame.render_widget(Paragraph::new(hints), chunks[2]);
}

// ============================================================================
// Helpers
// ============================================================================

fn truncate(s: &str, max: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max {
        format!("{}…", chars[..max.saturating_sub(1)].iter().collect::<String>())
    } else {
        s.to_string()
    }
}

fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            result.push(String::new());
            continue;
        }
        let mut current = String::new();
        let mut width = 0;
        for word in line.split_whitespace() {
            let word_len = word.chars().count();
            if width == 0 {
                current = word.to_string();
                width = word_len;
            } else if width + 1 + word_len <= max_width {
                current.push(' ');
                current.push_str(word);
                width += 1 + word_len;
            } else {
                result.push(current);
                current = word.to_string();
                width = word_len;
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }
    if result.is_empty() {
        result.push(String::new());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{parse_keywords, search};
    use crate::store::{parse_date, Email};

    fn email(sender: Option<&str>, date: Option<&str>, body: Option<&str>) -> Email {
        Email {
            sender: sender.map(str::to_string),
            recipient: None,
            subject: None,
            date_raw: date.map(str::to_string),
            date_sent: date.and_then(parse_date),
            body: body.map(str::to_string),
        }
    }

    #[test]
    fn sentinel_points_sit_past_the_valid_range() {
        let store = RecordStore {
            emails: vec![
                email(Some("a"), Some("1999-05-10 00:00:00"), Some("refund")),
                email(Some("a"), Some("1999-05-20 00:00:00"), Some("refund")),
                email(Some("b"), None, Some("refund")),
            ],
        };
        let selection = search(&store, &parse_keywords("refund"));
        let layout = scatter_layout(&store, &selection);

        let sentinel = layout.sentinel_x.expect("one record has no date");
        let max_valid = store.emails[1].date_sent.unwrap().and_utc().timestamp() as f64;
        assert!(sentinel > max_valid);
        assert!(layout.x_bounds[1] > sentinel);
        assert_eq!(layout.x_labels.last().map(String::as_str), Some("no date"));

        // Group "b" holds only the sentinel record.
        let b_idx = selection
            .groups
            .iter()
            .position(|g| g.sender == "b")
            .expect("group b");
        assert_eq!(layout.series[b_idx], vec![(sentinel, b_idx as f64)]);
    }

    #[test]
    fn points_use_group_index_as_y() {
        let store = RecordStore {
            emails: vec![
                email(Some("a"), Some("1999-05-10 00:00:00"), Some("refund")),
                email(Some("a"), Some("1999-05-11 00:00:00"), Some("refund")),
                email(Some("b"), Some("1999-05-12 00:00:00"), Some("refund")),
            ],
        };
        let selection = search(&store, &parse_keywords("refund"));
        let layout = scatter_layout(&store, &selection);

        assert!(layout.series[0].iter().all(|&(_, y)| y == 0.0));
        assert!(layout.series[1].iter().all(|&(_, y)| y == 1.0));
        // Blank end labels plus one per group.
        assert_eq!(layout.y_labels.len(), selection.groups.len() + 2);
        assert_eq!(layout.y_bounds, [-1.0, 2.0]);
    }

    #[test]
    fn all_invalid_dates_fall_back_to_selection_order() {
        let store = RecordStore {
            emails: vec![
                email(Some("a"), None, Some("refund")),
                email(Some("a"), None, Some("refund")),
            ],
        };
        let selection = search(&store, &parse_keywords("refund"));
        let layout = scatter_layout(&store, &selection);
        assert!(layout.sentinel_x.is_none());
        assert_eq!(layout.series[0], vec![(0.0, 0.0), (1.0, 0.0)]);
    }

    #[test]
    fn detail_fields_substitute_na_for_absent_values() {
        let full = email(Some("Alice"), Some("1999-05-11 08:18:00"), Some("hello"));
        let fields = detail_fields(&full);
        assert_eq!(fields[0], ("Date Sent", "05/11/99 08:18:00".to_string()));
        assert_eq!(fields[2], ("From", "Alice".to_string()));

        let bare = email(None, None, None);
        let fields = detail_fields(&bare);
        for (_, value) in &fields {
            assert_eq!(value, "N/A");
        }
    }

    #[test]
    fn na_is_only_for_absent_fields_not_empty_looking_text() {
        let spaced = email(Some(" "), None, None);
        let fields = detail_fields(&spaced);
        assert_eq!(fields[2], ("From", " ".to_string()));
    }

    #[test]
    fn wrap_text_respects_width() {
        let wrapped = wrap_text("one two three four", 9);
        assert_eq!(wrapped, vec!["one two", "three", "four"]);
        assert_eq!(wrap_text("", 10), vec![String::new()]);
    }

    #[test]
    fn truncate_appends_ellipsis() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
