use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use super::styles;
use crate::app::App;
use crate::diff::EdgeContext;

/// Render the top status bar: source, fold settings, open fold count
pub fn render_top_bar(f: &mut Frame, area: Rect, app: &App) {
    let edges = match app.options.edge_context {
        EdgeContext::Full => "full",
        EdgeContext::Collapse => "collapse",
    };
    let left = vec![
        Span::styled(
            " foldiff ",
            Style::default()
                .fg(styles::BG)
                .bg(styles::BLUE)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {} ", app.source.label()), Style::default().fg(styles::BRIGHT)),
        Span::styled(
            format!("· radius {} · edges {}", app.options.context_radius, edges),
            Style::default().fg(styles::MUTED),
        ),
    ];

    let mut right = String::new();
    if app.watching {
        right.push_str("watching ");
    }
    if !app.expanded.is_empty() {
        right.push_str(&format!("· {} open ", app.expanded.len()));
    }

    let left_width: usize = left.iter().map(|s| s.content.chars().count()).sum();
    let pad = (area.width as usize).saturating_sub(left_width + right.chars().count());

    let mut spans = left;
    spans.push(Span::raw(" ".repeat(pad)));
    spans.push(Span::styled(right, Style::default().fg(styles::DIM)));

    let bar = Paragraph::new(Line::from(spans)).style(Style::default().bg(styles::PANEL));
    f.render_widget(bar, area);
}

/// A key hint shown in the bottom bar
struct Hint {
    key: &'static str,
    label: &'static str,
}

impl Hint {
    fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }

    fn width(&self) -> usize {
        self.key.chars().count() + self.label.chars().count()
    }
}

fn build_hints(app: &App) -> Vec<Hint> {
    let mut hints = vec![
        Hint::new("j/k", " scroll "),
        Hint::new("J/K", " files "),
        Hint::new("n/p", " folds "),
        Hint::new("⏎", " toggle "),
        Hint::new("e/c", " expand/collapse all "),
        Hint::new("f", " filter "),
        Hint::new("r", " reload "),
    ];
    hints.push(if app.watching {
        Hint::new("w", " stop watching ")
    } else {
        Hint::new("w", " watch ")
    });
    hints.push(Hint::new("q", " quit "));
    hints
}

/// Pack hints into as many rows as the width requires
fn pack_hint_lines(hints: &[Hint], width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current_spans: Vec<Span<'static>> = Vec::new();
    let mut current_w: usize = 1; // leading space

    for hint in hints {
        let hw = hint.width();
        if current_w + hw > width && !current_spans.is_empty() {
            lines.push(Line::from(current_spans));
            current_spans = Vec::new();
            current_w = 1;
        }
        if current_spans.is_empty() {
            current_spans.push(Span::raw(" "));
        }
        current_spans.push(Span::styled(hint.key, styles::key_hint_style()));
        current_spans.push(Span::styled(hint.label, Style::default().fg(styles::DIM)));
        current_w += hw;
    }
    if !current_spans.is_empty() {
        lines.push(Line::from(current_spans));
    }
    if lines.is_empty() {
        lines.push(Line::from(vec![Span::raw(" ")]));
    }
    lines
}

/// Rows the bottom bar needs at this width
pub fn bottom_bar_height(app: &App, width: u16) -> u16 {
    if app.filter_input.is_some() {
        return 1;
    }
    let lines = pack_hint_lines(&build_hints(app), width as usize);
    (lines.len() as u16).max(1)
}

/// Render the bottom bar: filter prompt while editing, key hints otherwise
pub fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let panel_bg = Style::default().bg(styles::PANEL);

    if let Some(input) = &app.filter_input {
        let spans = vec![
            Span::styled(
                " filter ",
                Style::default()
                    .fg(styles::BG)
                    .bg(styles::YELLOW)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" {}", input), Style::default().fg(styles::TEXT)),
            Span::styled("█", Style::default().fg(styles::YELLOW)),
            Span::raw("  "),
            Span::styled("Enter", styles::key_hint_style()),
            Span::styled(" apply  ", Style::default().fg(styles::DIM)),
            Span::styled("Esc", styles::key_hint_style()),
            Span::styled(" cancel", Style::default().fg(styles::DIM)),
        ];
        f.render_widget(Paragraph::new(Line::from(spans)).style(panel_bg), area);
        return;
    }

    let lines = pack_hint_lines(&build_hints(app), area.width as usize);
    let constraints: Vec<ratatui::layout::Constraint> = lines
        .iter()
        .map(|_| ratatui::layout::Constraint::Length(1))
        .collect();
    let rows = ratatui::layout::Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, line) in lines.into_iter().enumerate() {
        f.render_widget(Paragraph::new(line).style(panel_bg), rows[i]);
    }
}

/// Render a transient notification in the top-right corner
pub fn render_notification(f: &mut Frame, area: Rect, message: &str) {
    let notif_width = message.chars().count() as u16 + 4;
    let notif_area = Rect {
        x: area.x + area.width.saturating_sub(notif_width + 2),
        y: area.y + 2,
        width: notif_width.min(area.width),
        height: 1,
    };

    let notif = Paragraph::new(Line::from(vec![
        Span::styled(" ● ", Style::default().fg(styles::GREEN)),
        Span::styled(message.to_string(), Style::default().fg(styles::TEXT)),
        Span::raw(" "),
    ]))
    .style(Style::default().bg(styles::PANEL).fg(styles::TEXT));

    f.render_widget(notif, notif_area);
}
