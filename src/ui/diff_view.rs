use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

use super::styles;
use crate::app::App;
use crate::diff::{ChangeKind, DiffChunkType, ProcessedLine, Section};

/// Render the diff view panel (right side)
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let file = match app.selected_entry() {
        Some(file) => file,
        None => {
            render_empty(f, area, app.files.is_empty());
            return;
        }
    };

    let lines = build_lines(app, app.selected_file);
    let block = Block::default()
        .title(Span::styled(
            format!(" {} ", file.path),
            Style::default().fg(styles::BRIGHT),
        ))
        .borders(Borders::NONE)
        .style(Style::default().bg(styles::BG))
        .padding(Padding::new(0, 1, 0, 0));

    let scroll = u16::try_from(app.scroll).unwrap_or(u16::MAX);
    let paragraph = Paragraph::new(lines).block(block).scroll((scroll, 0));
    f.render_widget(paragraph, area);

    // Fold indicator in the top-right corner
    let keys = app.fold_keys_for(app.selected_file);
    if !keys.is_empty() {
        let position = app
            .focused_fold
            .and_then(|focused| keys.iter().position(|k| *k == focused))
            .map(|p| format!("{}/", p + 1))
            .unwrap_or_default();
        let indicator_text = format!("Fold {}{}", position, keys.len());
        let indicator_width = indicator_text.chars().count() as u16 + 3;
        let indicator_area = Rect {
            x: area.x + area.width.saturating_sub(indicator_width + 1),
            y: area.y,
            width: indicator_width.min(area.width),
            height: 1,
        };
        let indicator = Paragraph::new(Line::from(Span::styled(
            indicator_text,
            Style::default().fg(styles::MUTED),
        )));
        f.render_widget(indicator, indicator_area);
    }
}

/// Build every row of one file: header, blank line, then its sections.
/// Row count matches `App::total_rows` so scroll targets line up.
pub fn build_lines(app: &App, file_index: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let Some(file) = app.files.get(file_index) else {
        return lines;
    };

    let kind_style = match file.kind {
        ChangeKind::Added => styles::status_added(),
        ChangeKind::Deleted => styles::status_deleted(),
        ChangeKind::Modified => styles::status_modified(),
    };
    let folds = app.fold_keys_for(file_index).len();
    let open = app.expanded.count_in_file(file_index);
    let mut header = vec![
        Span::styled(format!("  {} ", file.kind.symbol()), kind_style),
        Span::styled(file.path.clone(), Style::default().fg(styles::BRIGHT)),
        Span::styled(
            format!("  +{} -{}", file.adds, file.dels),
            Style::default().fg(styles::DIM),
        ),
    ];
    if folds > 0 {
        header.push(Span::styled(
            format!("  · {} folds ({} open)", folds, open),
            Style::default().fg(styles::MUTED),
        ));
    }
    lines.push(Line::from(header));
    lines.push(Line::from(""));

    let show_numbers = app.config.display.line_numbers;
    let tab_width = app.config.display.tab_width as usize;

    for section in app.sections_for(file_index) {
        match section {
            Section::Context(rows) | Section::Change(rows) => {
                for line in rows {
                    lines.push(code_line(line, show_numbers, tab_width));
                }
            }
            Section::Collapsed(key) => {
                lines.push(fold_line(
                    app.focused_fold == Some(key),
                    format!("⋯ {} hidden lines", key.len()),
                ));
            }
            Section::Expanded(key, rows) => {
                lines.push(fold_line(
                    app.focused_fold == Some(key),
                    format!("▾ {} lines expanded", key.len()),
                ));
                for line in rows {
                    lines.push(code_line(line, show_numbers, tab_width));
                }
            }
        }
    }

    lines
}

fn fold_line(focused: bool, label: String) -> Line<'static> {
    let (marker, style) = if focused {
        ("▶", styles::fold_focus_style())
    } else {
        (" ", styles::fold_style())
    };
    let mut spans = vec![
        Span::styled(format!(" {} ", marker), style),
        Span::styled(label, style),
    ];
    if focused {
        spans.push(Span::styled("  (Enter to toggle)", Style::default().fg(styles::DIM)));
    }
    Line::from(spans).style(style)
}

fn code_line(line: &ProcessedLine, show_numbers: bool, tab_width: usize) -> Line<'static> {
    let (base_style, gutter_style) = match line.chunk_type {
        DiffChunkType::Insert => (
            styles::add_style(),
            Style::default().fg(styles::DIM).bg(styles::ADD_BG),
        ),
        DiffChunkType::Delete => (
            styles::del_style(),
            Style::default().fg(styles::DIM).bg(styles::DEL_BG),
        ),
        DiffChunkType::Equal => (styles::default_style(), Style::default().fg(styles::DIM)),
    };

    let mut spans = Vec::with_capacity(3);
    if show_numbers {
        let old_num = line
            .old_line_number
            .map(|n| format!("{:>4}", n))
            .unwrap_or_else(|| "    ".to_string());
        let new_num = line
            .new_line_number
            .map(|n| format!("{:>4}", n))
            .unwrap_or_else(|| "    ".to_string());
        spans.push(Span::styled(format!("{} {} │", old_num, new_num), gutter_style));
    }
    spans.push(Span::styled(line.chunk_type.prefix().to_string(), base_style));
    spans.push(Span::styled(
        line.content.replace('\t', &" ".repeat(tab_width)),
        base_style,
    ));

    Line::from(spans).style(base_style)
}

/// Render an empty state when no file is selected
fn render_empty(f: &mut Frame, area: Rect, no_files: bool) {
    let block = Block::default()
        .borders(Borders::NONE)
        .style(Style::default().bg(styles::BG));

    let (title, hint) = if no_files {
        ("  No files changed", "  Press r to reload")
    } else {
        ("  No files match the filter", "  Press f to change the filter")
    };
    let text = Paragraph::new(vec![
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(title, Style::default().fg(styles::MUTED))),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(styles::DIM))),
    ])
    .block(block);

    f.render_widget(text, area);
}
