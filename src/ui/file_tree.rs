use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Padding},
    Frame,
};

use super::styles;
use crate::app::App;
use crate::diff::ChangeKind;

/// Render the file list panel (left side)
pub fn render(f: &mut Frame, area: Rect, app: &App) {
    let visible = app.visible_files();
    let total = app.files.len();
    let title = if app.filter_expr.is_empty() {
        format!(" FILES ({}) ", total)
    } else {
        format!(" FILES ({}/{}) ", visible.len(), total)
    };

    // Only render items in the viewport window, keeping the selection centered
    let viewport_height = area.height.saturating_sub(1) as usize;
    let selected_pos = visible
        .iter()
        .position(|&i| i == app.selected_file)
        .unwrap_or(0);
    let file_scroll = if visible.len() <= viewport_height || selected_pos < viewport_height / 2 {
        0
    } else if selected_pos > visible.len().saturating_sub(viewport_height / 2) {
        visible.len().saturating_sub(viewport_height)
    } else {
        selected_pos.saturating_sub(viewport_height / 2)
    };
    let viewport_end = (file_scroll + viewport_height).min(visible.len());

    let items: Vec<ListItem> = visible[file_scroll..viewport_end]
        .iter()
        .filter_map(|&idx| app.files.get(idx).map(|file| (idx, file)))
        .map(|(idx, file)| {
            let is_selected = idx == app.selected_file;
            let symbol_style = match file.kind {
                ChangeKind::Added => styles::status_added(),
                ChangeKind::Deleted => styles::status_deleted(),
                ChangeKind::Modified => styles::status_modified(),
            };

            let path_width = (area.width as usize).saturating_sub(14).max(1);
            let path = shorten_path(&file.path, path_width);
            let stats = format!("+{} -{}", file.adds, file.dels);

            let mut spans = vec![
                Span::styled(format!(" {} ", file.kind.symbol()), symbol_style),
                Span::styled(
                    format!("{:<width$}", path, width = path_width),
                    if is_selected {
                        styles::selected_style()
                    } else {
                        Style::default().fg(styles::TEXT)
                    },
                ),
            ];
            if area.width > 24 {
                spans.push(Span::styled(
                    format!("{:>8} ", stats),
                    Style::default().fg(styles::DIM),
                ));
            }

            let line_style = if is_selected {
                styles::selected_style()
            } else {
                styles::surface_style()
            };
            ListItem::new(Line::from(spans)).style(line_style)
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(title, Style::default().fg(styles::MUTED)))
        .borders(Borders::RIGHT)
        .border_style(Style::default().fg(styles::BORDER))
        .style(Style::default().bg(styles::SURFACE))
        .padding(Padding::new(0, 0, 0, 0));

    f.render_widget(List::new(items).block(block), area);
}

/// Shorten a path to fit within `max_width` characters, keeping the file name
fn shorten_path(path: &str, max_width: usize) -> String {
    if path.chars().count() <= max_width {
        return path.to_string();
    }

    if let Some((dir, name)) = path.rsplit_once('/') {
        let name_len = name.chars().count();
        if name_len <= max_width {
            let remaining = max_width.saturating_sub(name_len + 2);
            if remaining > 0 {
                let dir_part: String = dir.chars().take(remaining).collect();
                return format!("{}…/{}", dir_part, name);
            }
            return name.to_string();
        }
        let truncated: String = name.chars().take(max_width.saturating_sub(1)).collect();
        return format!("{}…", truncated);
    }

    let truncated: String = path.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", truncated)
}
