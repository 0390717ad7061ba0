mod diff_view;
mod file_tree;
mod status_bar;
mod styles;

use crate::app::App;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::Frame;

/// Width of the file list column
const FILE_TREE_WIDTH: u16 = 32;

/// Render the entire UI
pub fn draw(f: &mut Frame, app: &App) {
    let bottom_height = status_bar::bottom_bar_height(app, f.area().width);

    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),             // top bar
            Constraint::Min(1),                // main content
            Constraint::Length(bottom_height), // bottom bar (dynamic rows)
        ])
        .split(f.area());

    status_bar::render_top_bar(f, outer[0], app);

    if outer[1].width < FILE_TREE_WIDTH * 2 {
        // Narrow terminal: diff only
        diff_view::render(f, outer[1], app);
    } else {
        let main_area = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(FILE_TREE_WIDTH), Constraint::Min(1)])
            .split(outer[1]);

        file_tree::render(f, main_area[0], app);
        diff_view::render(f, main_area[1], app);
    }

    status_bar::render_bottom_bar(f, outer[2], app);

    if let Some((msg, _)) = &app.notification {
        status_bar::render_notification(f, f.area(), msg);
    }
}

/// Rows the diff view gets for a terminal of `height` rows
pub fn diff_viewport_height(app: &App, width: u16, height: u16) -> usize {
    let bottom = status_bar::bottom_bar_height(app, width);
    height.saturating_sub(1 + bottom) as usize
}
